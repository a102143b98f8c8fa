//! Statement execution seam.
//!
//! The engine emits SQL text and consumes tabular results; the actual connection,
//! transaction, and wire protocol live behind [`SqlExecutor`]. Execution faults
//! propagate verbatim, the engine never retries.

use std::future::Future;

use tokio_postgres::Row;
use tokio_postgres::types::Type;
use tracing::debug;

use crate::bail;
use crate::error::{BulkResult, ErrorKind};
use crate::sql::MergeStatement;
use crate::types::{Cell, TableRow};

/// Result of running a statement as a query.
#[derive(Debug, Default)]
pub struct QueryOutput {
    /// Number of rows the statement affected.
    pub rows_affected: u64,
    /// Output rows in the order the server emitted them.
    ///
    /// Server order is not guaranteed to match staging order; rows must only be
    /// correlated per-row via the surrogate id they carry.
    pub rows: Vec<TableRow>,
}

/// Collaborator that executes SQL text on the caller's connection.
pub trait SqlExecutor {
    /// Executes a statement as a plain command, returning the affected-row count.
    fn execute_command(&self, sql: &str) -> impl Future<Output = BulkResult<u64>> + Send;

    /// Executes a statement as a query, streaming back its result rows.
    fn execute_query(&self, sql: &str) -> impl Future<Output = BulkResult<QueryOutput>> + Send;
}

/// Runs a synthesized merge statement.
///
/// Statements without an output clause take the command path, which skips row
/// materialization entirely. Statements with an output clause run as a query and
/// return one row per output tuple.
pub async fn run_merge<E>(executor: &E, statement: &MergeStatement) -> BulkResult<QueryOutput>
where
    E: SqlExecutor,
{
    debug!(has_output = statement.has_output, "executing merge statement");

    if !statement.has_output {
        let rows_affected = executor.execute_command(&statement.sql).await?;
        return Ok(QueryOutput {
            rows_affected,
            rows: Vec::new(),
        });
    }

    executor.execute_query(&statement.sql).await
}

/// [`SqlExecutor`] backed by a live tokio-postgres client.
///
/// The client is borrowed: connection and transaction lifecycle stay with the
/// caller, matching the staging table ownership contract. Statements run on
/// whatever transaction the caller has open.
pub struct PgExecutor<'a> {
    client: &'a tokio_postgres::Client,
}

impl<'a> PgExecutor<'a> {
    pub fn new(client: &'a tokio_postgres::Client) -> Self {
        Self { client }
    }
}

impl SqlExecutor for PgExecutor<'_> {
    async fn execute_command(&self, sql: &str) -> BulkResult<u64> {
        Ok(self.client.execute(sql, &[]).await?)
    }

    async fn execute_query(&self, sql: &str) -> BulkResult<QueryOutput> {
        let rows = self.client.query(sql, &[]).await?;

        // Every affected row produces exactly one output tuple, so the row count
        // doubles as the affected count on the query path.
        let rows_affected = rows.len() as u64;
        let rows = rows
            .iter()
            .map(row_to_table_row)
            .collect::<BulkResult<Vec<_>>>()?;

        Ok(QueryOutput {
            rows_affected,
            rows,
        })
    }
}

/// Converts one wire row into the engine's cell representation.
fn row_to_table_row(row: &Row) -> BulkResult<TableRow> {
    let mut values = Vec::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        values.push(extract_cell(row, index, column.type_())?);
    }

    Ok(TableRow::new(values))
}

fn extract_cell(row: &Row, index: usize, typ: &Type) -> BulkResult<Cell> {
    macro_rules! cell {
        ($rust_type:ty, $variant:expr) => {
            row.try_get::<_, Option<$rust_type>>(index)
                .map_err(crate::error::BulkError::from)?
                .map($variant)
                .unwrap_or(Cell::Null)
        };
    }

    let cell = match *typ {
        Type::BOOL => cell!(bool, Cell::Bool),
        Type::INT2 => cell!(i16, Cell::I16),
        Type::INT4 => cell!(i32, Cell::I32),
        Type::INT8 => cell!(i64, Cell::I64),
        Type::FLOAT4 => cell!(f32, Cell::F32),
        Type::FLOAT8 => cell!(f64, Cell::F64),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            cell!(String, Cell::String)
        }
        Type::BYTEA => cell!(Vec<u8>, Cell::Bytes),
        Type::UUID => cell!(uuid::Uuid, Cell::Uuid),
        Type::DATE => cell!(chrono::NaiveDate, Cell::Date),
        Type::TIME => cell!(chrono::NaiveTime, Cell::Time),
        Type::TIMESTAMP => cell!(chrono::NaiveDateTime, Cell::Timestamp),
        Type::TIMESTAMPTZ => cell!(chrono::DateTime<chrono::Utc>, Cell::TimestampTz),
        Type::JSON | Type::JSONB => cell!(serde_json::Value, Cell::Json),
        _ => bail!(
            ErrorKind::ConversionError,
            "Output row carries an unsupported column type",
            format!("column {index} has type {}", typ.name())
        ),
    };

    Ok(cell)
}
