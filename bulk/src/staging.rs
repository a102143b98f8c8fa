//! Staging loader.
//!
//! Copies the candidate record batch into a transient staging table that is a column
//! clone of the mapped target schema, optionally carrying the surrogate correlation
//! id column. The staging table's lifetime is owned by the caller: the engine creates
//! and fills it but never drops it.

use std::future::Future;

use pg_escape::quote_identifier;
use tracing::debug;
use uuid::Uuid;

use crate::bail;
use crate::concurrency::shutdown::{ShutdownRx, check_canceled, run_cancellable};
use crate::error::{BulkResult, ErrorKind};
use crate::mapping::TableMapping;
use crate::record::{CorrelationMap, Record, SurrogateId};
use crate::types::{Cell, TableRow};

/// Name of the surrogate correlation id column appended to staging tables.
///
/// Distinct from any business primary key; populated by the loader, read back by the
/// merge output clause, and never written to a target table.
pub const SURROGATE_COLUMN_NAME: &str = "_bulk_row_id";

/// Collaborator that owns the physical staging transfer.
///
/// Implementations create the staging table as a byte-for-byte column clone of the
/// target schema (same types and nullability) and bulk-transfer rows into it, typically
/// via binary `COPY`. Both operations run on the caller's connection and transaction.
pub trait StagingClient {
    /// Creates the staging table as a column clone of the mapped target tables.
    ///
    /// `columns` selects the subset of mapped columns to clone; `surrogate_column`,
    /// when present, is appended as a plain bigint column.
    fn clone_table(
        &self,
        mapping: &TableMapping,
        staging_name: &str,
        columns: &[String],
        surrogate_column: Option<&str>,
    ) -> impl Future<Output = BulkResult<()>> + Send;

    /// Bulk-transfers rows into the staging table, returning the number copied.
    fn copy_rows(
        &self,
        staging_name: &str,
        columns: &[String],
        rows: Vec<TableRow>,
    ) -> impl Future<Output = BulkResult<u64>> + Send;
}

/// Handle to a populated staging table.
#[derive(Debug, Clone)]
pub struct StagingTable {
    /// Unqualified staging table name, unique per operation.
    pub name: String,
    /// Staged columns, in staging order (surrogate column excluded).
    pub columns: Vec<String>,
    /// Name of the surrogate id column, when one was assigned.
    pub surrogate_column: Option<String>,
}

impl StagingTable {
    /// Returns the staging table name as a properly quoted identifier.
    pub fn as_quoted_identifier(&self) -> String {
        quote_identifier(&self.name).to_string()
    }
}

/// Generates a unique staging table name for one operation.
fn staging_table_name() -> String {
    format!("_bulk_staging_{}", Uuid::new_v4().simple())
}

/// Stages the record batch: clones the target schema and bulk-copies all records.
///
/// When `assign_surrogate` is set, each staged row carries a monotonically assigned
/// surrogate id and the returned [`CorrelationMap`] maps those ids back to record
/// positions. Any failure is fatal for the whole operation; a partially staged table
/// is never usable.
pub async fn load<C, R>(
    client: &C,
    mapping: &TableMapping,
    records: &[R],
    keep_identity: bool,
    assign_surrogate: bool,
    shutdown_rx: &mut ShutdownRx,
) -> BulkResult<(StagingTable, CorrelationMap)>
where
    C: StagingClient,
    R: Record,
{
    check_canceled(shutdown_rx)?;

    let columns = mapping.staging_column_names(keep_identity);
    let surrogate_column = assign_surrogate.then(|| SURROGATE_COLUMN_NAME.to_string());
    let staging = StagingTable {
        name: staging_table_name(),
        columns,
        surrogate_column,
    };

    run_cancellable(
        shutdown_rx,
        client.clone_table(
            mapping,
            &staging.name,
            &staging.columns,
            staging.surrogate_column.as_deref(),
        ),
    )
    .await?;

    debug!(
        staging_table = %staging.name,
        columns = staging.columns.len(),
        "staging table created"
    );

    let mut correlation = CorrelationMap::with_capacity(records.len());
    let mut rows = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let mut row = record.to_row(&staging.columns)?;
        if row.len() != staging.columns.len() {
            bail!(
                ErrorKind::InvalidData,
                "Record produced a row with the wrong column count",
                format!(
                    "expected {} columns, record at index {} produced {}",
                    staging.columns.len(),
                    index,
                    row.len()
                )
            );
        }

        if assign_surrogate {
            let id = index as SurrogateId;
            row.values_mut().push(Cell::I64(id));
            correlation.insert(id, index)?;
        }

        rows.push(row);
    }

    let mut copy_columns = staging.columns.clone();
    if let Some(surrogate) = &staging.surrogate_column {
        copy_columns.push(surrogate.clone());
    }

    let staged_count = records.len() as u64;
    let copied = run_cancellable(
        shutdown_rx,
        client.copy_rows(&staging.name, &copy_columns, rows),
    )
    .await?;

    if copied != staged_count {
        bail!(
            ErrorKind::StagingCopyFailed,
            "Bulk copy staged an unexpected number of rows",
            format!("staged {copied} of {staged_count} rows")
        );
    }

    debug!(staging_table = %staging.name, rows = copied, "staging table populated");

    Ok((staging, correlation))
}
