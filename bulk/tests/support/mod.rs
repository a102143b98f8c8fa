//! In-memory fakes for driving bulk operations without a live database.

use std::collections::VecDeque;
use std::sync::Mutex;

use bulk::error::{BulkResult, ErrorKind};
use bulk::executor::{QueryOutput, SqlExecutor};
use bulk::mapping::TableMapping;
use bulk::record::Record;
use bulk::staging::StagingClient;
use bulk::types::{
    Cell, ColumnSchema, TableId, TableName, TableRow, TableSchema, ValueGenerated,
};
use bulk::{bail, bulk_error};
use tokio_postgres::types::Type;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A user-like record with a server-assigned identity.
#[derive(Debug, Default, Clone)]
pub struct User {
    pub id: Option<i64>,
    pub email: String,
    pub name: String,
    pub salary: Option<i64>,
}

impl User {
    pub fn new(email: &str, name: &str) -> Self {
        Self {
            email: email.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }
}

impl Record for User {
    fn to_row(&self, columns: &[String]) -> BulkResult<TableRow> {
        let cells = columns
            .iter()
            .map(|column| match column.as_str() {
                "id" => self.id.map(Cell::I64).unwrap_or(Cell::Null),
                "email" => Cell::String(self.email.clone()),
                "name" => Cell::String(self.name.clone()),
                "salary" => self.salary.map(Cell::I64).unwrap_or(Cell::Null),
                _ => Cell::Null,
            })
            .collect();

        Ok(TableRow::new(cells))
    }

    fn set_generated(&mut self, column: &str, value: Cell) -> BulkResult<()> {
        match column {
            "id" => self.id = value.as_i64(),
            _ => {
                bail!(
                    ErrorKind::UnknownColumn,
                    "Generated value targets an unmapped column",
                    column
                );
            }
        }

        Ok(())
    }
}

fn column(name: &str, primary_key: bool, generated: ValueGenerated) -> ColumnSchema {
    let typ = if name == "id" || name == "salary" {
        Type::INT8
    } else {
        Type::TEXT
    };
    ColumnSchema::new(name.to_string(), typ, !primary_key, primary_key, generated)
}

/// Single-table mapping: `public.users (id identity, email, name)`.
pub fn users_mapping() -> TableMapping {
    let users = TableSchema::new(
        TableId::new(16384),
        TableName::new("public".to_string(), "users".to_string()),
        vec![
            column("id", true, ValueGenerated::OnAdd),
            column("email", false, ValueGenerated::Never),
            column("name", false, ValueGenerated::Never),
        ],
    );

    TableMapping::new(vec![users]).unwrap()
}

/// Two-table inheritance mapping: `people` (root) plus `employees`.
pub fn employees_mapping() -> TableMapping {
    let people = TableSchema::new(
        TableId::new(16385),
        TableName::new("public".to_string(), "people".to_string()),
        vec![
            column("id", true, ValueGenerated::OnAdd),
            column("email", false, ValueGenerated::Never),
            column("name", false, ValueGenerated::Never),
        ],
    );
    let employees = TableSchema::new(
        TableId::new(16386),
        TableName::new("public".to_string(), "employees".to_string()),
        vec![
            column("id", true, ValueGenerated::Never),
            column("salary", false, ValueGenerated::Never),
        ],
    );

    TableMapping::new(vec![people, employees]).unwrap()
}

/// Captures staging calls and the staged rows without touching a database.
#[derive(Debug, Default)]
pub struct FakeStagingClient {
    inner: Mutex<FakeStagingState>,
}

#[derive(Debug, Default)]
pub struct FakeStagingState {
    pub cloned_columns: Vec<String>,
    pub surrogate_column: Option<String>,
    pub copied_rows: Vec<TableRow>,
}

impl FakeStagingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FakeStagingState {
        let inner = self.inner.lock().unwrap();
        FakeStagingState {
            cloned_columns: inner.cloned_columns.clone(),
            surrogate_column: inner.surrogate_column.clone(),
            copied_rows: inner.copied_rows.clone(),
        }
    }
}

impl StagingClient for FakeStagingClient {
    async fn clone_table(
        &self,
        _mapping: &TableMapping,
        _staging_name: &str,
        columns: &[String],
        surrogate_column: Option<&str>,
    ) -> BulkResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.cloned_columns = columns.to_vec();
        inner.surrogate_column = surrogate_column.map(str::to_string);
        Ok(())
    }

    async fn copy_rows(
        &self,
        _staging_name: &str,
        _columns: &[String],
        rows: Vec<TableRow>,
    ) -> BulkResult<u64> {
        let copied = rows.len() as u64;
        let mut inner = self.inner.lock().unwrap();
        inner.copied_rows = rows;
        Ok(copied)
    }
}

/// One scripted executor response.
#[derive(Debug)]
pub enum Scripted {
    Command(u64),
    Query(QueryOutput),
}

/// Returns scripted results in order and records every statement it executes.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    statements: Mutex<Vec<String>>,
    script: Mutex<VecDeque<Scripted>>,
}

impl ScriptedExecutor {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            script: Mutex::new(script.into()),
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    fn next(&self, sql: &str) -> BulkResult<Scripted> {
        self.statements.lock().unwrap().push(sql.to_string());
        self.script.lock().unwrap().pop_front().ok_or_else(|| {
            bulk_error!(
                ErrorKind::InvalidState,
                "Scripted executor ran out of responses",
                sql
            )
        })
    }
}

impl SqlExecutor for ScriptedExecutor {
    async fn execute_command(&self, sql: &str) -> BulkResult<u64> {
        match self.next(sql)? {
            Scripted::Command(rows_affected) => Ok(rows_affected),
            Scripted::Query(_) => bail!(
                ErrorKind::InvalidState,
                "Scripted executor expected a command at this point",
                sql
            ),
        }
    }

    async fn execute_query(&self, sql: &str) -> BulkResult<QueryOutput> {
        match self.next(sql)? {
            Scripted::Query(output) => Ok(output),
            Scripted::Command(_) => bail!(
                ErrorKind::InvalidState,
                "Scripted executor expected a query at this point",
                sql
            ),
        }
    }
}

/// Builds a merge output row: action, surrogate id, generated id.
pub fn output_row(action: &str, surrogate: Option<i64>, generated_id: Option<i64>) -> TableRow {
    TableRow::new(vec![
        Cell::String(action.to_string()),
        surrogate.map(Cell::I64).unwrap_or(Cell::Null),
        generated_id.map(Cell::I64).unwrap_or(Cell::Null),
    ])
}
