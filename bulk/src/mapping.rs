//! Record-type-to-table mapping.
//!
//! A [`TableMapping`] describes which physical tables a record type writes to. Most
//! types map to a single table; table-per-type inheritance maps one type onto an
//! ordered chain of tables, root first. Column lists are ordering-significant only
//! for SQL text generation.

use postgres::schema::TableSchema;

use crate::bail;
use crate::error::{BulkResult, ErrorKind};

/// Ordered set of target tables for one record type.
///
/// The first table is the primary (root) table of the mapping. Only the primary
/// table may carry delete semantics during a merge, even when inheritance spans
/// several tables.
#[derive(Debug, Clone)]
pub struct TableMapping {
    tables: Vec<TableSchema>,
}

impl TableMapping {
    /// Creates a mapping from an ordered list of target tables, root table first.
    pub fn new(tables: Vec<TableSchema>) -> BulkResult<Self> {
        if tables.is_empty() {
            bail!(
                ErrorKind::MissingTableMapping,
                "A table mapping requires at least one target table"
            );
        }

        Ok(Self { tables })
    }

    /// Returns the mapped tables in merge order.
    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    /// Returns the primary (root) table of the mapping.
    pub fn primary_table(&self) -> &TableSchema {
        &self.tables[0]
    }

    /// Returns whether the given table is the primary table of the mapping.
    pub fn is_primary_table(&self, table: &TableSchema) -> bool {
        self.primary_table().id == table.id
    }

    /// Returns the primary key column names of the primary table.
    ///
    /// These drive the default join condition when the caller supplies none.
    pub fn primary_key_column_names(&self) -> Vec<&str> {
        self.primary_table().primary_key_column_names()
    }

    /// Computes the column set to stage, across all mapped tables.
    ///
    /// Columns the server always recomputes are never staged. Identity columns are
    /// excluded unless the caller explicitly keeps identity values. Duplicate names
    /// across inheritance tables collapse to their first occurrence, whose schema
    /// decides whether the column is staged: a root identity stays excluded even when
    /// a child table redeclares the same column as plain.
    pub fn staging_column_names(&self, keep_identity: bool) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        let mut seen: Vec<String> = Vec::new();

        for table in &self.tables {
            for column in &table.column_schemas {
                if seen.iter().any(|name| name == &column.name) {
                    continue;
                }
                seen.push(column.name.clone());

                if column.generated == postgres::schema::ValueGenerated::OnAddOrUpdate {
                    continue;
                }
                if column.is_identity() && !keep_identity {
                    continue;
                }
                columns.push(column.name.clone());
            }
        }

        columns
    }

    /// Computes the insert column set for one table: mapped columns that were staged.
    pub fn insert_column_names(&self, table: &TableSchema, staged: &[String]) -> Vec<String> {
        table
            .column_schemas
            .iter()
            .filter(|cs| staged.iter().any(|name| name == &cs.name))
            .map(|cs| cs.name.clone())
            .collect()
    }

    /// Computes the update column set for one table.
    ///
    /// Same intersection as the insert set, minus primary key columns: the join
    /// condition already pins those, and rewriting them would let a merge move rows
    /// between identities.
    pub fn update_column_names(&self, table: &TableSchema, staged: &[String]) -> Vec<String> {
        table
            .column_schemas
            .iter()
            .filter(|cs| !cs.primary_key && staged.iter().any(|name| name == &cs.name))
            .map(|cs| cs.name.clone())
            .collect()
    }

    /// Returns the names of the server-generated columns of one table, in schema order.
    pub fn generated_column_names(&self, table: &TableSchema) -> Vec<String> {
        table
            .generated_columns()
            .iter()
            .map(|cs| cs.name.clone())
            .collect()
    }
}
