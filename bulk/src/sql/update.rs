use pg_escape::quote_identifier;
use postgres::schema::TableSchema;

use crate::bail;
use crate::error::{BulkResult, ErrorKind};
use crate::sql::{STAGING_ALIAS, TARGET_ALIAS};
use crate::staging::StagingTable;

/// Synthesizes a join-based bulk update against one target table.
///
/// The cheap path for update-only workflows: no output clause, no generated-value
/// propagation, just `UPDATE target SET col = staging.col, ... FROM staging` with the
/// translated join condition selecting the matched rows.
pub fn build_update(
    staging: &StagingTable,
    target: &TableSchema,
    join_sql: &str,
    update_columns: &[String],
) -> BulkResult<String> {
    if update_columns.is_empty() {
        bail!(
            ErrorKind::ConfigError,
            "A bulk update requires at least one update column",
            format!("target table {}", target.name)
        );
    }

    let assignments = update_columns
        .iter()
        .map(|column| {
            let quoted = quote_identifier(column);
            format!("{quoted} = {STAGING_ALIAS}.{quoted}")
        })
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        "UPDATE {} AS {TARGET_ALIAS} SET {assignments} FROM {} AS {STAGING_ALIAS} WHERE {join_sql}",
        target.name.as_quoted_identifier(),
        staging.as_quoted_identifier(),
    ))
}
