use pg_escape::quote_identifier;
use postgres::schema::TableSchema;

use crate::bail;
use crate::error::{BulkResult, ErrorKind};
use crate::sql::{STAGING_ALIAS, TARGET_ALIAS};
use crate::staging::StagingTable;

/// Output clause specification for a merge statement.
///
/// When present, every affected row is echoed back tagged with the action that
/// touched it, the surrogate id used for correlation, and the server-generated
/// column values in `generated_columns` order.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    /// Staging-side surrogate id column to echo back, when correlation is on.
    ///
    /// Reads NULL for deleted rows: the delete branch matches no source row, so
    /// there is no stable identity to report against.
    pub surrogate_column: Option<String>,
    /// Server-generated target columns to read back, in schema order.
    pub generated_columns: Vec<String>,
}

/// A synthesized conditional merge statement.
#[derive(Debug, Clone)]
pub struct MergeStatement {
    /// The full statement text.
    pub sql: String,
    /// Whether the statement carries an output clause and must run as a query.
    pub has_output: bool,
}

/// Synthesizes a conditional merge against one target table.
///
/// The statement shape is kept uniform across option combinations:
///
/// - The update branch is included only when `update_columns` is non-empty.
/// - The delete branch (`WHEN NOT MATCHED BY SOURCE`) is included only when the
///   caller requests delete semantics, which the orchestrator restricts to the
///   primary table of a mapping.
/// - The insert branch is included only when `insert_columns` is non-empty. When
///   `insert_if_not_exists` is false the branch is guarded with an always-false
///   predicate, so it structurally exists but can never fire while the real join
///   condition keeps driving matched updates and deletes.
///
/// Tie-break follows standard merge semantics and must not be altered: a staged row
/// that matches the join condition takes the update/delete path, one that does not
/// match is an insert candidate.
pub fn build_merge(
    staging: &StagingTable,
    target: &TableSchema,
    join_sql: &str,
    insert_columns: &[String],
    update_columns: &[String],
    output: Option<&MergeOutput>,
    allow_delete: bool,
    insert_if_not_exists: bool,
) -> BulkResult<MergeStatement> {
    if insert_columns.is_empty() && update_columns.is_empty() && !allow_delete {
        bail!(
            ErrorKind::ConfigError,
            "A merge statement requires at least one of insert, update, or delete semantics",
            format!("target table {}", target.name)
        );
    }

    let mut sql = format!(
        "MERGE INTO {} AS {TARGET_ALIAS} USING {} AS {STAGING_ALIAS} ON {join_sql}",
        target.name.as_quoted_identifier(),
        staging.as_quoted_identifier(),
    );

    if !update_columns.is_empty() {
        let assignments = update_columns
            .iter()
            .map(|column| {
                let quoted = quote_identifier(column);
                format!("{quoted} = {STAGING_ALIAS}.{quoted}")
            })
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(" WHEN MATCHED THEN UPDATE SET {assignments}"));
    }

    if allow_delete {
        sql.push_str(" WHEN NOT MATCHED BY SOURCE THEN DELETE");
    }

    if !insert_columns.is_empty() {
        let guard = if insert_if_not_exists { "" } else { " AND 1=2" };
        let columns = insert_columns
            .iter()
            .map(|column| quote_identifier(column).to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let values = insert_columns
            .iter()
            .map(|column| format!("{STAGING_ALIAS}.{}", quote_identifier(column)))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(
            " WHEN NOT MATCHED{guard} THEN INSERT ({columns}) VALUES ({values})"
        ));
    }

    let has_output = output.is_some();
    if let Some(output) = output {
        let mut selections = vec!["merge_action() AS action".to_string()];
        if let Some(surrogate) = &output.surrogate_column {
            selections.push(format!("{STAGING_ALIAS}.{}", quote_identifier(surrogate)));
        }
        for column in &output.generated_columns {
            selections.push(format!("{TARGET_ALIAS}.{}", quote_identifier(column)));
        }
        sql.push_str(&format!(" RETURNING {}", selections.join(", ")));
    }

    Ok(MergeStatement { sql, has_output })
}

#[cfg(test)]
mod tests {
    use super::*;
    use postgres::schema::{ColumnSchema, TableId, TableName, ValueGenerated};
    use tokio_postgres::types::Type;

    fn target() -> TableSchema {
        TableSchema::new(
            TableId::new(1),
            TableName::new("public".to_string(), "users".to_string()),
            vec![
                ColumnSchema::new(
                    "id".to_string(),
                    Type::INT8,
                    false,
                    true,
                    ValueGenerated::OnAdd,
                ),
                ColumnSchema::new(
                    "email".to_string(),
                    Type::TEXT,
                    false,
                    false,
                    ValueGenerated::Never,
                ),
            ],
        )
    }

    fn staging() -> StagingTable {
        StagingTable {
            name: "_bulk_staging_test".to_string(),
            columns: vec!["email".to_string()],
            surrogate_column: Some("_bulk_row_id".to_string()),
        }
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_full_upsert_statement() {
        let output = MergeOutput {
            surrogate_column: Some("_bulk_row_id".to_string()),
            generated_columns: columns(&["id"]),
        };
        let statement = build_merge(
            &staging(),
            &target(),
            "t.email = s.email",
            &columns(&["email"]),
            &columns(&["email"]),
            Some(&output),
            false,
            true,
        )
        .unwrap();

        assert!(statement.has_output);
        assert_eq!(
            statement.sql,
            "MERGE INTO public.users AS t USING _bulk_staging_test AS s ON t.email = s.email \
             WHEN MATCHED THEN UPDATE SET email = s.email \
             WHEN NOT MATCHED THEN INSERT (email) VALUES (s.email) \
             RETURNING merge_action() AS action, s._bulk_row_id, t.id"
        );
    }

    #[test]
    fn test_disabled_insert_branch_is_present_but_unreachable() {
        let statement = build_merge(
            &staging(),
            &target(),
            "t.email = s.email",
            &columns(&["email"]),
            &columns(&["email"]),
            None,
            false,
            false,
        )
        .unwrap();

        assert!(!statement.has_output);
        assert!(
            statement
                .sql
                .contains("WHEN NOT MATCHED AND 1=2 THEN INSERT")
        );
        // The join condition itself stays intact so matched updates still fire.
        assert!(statement.sql.contains("ON t.email = s.email"));
    }

    #[test]
    fn test_delete_branch_only_when_requested() {
        let with_delete = build_merge(
            &staging(),
            &target(),
            "t.email = s.email",
            &columns(&["email"]),
            &[],
            None,
            true,
            true,
        )
        .unwrap();
        assert!(
            with_delete
                .sql
                .contains("WHEN NOT MATCHED BY SOURCE THEN DELETE")
        );

        let without_delete = build_merge(
            &staging(),
            &target(),
            "t.email = s.email",
            &columns(&["email"]),
            &[],
            None,
            false,
            true,
        )
        .unwrap();
        assert!(!without_delete.sql.contains("DELETE"));
    }

    #[test]
    fn test_update_branch_omitted_without_update_columns() {
        let statement = build_merge(
            &staging(),
            &target(),
            "t.email = s.email",
            &columns(&["email"]),
            &[],
            None,
            false,
            true,
        )
        .unwrap();

        assert!(!statement.sql.contains("WHEN MATCHED THEN UPDATE"));
    }

    #[test]
    fn test_no_semantics_is_rejected() {
        let err = build_merge(
            &staging(),
            &target(),
            "t.email = s.email",
            &[],
            &[],
            None,
            false,
            true,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }

    #[test]
    fn test_output_without_surrogate_skips_surrogate_selection() {
        let output = MergeOutput {
            surrogate_column: None,
            generated_columns: columns(&["id"]),
        };
        let statement = build_merge(
            &staging(),
            &target(),
            "t.email = s.email",
            &columns(&["email"]),
            &[],
            Some(&output),
            false,
            true,
        )
        .unwrap();

        assert!(
            statement
                .sql
                .ends_with("RETURNING merge_action() AS action, t.id")
        );
    }
}
