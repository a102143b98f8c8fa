//! Bulk operation orchestration.
//!
//! Ties the stages together: stage the batch once, then for every mapped table
//! sequentially synthesize, execute, and reconcile a merge. Tables share one staging
//! table and one connection context, so per-table work is never parallelized. The
//! engine never commits, rolls back, or drops the staging table; transaction scope
//! and staging lifetime belong to the caller.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::concurrency::shutdown::{ShutdownRx, check_canceled, run_cancellable};
use crate::error::BulkResult;
use crate::executor::{SqlExecutor, run_merge};
use crate::mapping::TableMapping;
use crate::reconcile::{OutputRow, reconcile};
use crate::record::Record;
use crate::sql::{
    JoinCondition, MergeOutput, STAGING_ALIAS, TARGET_ALIAS, build_merge, build_update,
};
use crate::staging::{self, StagingClient};

/// Behavior switches for a bulk merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Stage identity column values and carry them into the target unchanged.
    pub keep_identity: bool,
    /// Assign surrogate correlation ids so output rows can be mapped back to records.
    pub use_surrogate: bool,
    /// Request the output clause and propagate server-generated values onto records.
    pub auto_map_output: bool,
    /// Allow the insert branch to fire for staged rows that match no target row.
    pub insert_if_not_exists: bool,
    /// Include the update branch for staged rows that match a target row.
    pub update: bool,
    /// Delete target rows absent from the staged set (primary table only).
    pub delete: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            keep_identity: false,
            use_surrogate: true,
            auto_map_output: true,
            insert_if_not_exists: true,
            update: true,
            delete: false,
        }
    }
}

/// Final report of a bulk merge.
///
/// When the mapping spans multiple tables the counters are the **last** merged
/// table's, not a sum: inheritance tables represent refinements of the same logical
/// rows, so summing would double-count. The output log, by contrast, accumulates
/// across tables in execution order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MergeReport {
    pub rows_affected: u64,
    pub rows_inserted: u64,
    pub rows_updated: u64,
    pub rows_deleted: u64,
    /// Per-row action log, empty when output was not requested.
    pub output: Vec<OutputRow>,
}

/// A bulk upsert/merge operation bound to one record type's table mapping.
///
/// Created fresh per logical call; nothing is cached across invocations.
#[derive(Debug)]
pub struct BulkOperation<C, E> {
    client: C,
    executor: E,
    mapping: TableMapping,
}

impl<C, E> BulkOperation<C, E>
where
    C: StagingClient + Sync,
    E: SqlExecutor + Sync,
{
    pub fn new(client: C, executor: E, mapping: TableMapping) -> Self {
        Self {
            client,
            executor,
            mapping,
        }
    }

    /// Returns the table mapping this operation targets.
    pub fn mapping(&self) -> &TableMapping {
        &self.mapping
    }

    /// Returns the staging collaborator.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the statement executor.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Stages the record batch and merges it into every mapped table.
    ///
    /// Tables are processed sequentially in mapping order. A fault in a later table
    /// does not undo earlier tables; cross-table atomicity is the caller's
    /// transaction to arrange. Cancellation aborts before the next stage starts and
    /// surfaces as a distinct cancellation error.
    pub async fn merge<R>(
        &self,
        records: &mut [R],
        join: &JoinCondition,
        options: &MergeOptions,
        shutdown_rx: &mut ShutdownRx,
    ) -> BulkResult<MergeReport>
    where
        R: Record,
    {
        let (staging_table, correlation) = staging::load(
            &self.client,
            &self.mapping,
            &*records,
            options.keep_identity,
            options.use_surrogate,
            shutdown_rx,
        )
        .await?;

        let join_sql = join.to_sql(TARGET_ALIAS, STAGING_ALIAS)?;

        let mut report = MergeReport::default();
        for table in self.mapping.tables() {
            check_canceled(shutdown_rx)?;

            let insert_columns = self
                .mapping
                .insert_column_names(table, &staging_table.columns);
            let update_columns = if options.update {
                self.mapping
                    .update_column_names(table, &staging_table.columns)
            } else {
                Vec::new()
            };
            let output_spec = options.auto_map_output.then(|| MergeOutput {
                surrogate_column: staging_table.surrogate_column.clone(),
                generated_columns: self.mapping.generated_column_names(table),
            });
            let allow_delete = options.delete && self.mapping.is_primary_table(table);

            let statement = build_merge(
                &staging_table,
                table,
                &join_sql,
                &insert_columns,
                &update_columns,
                output_spec.as_ref(),
                allow_delete,
                options.insert_if_not_exists,
            )?;

            let execution =
                run_cancellable(shutdown_rx, run_merge(&self.executor, &statement)).await?;

            // Last table wins for counters; the action log accumulates.
            if let Some(output_spec) = &output_spec {
                let outcome = reconcile(execution, output_spec, &correlation, records)?;
                report.rows_affected = outcome.rows_affected;
                report.rows_inserted = outcome.inserted;
                report.rows_updated = outcome.updated;
                report.rows_deleted = outcome.deleted;
                report.output.extend(outcome.output);
            } else {
                report.rows_affected = execution.rows_affected;
            }

            info!(
                table = %table.name,
                rows_affected = report.rows_affected,
                "merged staged rows into table"
            );
        }

        Ok(report)
    }

    /// Stages the record batch and applies a join-based bulk update to every mapped
    /// table.
    ///
    /// The cheap path for update-only workflows: no output clause and no
    /// generated-value propagation. Identity values are staged so the join condition
    /// can use them. When the mapping spans multiple tables only the last table's
    /// row count is retained, matching the merge path's aggregation policy.
    pub async fn update<R>(
        &self,
        records: &[R],
        join: &JoinCondition,
        shutdown_rx: &mut ShutdownRx,
    ) -> BulkResult<u64>
    where
        R: Record,
    {
        let (staging_table, _) = staging::load(
            &self.client,
            &self.mapping,
            records,
            true,
            false,
            shutdown_rx,
        )
        .await?;

        let join_sql = join.to_sql(TARGET_ALIAS, STAGING_ALIAS)?;

        let mut rows_updated = 0;
        for table in self.mapping.tables() {
            check_canceled(shutdown_rx)?;

            let update_columns = self
                .mapping
                .update_column_names(table, &staging_table.columns);
            let sql = build_update(&staging_table, table, &join_sql, &update_columns)?;

            rows_updated =
                run_cancellable(shutdown_rx, self.executor.execute_command(&sql)).await?;

            info!(table = %table.name, rows_updated, "updated table from staged rows");
        }

        Ok(rows_updated)
    }
}
