//! Result reconciliation.
//!
//! Maps each merge output row back to its source record via the surrogate id,
//! classifies it by action, and copies server-generated column values onto the
//! record. A surrogate id that was never staged is a broken engine invariant and
//! fails the operation; it is never downgraded to a warning.

use std::str::FromStr;

use tracing::debug;

use crate::bail;
use crate::error::{BulkResult, ErrorKind};
use crate::executor::QueryOutput;
use crate::record::{CorrelationMap, Record, SurrogateId};
use crate::sql::MergeOutput;
use crate::types::{Cell, TableRow};

/// The action a merge statement applied to one row.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MergeAction {
    Insert,
    Update,
    Delete,
}

impl FromStr for MergeAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("INSERT") {
            Ok(MergeAction::Insert)
        } else if s.eq_ignore_ascii_case("UPDATE") {
            Ok(MergeAction::Update)
        } else if s.eq_ignore_ascii_case("DELETE") {
            Ok(MergeAction::Delete)
        } else {
            Err(())
        }
    }
}

/// One row of a merge's output clause, tagged with the action that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    /// The action the merge applied.
    pub action: MergeAction,
    /// Surrogate id of the staged row, absent for deletes.
    pub surrogate_id: Option<SurrogateId>,
    /// Server-generated column values, in descriptor order.
    pub values: Vec<Cell>,
}

/// Per-table counters and action log produced by reconciling one merge.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MergeOutcome {
    pub inserted: u64,
    pub updated: u64,
    pub deleted: u64,
    pub rows_affected: u64,
    /// Output rows in server emission order.
    pub output: Vec<OutputRow>,
}

/// Reconciles the output of one merge execution against the source records.
///
/// For every output row: deletes only bump their counter; inserts and updates are
/// looked up by surrogate id and, when generated-column descriptors are present,
/// receive the echoed values positionally. Counters plus the ordered action log come
/// back as a [`MergeOutcome`].
pub fn reconcile<R>(
    execution: QueryOutput,
    output: &MergeOutput,
    correlation: &CorrelationMap,
    records: &mut [R],
) -> BulkResult<MergeOutcome>
where
    R: Record,
{
    let mut outcome = MergeOutcome {
        rows_affected: execution.rows_affected,
        ..Default::default()
    };

    for row in execution.rows {
        let parsed = parse_output_row(&row, output)?;

        match parsed.action {
            MergeAction::Delete => {
                // Nothing to update on a deleted record; no lookup happens.
                outcome.deleted += 1;
            }
            MergeAction::Insert | MergeAction::Update => {
                let Some(surrogate_id) = parsed.surrogate_id else {
                    if output.surrogate_column.is_none() {
                        // Correlation is off: count the action, skip propagation.
                        bump(&mut outcome, parsed.action);
                        outcome.output.push(parsed);
                        continue;
                    }
                    bail!(
                        ErrorKind::MalformedOutputRow,
                        "Merge output row is missing its surrogate id",
                        format!("action {:?} returned a NULL surrogate id", parsed.action)
                    );
                };

                let Some(index) = correlation.get(surrogate_id) else {
                    bail!(
                        ErrorKind::CorrelationMiss,
                        "Merge output row references a surrogate id that was never staged",
                        format!("surrogate id {surrogate_id}")
                    );
                };

                for (column, value) in output.generated_columns.iter().zip(parsed.values.iter()) {
                    records[index].set_generated(column, value.clone())?;
                }

                bump(&mut outcome, parsed.action);
            }
        }

        outcome.output.push(parsed);
    }

    debug!(
        inserted = outcome.inserted,
        updated = outcome.updated,
        deleted = outcome.deleted,
        rows_affected = outcome.rows_affected,
        "merge output reconciled"
    );

    Ok(outcome)
}

fn bump(outcome: &mut MergeOutcome, action: MergeAction) {
    match action {
        MergeAction::Insert => outcome.inserted += 1,
        MergeAction::Update => outcome.updated += 1,
        MergeAction::Delete => outcome.deleted += 1,
    }
}

/// Parses one raw output row into its action tag, surrogate id, and generated values.
///
/// The expected layout mirrors the output clause: the action first, then the
/// surrogate id when correlation is on, then one cell per generated column.
fn parse_output_row(row: &TableRow, output: &MergeOutput) -> BulkResult<OutputRow> {
    let has_surrogate = output.surrogate_column.is_some();
    let expected_len = 1 + usize::from(has_surrogate) + output.generated_columns.len();
    if row.len() != expected_len {
        bail!(
            ErrorKind::MalformedOutputRow,
            "Merge output row has an unexpected column count",
            format!("expected {expected_len} columns, got {}", row.len())
        );
    }

    let values = row.values();

    let Some(action) = values[0].as_str().and_then(|s| MergeAction::from_str(s).ok()) else {
        bail!(
            ErrorKind::MalformedOutputRow,
            "Merge output row carries an unrecognized action tag",
            format!("action cell was {:?}", values[0])
        );
    };

    let surrogate_id = if has_surrogate {
        match &values[1] {
            Cell::Null => None,
            cell => match cell.as_i64() {
                Some(id) => Some(id),
                None => bail!(
                    ErrorKind::MalformedOutputRow,
                    "Merge output row carries a non-integer surrogate id",
                    format!("surrogate cell was {cell:?}")
                ),
            },
        }
    } else {
        None
    };

    let generated_start = 1 + usize::from(has_surrogate);
    Ok(OutputRow {
        action,
        surrogate_id,
        values: values[generated_start..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone)]
    struct TestRecord {
        id: Option<i64>,
        email: String,
    }

    impl Record for TestRecord {
        fn to_row(&self, columns: &[String]) -> BulkResult<TableRow> {
            let cells = columns
                .iter()
                .map(|column| match column.as_str() {
                    "id" => self.id.map(Cell::I64).unwrap_or(Cell::Null),
                    "email" => Cell::String(self.email.clone()),
                    _ => Cell::Null,
                })
                .collect();
            Ok(TableRow::new(cells))
        }

        fn set_generated(&mut self, column: &str, value: Cell) -> BulkResult<()> {
            if column == "id" {
                self.id = value.as_i64();
            }
            Ok(())
        }
    }

    fn output_spec() -> MergeOutput {
        MergeOutput {
            surrogate_column: Some("_bulk_row_id".to_string()),
            generated_columns: vec!["id".to_string()],
        }
    }

    fn action_row(action: &str, surrogate: Cell, generated: Cell) -> TableRow {
        TableRow::new(vec![Cell::String(action.to_string()), surrogate, generated])
    }

    #[test]
    fn test_inserts_propagate_generated_values_by_surrogate() {
        let mut records = vec![TestRecord::default(), TestRecord::default()];
        let mut correlation = CorrelationMap::new();
        correlation.insert(0, 0).unwrap();
        correlation.insert(1, 1).unwrap();

        // Server emission order deliberately reversed relative to staging order.
        let execution = QueryOutput {
            rows_affected: 2,
            rows: vec![
                action_row("INSERT", Cell::I64(1), Cell::I64(101)),
                action_row("INSERT", Cell::I64(0), Cell::I64(100)),
            ],
        };

        let outcome = reconcile(execution, &output_spec(), &correlation, &mut records).unwrap();

        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.rows_affected, 2);
        assert_eq!(records[0].id, Some(100));
        assert_eq!(records[1].id, Some(101));
    }

    #[test]
    fn test_counters_sum_to_rows_affected() {
        let mut records = vec![TestRecord::default(); 3];
        let mut correlation = CorrelationMap::new();
        for i in 0..3 {
            correlation.insert(i, i as usize).unwrap();
        }

        let execution = QueryOutput {
            rows_affected: 4,
            rows: vec![
                action_row("INSERT", Cell::I64(0), Cell::I64(1)),
                action_row("UPDATE", Cell::I64(1), Cell::I64(2)),
                action_row("UPDATE", Cell::I64(2), Cell::I64(3)),
                action_row("DELETE", Cell::Null, Cell::Null),
            ],
        };

        let outcome = reconcile(execution, &output_spec(), &correlation, &mut records).unwrap();

        assert_eq!(
            outcome.inserted + outcome.updated + outcome.deleted,
            outcome.rows_affected
        );
        assert_eq!(outcome.deleted, 1);
        assert_eq!(outcome.output.len(), 4);
    }

    #[test]
    fn test_delete_rows_skip_record_lookup_and_propagation() {
        let mut records: Vec<TestRecord> = vec![];
        let correlation = CorrelationMap::new();

        let execution = QueryOutput {
            rows_affected: 1,
            rows: vec![action_row("DELETE", Cell::Null, Cell::Null)],
        };

        let outcome = reconcile(execution, &output_spec(), &correlation, &mut records).unwrap();
        assert_eq!(outcome.deleted, 1);
        assert_eq!(outcome.output[0].surrogate_id, None);
    }

    #[test]
    fn test_unknown_surrogate_id_is_fatal() {
        let mut records = vec![TestRecord::default()];
        let mut correlation = CorrelationMap::new();
        correlation.insert(0, 0).unwrap();

        let execution = QueryOutput {
            rows_affected: 1,
            rows: vec![action_row("INSERT", Cell::I64(99), Cell::I64(1))],
        };

        let err = reconcile(execution, &output_spec(), &correlation, &mut records).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorrelationMiss);
    }

    #[test]
    fn test_unrecognized_action_tag_is_rejected() {
        let mut records = vec![TestRecord::default()];
        let correlation = CorrelationMap::new();

        let execution = QueryOutput {
            rows_affected: 1,
            rows: vec![action_row("UPSERT", Cell::I64(0), Cell::I64(1))],
        };

        let err = reconcile(execution, &output_spec(), &correlation, &mut records).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedOutputRow);
    }

    #[test]
    fn test_wrong_column_count_is_rejected() {
        let mut records = vec![TestRecord::default()];
        let correlation = CorrelationMap::new();

        let execution = QueryOutput {
            rows_affected: 1,
            rows: vec![TableRow::new(vec![Cell::String("INSERT".to_string())])],
        };

        let err = reconcile(execution, &output_spec(), &correlation, &mut records).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedOutputRow);
    }
}
