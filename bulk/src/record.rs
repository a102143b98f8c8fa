//! Record seam and surrogate correlation.
//!
//! The engine never inspects record types directly. Callers implement [`Record`] to
//! extract staged column values and to accept server-generated values after a merge.
//! Correlation between anonymous output rows and in-memory records goes through a
//! [`CorrelationMap`], keyed by the engine-assigned surrogate id.

use std::collections::HashMap;

use crate::bail;
use crate::error::{BulkResult, ErrorKind};
use crate::types::{Cell, TableRow};

/// Engine-assigned correlation key, independent of any business primary key.
///
/// Assigned monotonically per record within one batch. Server-side output row order
/// is not guaranteed to match staging order, so this id is the only reliable way to
/// map an output row back to the record that produced it.
pub type SurrogateId = i64;

/// A typed record the engine can stage and write generated values back onto.
pub trait Record {
    /// Extracts the record's values for the given columns, in the given order.
    ///
    /// The returned row must have exactly one [`Cell`] per requested column. Columns
    /// the record has no value for should yield [`Cell::Null`].
    fn to_row(&self, columns: &[String]) -> BulkResult<TableRow>;

    /// Applies a server-generated column value onto the record.
    ///
    /// Called after a merge for each generated column of each affected row, so the
    /// record acquires server-assigned identities and defaults after an insert, and
    /// refreshed computed values after an update.
    fn set_generated(&mut self, column: &str, value: Cell) -> BulkResult<()>;
}

/// Mapping from surrogate id to the owning record's position in the caller's batch.
///
/// Built once before any merge executes and read-only during reconciliation. Indices
/// rather than references keep the map independent of the records' borrow, which the
/// reconciler needs mutably to apply generated values.
#[derive(Debug, Default)]
pub struct CorrelationMap {
    entries: HashMap<SurrogateId, usize>,
}

impl CorrelationMap {
    /// Creates an empty correlation map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map with capacity for one batch of records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Registers a surrogate id for the record at `index`.
    ///
    /// Duplicate ids break the correlation contract and are rejected.
    pub fn insert(&mut self, id: SurrogateId, index: usize) -> BulkResult<()> {
        if self.entries.insert(id, index).is_some() {
            bail!(
                ErrorKind::InvalidState,
                "Surrogate id assigned twice within one batch",
                format!("surrogate id {id} is already mapped")
            );
        }

        Ok(())
    }

    /// Looks up the record index for a surrogate id.
    pub fn get(&self, id: SurrogateId) -> Option<usize> {
        self.entries.get(&id).copied()
    }

    /// Returns the number of correlated records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
