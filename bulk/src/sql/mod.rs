//! SQL text synthesis.
//!
//! The merge algorithm never manipulates SQL directly; it hands table/column sets and
//! a translated join condition to this module, which owns all dialect concerns:
//! identifier quoting, `MERGE` branch layout, the output clause, and the join-based
//! bulk `UPDATE` shape.

mod join;
mod merge;
mod update;

pub use join::*;
pub use merge::*;
pub use update::*;

/// Alias for the target table in synthesized statements.
pub const TARGET_ALIAS: &str = "t";

/// Alias for the staging table in synthesized statements.
pub const STAGING_ALIAS: &str = "s";
