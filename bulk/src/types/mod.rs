//! Common types used throughout the bulk merge engine.
//!
//! Re-exports the cell and row value model plus the Postgres schema metadata
//! from the `postgres` crate.

mod cell;
mod table_row;

pub use cell::*;
pub use table_row::*;

// Re-exports.
pub use postgres::schema::*;
