pub mod concurrency;
pub mod error;
pub mod executor;
pub mod macros;
pub mod mapping;
pub mod operation;
pub mod reconcile;
pub mod record;
pub mod sql;
pub mod staging;
pub mod types;
