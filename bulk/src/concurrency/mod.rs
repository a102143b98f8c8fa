//! Concurrency utilities for coordinating bulk operations.
//!
//! A bulk operation runs its stages sequentially against a single connection, so the
//! only coordination it needs is cancellation: every stage boundary observes a
//! shutdown signal and aborts promptly, leaving counters for unprocessed tables at
//! their zero defaults.

pub mod shutdown;
