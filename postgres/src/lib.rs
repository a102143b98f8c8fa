//! Postgres schema metadata shared by the bulk merge engine.
//!
//! Contains the table and column descriptors the engine needs to compute
//! staged column sets and synthesize SQL, plus identifier quoting helpers.
//! This crate performs no I/O.

pub mod schema;
