//! Core database infrastructure
//!
//! This module provides the foundational database components:
//! - `ConnectionController`: owner of the single SQLite connection
//! - `SchemaRegistry`: declared tables and their reconciliation
//! - `RetryPolicy`: caller-supplied retry/abandon decisions

mod connection;
mod retry;
mod schema;

pub use connection::{database_exists, ConnectionController, ConnectionSettings};
pub use retry::{
    AbandonOnFailure, Failure, Operation, RetryDecision, RetryPolicy, RetryUntilExhausted,
};
pub use schema::{live_tables, table_exists, ReconcileReport, SchemaRegistry, TableSpec};

pub(crate) use retry::run_with_retry_if;
pub(crate) use schema::list_live_tables;
