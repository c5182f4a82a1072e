//! Database module
//!
//! This module provides all database functionality for sqlkeeper, organized into:
//!
//! - **core**: connection lifecycle, retry policy and schema reconciliation
//! - **command**: parameterized insert/select/update/delete
//! - **backup**: file-level backups, restore and retention
//! - **manager**: the `DatabaseManager` facade tying them to one database file
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/           # Foundation
//! │   ├── connection  # ConnectionController: the single connection
//! │   ├── retry       # RetryPolicy and the bounded retry loop
//! │   └── schema      # SchemaRegistry: declared vs. live tables
//! │
//! ├── command/        # CRUD
//! │   ├── clause      # Bound SQL fragments, identifier quoting
//! │   ├── cursor      # RowCursor returned by select
//! │   └── executor    # CommandExecutor
//! │
//! ├── backup          # BackupManager (copies in <data_dir>/backups)
//! └── manager         # DatabaseManager
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use sqlkeeper::database::{Clause, ConnectionController, ConnectionSettings, CommandExecutor, SchemaRegistry};
//!
//! let controller = ConnectionController::new("app/database.sqlite", ConnectionSettings::default())
//!     .with_policy(|failure: &sqlkeeper::database::Failure<'_>| {
//!         if failure.message.contains("locked") {
//!             sqlkeeper::database::RetryDecision::Retry
//!         } else {
//!             sqlkeeper::database::RetryDecision::Abandon
//!         }
//!     });
//!
//! let mut registry = SchemaRegistry::new();
//! registry.register("users", "users (id INTEGER PRIMARY KEY, name TEXT)")?;
//! registry.reconcile_all(&controller)?;
//!
//! let executor = CommandExecutor::new(&controller);
//! executor.update("users", &Clause::new("name = ?").bind("Bob".to_string()), &Clause::new("WHERE id = ?").bind(1))?;
//! ```

mod backup;
pub mod command;
pub mod core;
mod manager;

pub use backup::{BackupInfo, BackupManager, BackupRow, BACKUP_DIR_NAME};
pub use command::{quote_identifier, quote_identifiers, Clause, CommandExecutor, Row, RowCursor};
pub use self::core::{
    database_exists, live_tables, table_exists, AbandonOnFailure, ConnectionController,
    ConnectionSettings, Failure, Operation, ReconcileReport, RetryDecision, RetryPolicy,
    RetryUntilExhausted, SchemaRegistry, TableSpec,
};
pub use manager::DatabaseManager;
