#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! sqlkeeper - a keeper for one embedded SQLite database file
//!
//! sqlkeeper owns a single connection to a database file and manages everything around
//! it: declaring the tables the application expects and creating the missing ones,
//! running parameterized CRUD statements with a caller-decided retry on failure, and
//! taking, restoring and purging file backups. It can be used as both a command-line
//! application and a library.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (none) | Library: connection, schema, CRUD, backups, config | `rusqlite`, `config` |
//! | `display` | `tabled::Tabled` on display rows such as `BackupRow` | `tabled` |
//! | `cli` | The `sqlkeeper` binary | All above + `clap`, `tracing-subscriber` |
//!
//! ```toml
//! # Library only
//! sqlkeeper = { version = "0.1", default-features = false }
//!
//! # Default (CLI binary)
//! sqlkeeper = "0.1"
//! ```
//!
//! # Architecture
//!
//! - **[`database`]**: all database functionality
//!   - `core`: `ConnectionController`, `RetryPolicy`, `SchemaRegistry`
//!   - `command`: `CommandExecutor`, `Clause`, `RowCursor`
//!   - `BackupManager` and the `DatabaseManager` facade
//! - **[`config`]**: configuration management
//! - **[`error`]**: error types, one per component
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sqlkeeper::{Clause, DatabaseManager, KeeperConfig};
//!
//! let config = KeeperConfig::new(&None)?;
//! let db = DatabaseManager::from_config(&config)?;
//! db.create_database()?;
//!
//! let report = db.reconcile_tables()?;
//! for failure in &report.failed {
//!     eprintln!("{}", failure);
//! }
//!
//! let id = db.executor().insert("users", &["name"], rusqlite::params!["Alice"])?;
//! for row in db.executor().select(&[], "users", &Clause::new("WHERE id = ?").bind(id))? {
//!     println!("{:?}", row.values());
//! }
//!
//! // Snapshot before a risky change, purge old snapshots
//! db.backup(Some("before-migration"))?;
//! db.purge_backups(config.backup_retention_days)?;
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod output;

// =============================================================================
// Configuration
// =============================================================================

pub use config::{format_size, KeeperConfig, TableConfig};

// =============================================================================
// Database Module - Re-export commonly used types
// =============================================================================

pub use database::DatabaseManager;

pub use database::{
    AbandonOnFailure, ConnectionController, ConnectionSettings, Failure, Operation,
    RetryDecision, RetryPolicy, RetryUntilExhausted,
};

pub use database::{ReconcileReport, SchemaRegistry, TableSpec};

pub use database::{Clause, CommandExecutor, Row, RowCursor};

pub use database::{BackupInfo, BackupManager, BackupRow};

// =============================================================================
// Errors
// =============================================================================

pub use error::{
    BackupError, ConnectionError, CreationError, Error, ExecError, RegistryError, Result,
    SchemaError,
};

pub use output::OutputFormat;
