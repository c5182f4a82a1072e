//! Error types for sqlkeeper
//!
//! Each component reports its own error type; [`Error`] unifies them for callers that
//! drive several components at once.

use std::path::PathBuf;

use thiserror::Error;

use crate::database::core::Operation;

/// The database connection could not be opened
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("failed to open database at {path:?} after {attempts} attempt(s): {source}")]
    Open {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: rusqlite::Error,
    },
}

/// The database file could not be created
#[derive(Error, Debug)]
pub enum CreationError {
    #[error("failed to create database file {path:?} after {attempts} attempt(s): {source}")]
    Create {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },
}

/// A single table could not be created during reconciliation
///
/// Never fatal: reconciliation records it and moves on to the next table.
#[derive(Error, Debug)]
#[error("failed to create table '{table}': {source}")]
pub struct SchemaError {
    pub table: String,
    #[source]
    pub source: rusqlite::Error,
}

/// Table registration errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("table '{0}' is already registered")]
    DuplicateTable(String),

    #[error("invalid table name '{0}'")]
    InvalidName(String),
}

/// A CRUD statement failed or could not be built
#[derive(Error, Debug)]
pub enum ExecError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("{operation} failed after {attempts} attempt(s): {source} (sql: {sql})")]
    Statement {
        operation: Operation,
        sql: String,
        attempts: u32,
        #[source]
        source: rusqlite::Error,
    },

    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("{fields} field(s) but {values} value(s)")]
    Arity { fields: usize, values: usize },

    #[error("delete requires a predicate")]
    MissingPredicate,

    #[error("update requires at least one assignment")]
    MissingAssignments,

    #[error("column '{column}': {message}")]
    Column { column: String, message: String },
}

/// Filesystem failures in the backup subsystem; never retried
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("backup I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("backup '{0}' not found")]
    NotFound(String),

    #[error("invalid backup name '{0}'")]
    InvalidName(String),
}

impl BackupError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BackupError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Top-level error for sqlkeeper operations
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Creation(#[from] CreationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Backup(#[from] BackupError),
}

impl Error {
    /// A short, user-facing description of the failure
    pub fn user_message(&self) -> String {
        match self {
            Error::Connection(e) => format!("Connection to database failed. {}", e),
            Error::Creation(e) => format!("Cannot create database file. {}", e),
            Error::Registry(e) => format!("Table registration rejected. {}", e),
            Error::Exec(e) => format!("Database command failed. {}", e),
            Error::Backup(e) => format!("Backup operation failed. Check permissions. {}", e),
        }
    }
}

/// Result type alias for sqlkeeper operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_display() {
        let err = RegistryError::DuplicateTable("users".to_string());
        assert_eq!(err.to_string(), "table 'users' is already registered");
    }

    #[test]
    fn test_user_message() {
        let err: Error = BackupError::NotFound("1700000000.sqlite".to_string()).into();
        let msg = err.user_message();
        assert!(msg.contains("Backup operation failed"));
        assert!(msg.contains("1700000000.sqlite"));
    }

    #[test]
    fn test_exec_error_from_connection() {
        let conn_err = ConnectionError::Open {
            path: PathBuf::from("/nowhere/db.sqlite"),
            attempts: 2,
            source: rusqlite::Error::InvalidQuery,
        };
        let err: ExecError = conn_err.into();
        assert!(matches!(err, ExecError::Connection(_)));
        assert!(err.to_string().contains("2 attempt(s)"));
    }
}
