//! Database connection management
//!
//! This module provides the controller that owns the single connection to the
//! database file. All engine access goes through its lock.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use super::retry::{run_with_retry, AbandonOnFailure, Operation, RetryPolicy};
use crate::error::{ConnectionError, CreationError};

/// Settings applied to the connection and to the retry loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Upper bound on attempts for any retried operation (at least 1)
    pub max_attempts: u32,
    /// How long SQLite waits on a locked database before failing a statement
    pub busy_timeout: Duration,
    /// Enforce foreign key constraints
    pub foreign_keys: bool,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            busy_timeout: Duration::from_millis(5000),
            foreign_keys: true,
        }
    }
}

/// Owner of the single logical connection to one database file
///
/// `ConnectionController` opens lazily and idempotently, closes idempotently, and
/// serializes every use of the connection behind a mutex. Failures while opening or
/// creating the file are resolved by the injected [`RetryPolicy`].
pub struct ConnectionController {
    path: PathBuf,
    settings: ConnectionSettings,
    policy: Box<dyn RetryPolicy>,
    conn: Mutex<Option<Connection>>,
    opened: AtomicU64,
}

impl ConnectionController {
    /// Create a controller for the database file at `path`
    ///
    /// Nothing is opened until the first call that needs the connection. Failures are
    /// not retried until a policy is supplied with [`with_policy`](Self::with_policy).
    pub fn new(path: impl Into<PathBuf>, settings: ConnectionSettings) -> Self {
        Self {
            path: path.into(),
            settings,
            policy: Box::new(AbandonOnFailure),
            conn: Mutex::new(None),
            opened: AtomicU64::new(0),
        }
    }

    /// Replace the retry policy
    pub fn with_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub(crate) fn policy(&self) -> &dyn RetryPolicy {
        self.policy.as_ref()
    }

    /// Whether a connection is currently held
    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Number of connections acquired over the controller's lifetime
    pub fn open_count(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    /// Open the connection unless it is already open
    pub fn ensure_open(&self) -> Result<(), ConnectionError> {
        let mut guard = self.lock();
        self.open_locked(&mut guard).map(|_| ())
    }

    /// Close the connection if it is open; calling it again is a no-op
    pub fn close(&self) {
        let mut guard = self.lock();
        if let Some(conn) = guard.take() {
            match conn.close() {
                Ok(()) => info!("Closed database connection to {:?}", self.path),
                Err((_conn, e)) => {
                    warn!("Error closing database {:?}, dropping handle: {}", self.path, e)
                }
            }
        }
    }

    /// Run `f` against the open connection, opening it first if needed
    ///
    /// The lock is held for the duration of `f`.
    pub fn with_connection<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<ConnectionError>,
    {
        let mut guard = self.lock();
        let conn = self.open_locked(&mut guard)?;
        f(conn)
    }

    /// Check whether the database file exists
    pub fn database_exists(&self) -> bool {
        database_exists(&self.path)
    }

    /// Create an empty database file at the configured path
    ///
    /// Parent directories are created as needed; an existing file is left untouched.
    pub fn create_database_file(&self) -> Result<(), CreationError> {
        run_with_retry(
            self.policy(),
            Operation::CreateFile,
            self.settings.max_attempts,
            || create_empty_file(&self.path),
        )
        .map_err(|(source, attempts)| CreationError::Create {
            path: self.path.clone(),
            attempts,
            source,
        })?;

        info!("Database file ready at {:?}", self.path);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_locked<'a>(
        &self,
        slot: &'a mut Option<Connection>,
    ) -> Result<&'a Connection, ConnectionError> {
        if let Some(conn) = slot.take() {
            return Ok(slot.insert(conn));
        }

        let conn = run_with_retry(
            self.policy(),
            Operation::Open,
            self.settings.max_attempts,
            || self.connect(),
        )
        .map_err(|(source, attempts)| ConnectionError::Open {
            path: self.path.clone(),
            attempts,
            source,
        })?;

        self.opened.fetch_add(1, Ordering::SeqCst);
        info!("Opened database connection to {:?}", self.path);
        Ok(slot.insert(conn))
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.settings.busy_timeout)?;
        if self.settings.foreign_keys {
            conn.execute("PRAGMA foreign_keys=ON", [])?;
        }
        debug!("Configured connection to {:?}", self.path);
        Ok(conn)
    }
}

impl Drop for ConnectionController {
    fn drop(&mut self) {
        self.close();
    }
}

/// Check whether a database file exists at `path`
///
/// This does not verify that the file is a valid database. Errors while inspecting the
/// path are logged and reported as "does not exist".
pub fn database_exists(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.is_file(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Unable to inspect database file {:?}: {}", path, e);
            false
        }
    }
}

fn create_empty_file(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    Ok(())
}
