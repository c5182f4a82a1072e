//! Database schema management
//!
//! This module keeps the tables an application declares and reconciles them against
//! the tables that actually exist in the database file. Only table names are
//! compared; columns are never diffed and tables are never dropped.

use std::collections::HashSet;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use super::connection::ConnectionController;
use super::retry::Operation;
use crate::error::{ConnectionError, ExecError, RegistryError, SchemaError};

const LIVE_TABLES_SQL: &str = "SELECT name FROM sqlite_master WHERE type='table'";

/// A declared table: its name and the statement that creates it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    /// Either a full `CREATE TABLE ...` statement or the part after `CREATE TABLE `
    pub statement: String,
}

impl TableSpec {
    pub fn new(name: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            statement: statement.into(),
        }
    }

    /// The complete SQL used to create this table
    pub fn create_sql(&self) -> String {
        let statement = self.statement.trim();
        let is_full = statement
            .get(..7)
            .map_or(false, |head| head.eq_ignore_ascii_case("CREATE "));
        if is_full {
            statement.to_string()
        } else {
            format!("CREATE TABLE {}", statement)
        }
    }
}

/// Outcome of [`SchemaRegistry::reconcile_all`]
///
/// Partial success is a normal result: tables that failed to create are listed in
/// `failed` and did not stop the others.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Tables created by this run
    pub created: Vec<String>,
    /// Tables that already existed and were skipped
    pub present: Vec<String>,
    /// Tables whose creation failed
    pub failed: Vec<SchemaError>,
}

impl ReconcileReport {
    /// True when no table failed to create
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Ordered, append-only set of declared tables
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    tables: Vec<TableSpec>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a table
    ///
    /// Names are unique (compared case-insensitively, as SQLite does).
    pub fn register(
        &mut self,
        name: impl Into<String>,
        statement: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let spec = TableSpec::new(name, statement);
        if spec.name.trim().is_empty() {
            return Err(RegistryError::InvalidName(spec.name));
        }
        if self.contains(&spec.name) {
            return Err(RegistryError::DuplicateTable(spec.name));
        }
        self.tables.push(spec);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&TableSpec> {
        self.tables
            .iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(name))
    }

    /// Declared tables in registration order
    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Create every declared table missing from the database
    ///
    /// A table that fails to create is logged and recorded in the report; the rest are
    /// still attempted. Only a failure to open the connection is an error.
    pub fn reconcile_all(
        &self,
        controller: &ConnectionController,
    ) -> Result<ReconcileReport, ConnectionError> {
        controller.with_connection(|conn| {
            let live = match live_table_set(conn) {
                Ok(live) => live,
                Err(e) => {
                    warn!("Unable to list existing tables, attempting all: {}", e);
                    HashSet::new()
                }
            };

            let mut report = ReconcileReport::default();
            for spec in &self.tables {
                if live.contains(&spec.name.to_ascii_lowercase()) {
                    report.present.push(spec.name.clone());
                    continue;
                }

                let sql = spec.create_sql();
                debug!("Creating table {}: {}", spec.name, sql);
                match conn.execute_batch(&sql) {
                    Ok(()) => {
                        info!("Created table {}", spec.name);
                        report.created.push(spec.name.clone());
                    }
                    Err(e) => {
                        warn!("Error creating table {}, skipping: {}", spec.name, e);
                        report.failed.push(SchemaError {
                            table: spec.name.clone(),
                            source: e,
                        });
                    }
                }
            }

            Ok(report)
        })
    }

    /// Check that every declared table exists
    ///
    /// Tables present in the database but not declared are ignored. A failure to list
    /// the tables is logged and reported as `false`.
    pub fn verify_all(&self, controller: &ConnectionController) -> Result<bool, ConnectionError> {
        match self.missing_tables(controller) {
            Ok(missing) => Ok(missing.is_empty()),
            Err(ExecError::Connection(e)) => Err(e),
            Err(e) => {
                warn!("Error while verifying tables: {}", e);
                Ok(false)
            }
        }
    }

    /// Declared tables that do not exist in the database, in registration order
    pub fn missing_tables(
        &self,
        controller: &ConnectionController,
    ) -> Result<Vec<String>, ExecError> {
        controller.with_connection(|conn| {
            let live = live_table_set(conn).map_err(listing_error)?;

            Ok(self
                .tables
                .iter()
                .filter(|spec| !live.contains(&spec.name.to_ascii_lowercase()))
                .map(|spec| spec.name.clone())
                .collect())
        })
    }
}

/// Names of all tables in the database
pub fn live_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(LIVE_TABLES_SQL)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

/// Names of all tables in the database behind `controller`
pub(crate) fn list_live_tables(
    controller: &ConnectionController,
) -> Result<Vec<String>, ExecError> {
    controller.with_connection(|conn| live_tables(conn).map_err(listing_error))
}

/// Check if a table exists in the database
pub fn table_exists(conn: &Connection, table_name: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1 COLLATE NOCASE",
        [table_name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn listing_error(source: rusqlite::Error) -> ExecError {
    ExecError::Statement {
        operation: Operation::Select,
        sql: LIVE_TABLES_SQL.to_string(),
        attempts: 1,
        source,
    }
}

fn live_table_set(conn: &Connection) -> rusqlite::Result<HashSet<String>> {
    Ok(live_tables(conn)?
        .into_iter()
        .map(|name| name.to_ascii_lowercase())
        .collect())
}
