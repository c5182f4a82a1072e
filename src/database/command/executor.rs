//! Generic CRUD execution over the managed connection
//!
//! Every verb follows the same steps: make sure the connection is open, build the
//! statement from validated identifiers and a bound [`Clause`], execute it, and on
//! failure let the controller's retry policy decide whether to run it again.

use std::fmt;
use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, ToSql};
use tracing::debug;

use super::clause::{placeholders, quote_identifier, quote_identifiers, with_clause, Clause};
use super::cursor::RowCursor;
use crate::database::core::{run_with_retry_if, ConnectionController, Operation, TableSpec};
use crate::error::{ConnectionError, ExecError};

/// Runs insert/select/update/delete statements through a [`ConnectionController`]
pub struct CommandExecutor<'a> {
    controller: &'a ConnectionController,
}

impl<'a> CommandExecutor<'a> {
    pub fn new(controller: &'a ConnectionController) -> Self {
        Self { controller }
    }

    /// Insert one row and return its row id
    ///
    /// `fields` and `values` pair up by position. An empty field list inserts a row of
    /// defaults.
    ///
    /// ```rust,ignore
    /// let id = executor.insert("users", &["name"], rusqlite::params!["Alice"])?;
    /// ```
    pub fn insert(
        &self,
        table: &str,
        fields: &[&str],
        values: &[&dyn ToSql],
    ) -> Result<i64, ExecError> {
        if fields.len() != values.len() {
            return Err(ExecError::Arity {
                fields: fields.len(),
                values: values.len(),
            });
        }

        let table = quote_identifier(table)?;
        let sql = if fields.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", table)
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                quote_identifiers(fields)?,
                placeholders(values.len())
            )
        };

        self.run(Operation::Insert, &sql, |conn| {
            conn.execute(&sql, values)?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Select `fields` from `table` with a trailing clause
    ///
    /// An empty field list, or `["*"]`, selects every column. The clause carries
    /// anything after the table name: `WHERE`, `ORDER BY`, `LIMIT`.
    pub fn select(
        &self,
        fields: &[&str],
        table: &str,
        clause: &Clause,
    ) -> Result<RowCursor, ExecError> {
        let columns = match fields {
            [] | ["*"] => "*".to_string(),
            _ => quote_identifiers(fields)?,
        };
        let sql = with_clause(
            format!("SELECT {} FROM {}", columns, quote_identifier(table)?),
            clause,
        );

        self.run(Operation::Select, &sql, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let columns: Arc<[String]> = stmt
                .column_names()
                .into_iter()
                .map(String::from)
                .collect();
            let width = columns.len();

            let rows = stmt
                .query_map(params_from_iter(clause.params()), |row| {
                    (0..width)
                        .map(|idx| row.get::<_, Value>(idx))
                        .collect::<rusqlite::Result<Vec<_>>>()
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(RowCursor::new(columns, rows))
        })
    }

    /// Update rows of `table`
    ///
    /// `set` holds the assignments (`name = ?, age = ?`), `clause` the trailing part
    /// (usually a `WHERE`). Set parameters are bound before clause parameters. Returns
    /// the number of rows changed.
    pub fn update(&self, table: &str, set: &Clause, clause: &Clause) -> Result<usize, ExecError> {
        if set.is_empty() {
            return Err(ExecError::MissingAssignments);
        }

        let sql = with_clause(
            format!("UPDATE {} SET {}", quote_identifier(table)?, set.sql()),
            clause,
        );

        self.run(Operation::Update, &sql, |conn| {
            conn.execute(
                &sql,
                params_from_iter(set.params().iter().chain(clause.params())),
            )
        })
    }

    /// Delete the rows of `table` matching `predicate`
    ///
    /// The predicate is the condition only; `WHERE` is added here. An empty predicate
    /// is refused rather than deleting every row.
    pub fn delete(&self, table: &str, predicate: &Clause) -> Result<usize, ExecError> {
        if predicate.is_empty() {
            return Err(ExecError::MissingPredicate);
        }

        let sql = format!(
            "DELETE FROM {} WHERE {}",
            quote_identifier(table)?,
            predicate.sql()
        );

        self.run(Operation::Delete, &sql, |conn| {
            conn.execute(&sql, params_from_iter(predicate.params()))
        })
    }

    /// Create a single table, retrying like any other statement
    ///
    /// Unlike [`SchemaRegistry::reconcile_all`](crate::database::SchemaRegistry::reconcile_all),
    /// a failure here is returned to the caller.
    pub fn create_table(&self, spec: &TableSpec) -> Result<(), ExecError> {
        let sql = spec.create_sql();
        self.run(Operation::CreateTable, &sql, |conn| conn.execute_batch(&sql))
    }

    fn run<T, F>(&self, operation: Operation, sql: &str, mut attempt: F) -> Result<T, ExecError>
    where
        F: FnMut(&Connection) -> rusqlite::Result<T>,
    {
        debug!("{}: {}", operation, sql);

        let result = run_with_retry_if(
            self.controller.policy(),
            operation,
            self.controller.settings().max_attempts,
            || {
                self.controller
                    .with_connection(|conn| attempt(conn).map_err(AttemptError::Sql))
            },
            // the controller already applied the policy while opening
            |e| matches!(e, AttemptError::Sql(_)),
        );

        result.map_err(|(err, attempts)| match err {
            AttemptError::Connection(e) => ExecError::Connection(e),
            AttemptError::Sql(source) => ExecError::Statement {
                operation,
                sql: sql.to_string(),
                attempts,
                source,
            },
        })
    }
}

enum AttemptError {
    Connection(ConnectionError),
    Sql(rusqlite::Error),
}

impl From<ConnectionError> for AttemptError {
    fn from(e: ConnectionError) -> Self {
        AttemptError::Connection(e)
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Connection(e) => write!(f, "{}", e),
            AttemptError::Sql(e) => write!(f, "{}", e),
        }
    }
}
