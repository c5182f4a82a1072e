//! Forward-only result cursor returned by selects

use std::sync::Arc;

use rusqlite::types::{FromSql, Value, ValueRef};

use crate::error::ExecError;

/// One result row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value by column index
    pub fn value(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Raw value by column name (case-insensitive)
    pub fn value_by_name(&self, name: &str) -> Option<&Value> {
        self.column_index(name).and_then(|idx| self.values.get(idx))
    }

    /// Typed value by column index
    pub fn get<T: FromSql>(&self, idx: usize) -> Result<T, ExecError> {
        let column = self
            .columns
            .get(idx)
            .cloned()
            .unwrap_or_else(|| idx.to_string());
        let value = self.values.get(idx).ok_or_else(|| ExecError::Column {
            column: column.clone(),
            message: "index out of range".to_string(),
        })?;
        convert(&column, value)
    }

    /// Typed value by column name (case-insensitive)
    pub fn get_by_name<T: FromSql>(&self, name: &str) -> Result<T, ExecError> {
        let idx = self.column_index(name).ok_or_else(|| ExecError::Column {
            column: name.to_string(),
            message: "no such column".to_string(),
        })?;
        self.get(idx)
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }
}

fn convert<T: FromSql>(column: &str, value: &Value) -> Result<T, ExecError> {
    T::column_result(ValueRef::from(value)).map_err(|e| ExecError::Column {
        column: column.to_string(),
        message: e.to_string(),
    })
}

/// Single-pass cursor over the rows of a select
///
/// Rows are read from the database before the cursor is handed out, so holding a
/// cursor does not keep the connection locked. Iterate it once, or drop it with
/// [`close`](Self::close) when done.
#[derive(Debug)]
pub struct RowCursor {
    columns: Arc<[String]>,
    rows: std::vec::IntoIter<Vec<Value>>,
}

impl RowCursor {
    pub(crate) fn new(columns: Arc<[String]>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows: rows.into_iter(),
        }
    }

    /// Column names of the result set
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows not yet read
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// Release the cursor and any unread rows
    pub fn close(self) {}
}

impl Iterator for RowCursor {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.rows.next().map(|values| Row {
            columns: self.columns.clone(),
            values,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for RowCursor {}
