//! SQL fragments with bound parameters
//!
//! CRUD callers supply the variable parts of a statement (a WHERE predicate, an ORDER BY,
//! a SET list) as a [`Clause`]: SQL text using anonymous `?` placeholders plus the values
//! bound to them in order. Values are never spliced into the SQL text.
//!
//! ```rust,ignore
//! use sqlkeeper::database::Clause;
//!
//! let filter = Clause::new("WHERE name = ? AND age > ?")
//!     .bind("Alice".to_string())
//!     .bind(30);
//! ```

use std::fmt;

use rusqlite::types::Value;

use crate::error::ExecError;

/// SQL fragment plus the values bound to its `?` placeholders
///
/// Numbered placeholders (`?1`, `:name`) are not supported: clauses are concatenated
/// when a statement is built, and parameters are bound positionally in that order.
#[derive(Clone, Default, PartialEq)]
pub struct Clause {
    sql: String,
    params: Vec<Value>,
}

impl Clause {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// A clause with no SQL and no parameters
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bind the next `?` placeholder
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn sql(&self) -> &str {
        self.sql.trim()
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.sql().is_empty()
    }
}

impl fmt::Debug for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // values omitted
        f.debug_struct("Clause")
            .field("sql", &self.sql())
            .field("params", &self.params.len())
            .finish()
    }
}

impl From<&str> for Clause {
    fn from(sql: &str) -> Self {
        Clause::new(sql)
    }
}

/// Double-quote a table or column name the way SQLite does
///
/// Embedded `"` are doubled, so any name is accepted and stays a single identifier.
/// `schema.table` is split on its dot when both halves are plain identifiers
/// (`[A-Za-z_][A-Za-z0-9_]*`); any other name is quoted whole. Empty names and names
/// containing NUL are rejected.
pub fn quote_identifier(name: &str) -> Result<String, ExecError> {
    if name.is_empty() || name.contains('\0') {
        return Err(ExecError::InvalidIdentifier(name.to_string()));
    }
    if let Some((schema, table)) = name.split_once('.') {
        if is_identifier(schema) && is_identifier(table) {
            return Ok(format!("{}.{}", quote_part(schema), quote_part(table)));
        }
    }
    Ok(quote_part(name))
}

/// Quote every name in `names`, joined by `, `
pub fn quote_identifiers(names: &[&str]) -> Result<String, ExecError> {
    let quoted = names
        .iter()
        .map(|name| quote_identifier(name.trim()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(quoted.join(", "))
}

/// `?, ?, ?` for `count` parameters
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Append a trailing clause to a statement, if there is one
pub(crate) fn with_clause(statement: String, clause: &Clause) -> String {
    if clause.is_empty() {
        statement
    } else {
        format!("{} {}", statement, clause.sql())
    }
}

fn quote_part(part: &str) -> String {
    format!("\"{}\"", part.replace('"', "\"\""))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clause_binds_in_order() {
        let clause = Clause::new(" WHERE name = ? AND age > ? ")
            .bind("Alice".to_string())
            .bind(30);
        assert_eq!(clause.sql(), "WHERE name = ? AND age > ?");
        assert_eq!(
            clause.params(),
            &[Value::Text("Alice".to_string()), Value::Integer(30)]
        );
        assert!(!clause.is_empty());
    }

    #[test]
    fn test_empty_clause() {
        assert!(Clause::empty().is_empty());
        assert!(Clause::new("   ").is_empty());
        assert_eq!(with_clause("SELECT 1".to_string(), &Clause::empty()), "SELECT 1");
    }

    #[test]
    fn test_debug_hides_values() {
        let clause = Clause::new("WHERE password = ?").bind("hunter2".to_string());
        let debug = format!("{:?}", clause);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("params: 1"));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users").unwrap(), "\"users\"");
        assert_eq!(quote_identifier("main.users").unwrap(), "\"main\".\"users\"");
        assert_eq!(quote_identifier("_tmp1").unwrap(), "\"_tmp1\"");
        assert_eq!(quote_identifier("order items").unwrap(), "\"order items\"");
        assert_eq!(quote_identifier("café").unwrap(), "\"café\"");
        assert_eq!(quote_identifier("na\"me").unwrap(), "\"na\"\"me\"");
        assert_eq!(
            quote_identifier("users\"; DROP TABLE users; --").unwrap(),
            "\"users\"\"; DROP TABLE users; --\""
        );
        assert_eq!(quote_identifier("a.b.c").unwrap(), "\"a.b.c\"");
        assert_eq!(quote_identifier("v1.2 data").unwrap(), "\"v1.2 data\"");

        for bad in ["", "na\0me"] {
            assert!(
                matches!(quote_identifier(bad), Err(ExecError::InvalidIdentifier(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_quote_identifiers_and_placeholders() {
        assert_eq!(
            quote_identifiers(&["name", " age "]).unwrap(),
            "\"name\", \"age\""
        );
        assert_eq!(placeholders(3), "?, ?, ?");
        assert_eq!(placeholders(0), "");
    }
}
