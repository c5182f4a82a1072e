//! Parameterized CRUD commands
//!
//! Identifiers are validated and quoted, values always travel as bound parameters.

mod clause;
mod cursor;
mod executor;

pub use clause::{quote_identifier, quote_identifiers, Clause};
pub use cursor::{Row, RowCursor};
pub use executor::CommandExecutor;
