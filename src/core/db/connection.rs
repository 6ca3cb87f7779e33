/// Connection Seam Module
///
/// The dump engine never opens connections itself. Callers hand it an
/// already-authenticated handle implementing [`Connection`]; the engine only
/// drives transaction control, parameterless statements and forward-only
/// row cursors through it.

use crate::core::Result;
use chrono::NaiveDateTime;

/// Represents database transaction states
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TransactionState {
    /// No active transaction (autocommit mode)
    #[default]
    Autocommit,
    /// Transaction in progress
    Transaction,
}

/// A single cell as delivered by the driver.
///
/// Text-protocol drivers hand most values over as `Bytes`; binary-protocol
/// drivers use the typed variants. The renderer decodes either form
/// according to the column's declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Convenience constructor for textual payloads
    pub fn text(s: impl Into<String>) -> Self {
        Value::Bytes(s.into().into_bytes())
    }
}

/// Metadata the driver reports for one result column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDesc {
    /// Column name (or expression label)
    pub name: String,
    /// Driver type name, e.g. "VARCHAR" or "BIGINT UNSIGNED"
    pub type_name: String,
    /// Whether the column may hold NULL
    pub nullable: bool,
}

impl ColumnDesc {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, nullable: bool) -> Self {
        ColumnDesc {
            name: name.into(),
            type_name: type_name.into(),
            nullable,
        }
    }
}

/// Forward-only, non-restartable result cursor.
///
/// Dropping the cursor releases it on the server side; the engine relies on
/// that to close cursors on every exit path.
pub trait RowCursor {
    /// Result column metadata, available before the first row is fetched
    fn columns(&self) -> &[ColumnDesc];

    /// Fetches the next row, or `None` once the result set is exhausted
    fn next_row(&mut self) -> Result<Option<Vec<Value>>>;
}

/// An open, authenticated database connection.
pub trait Connection {
    /// Starts a transaction; the dump holds it for its whole duration
    fn begin(&mut self) -> Result<()>;

    /// Rolls back the current transaction
    fn rollback(&mut self) -> Result<()>;

    /// Executes a statement that returns no rows (`LOCK TABLES`, ...)
    fn execute(&mut self, sql: &str) -> Result<()>;

    /// Executes a query and returns a cursor over its rows
    fn query(&mut self, sql: &str) -> Result<Box<dyn RowCursor + '_>>;
}
