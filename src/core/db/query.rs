/// Query Helper Module
///
/// Metadata queries (`SELECT version()`, `SHOW TABLES`, `SHOW COLUMNS`, ...)
/// return a handful of short textual rows. This module fetches those into
/// memory as strings. Table data never goes through here; it is streamed by
/// [`crate::rows`].

use crate::core::db::connection::{Connection, Value};
use crate::core::{DumpError, Result};

/// Represents the fully materialized result of a metadata query
#[derive(Debug)]
pub struct QueryResult {
    /// Column names from the query result
    pub columns: Vec<String>,
    /// Rows of data as optional strings (`None` for NULL)
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryResult {
    /// Returns the position of a column by case-insensitive name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }
}

/// Quotes an identifier with backticks, doubling embedded backticks
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Executes a metadata query and collects every row as strings
///
/// # Errors
///
/// Returns `DumpError::Query` if the query fails and `DumpError::Schema`
/// if a cell is not textual.
pub fn query_all<C: Connection + ?Sized>(conn: &mut C, sql: &str) -> Result<QueryResult> {
    let mut cursor = conn.query(sql)?;
    let columns: Vec<String> = cursor.columns().iter().map(|c| c.name.clone()).collect();

    let mut rows = Vec::new();
    while let Some(row) = cursor.next_row()? {
        let row = row
            .into_iter()
            .map(|v| value_to_string(v, sql))
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }

    Ok(QueryResult { columns, rows })
}

/// Executes a query expected to return exactly one non-NULL value
pub fn query_single_string<C: Connection + ?Sized>(conn: &mut C, sql: &str) -> Result<String> {
    let result = query_all(conn, sql)?;
    result
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.into_iter().next())
        .flatten()
        .ok_or_else(|| DumpError::Schema(format!("{} returned no value", sql)))
}

/// Converts a metadata cell to text
fn value_to_string(value: Value, sql: &str) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::Bytes(b) => String::from_utf8(b)
            .map(Some)
            .map_err(|e| DumpError::Schema(format!("{} returned non UTF-8 text: {}", sql, e))),
        Value::Int(i) => Ok(Some(i.to_string())),
        Value::UInt(u) => Ok(Some(u.to_string())),
        other => Err(DumpError::Schema(format!(
            "{} returned a non-textual value: {:?}",
            sql, other
        ))),
    }
}
