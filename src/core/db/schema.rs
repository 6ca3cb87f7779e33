/// Schema Introspection Module
///
/// This module fetches what the dump needs to know about one table: the
/// server's own `CREATE TABLE` text, kept verbatim, and the ordered list of
/// stored columns with the literal kind each one renders as.

use crate::core::db::query::{query_all, quote_ident};
use crate::core::db::connection::Connection;
use crate::core::{DumpError, Result};
use crate::value::ValueKind;
use tracing::debug;

/// A table name plus its captured creation statement
#[derive(Debug, Clone, PartialEq)]
pub struct TableDescriptor {
    /// Table name
    pub name: String,
    /// `CREATE TABLE` statement exactly as the server printed it
    pub create_sql: String,
}

/// A stored column of a dumped table
#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    /// Column name
    pub name: String,
    /// Declared type, e.g. "int(11) unsigned"
    pub type_name: String,
    /// Whether the column allows NULL values
    pub nullable: bool,
    /// Literal form the column's values render as
    pub kind: ValueKind,
}

/// Fetches the server's `CREATE TABLE` statement for a table
///
/// # Errors
///
/// Returns `DumpError::Query` if the table vanished or is not readable,
/// `DumpError::Schema` if the reply has no statement column.
pub fn fetch_create_table<C: Connection + ?Sized>(
    conn: &mut C,
    table: &str,
) -> Result<TableDescriptor> {
    let sql = format!("SHOW CREATE TABLE {}", quote_ident(table));
    let result = query_all(conn, &sql)?;

    let create_sql = result
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.into_iter().nth(1))
        .flatten()
        .ok_or_else(|| DumpError::Schema(format!("{} returned no statement", sql)))?;

    Ok(TableDescriptor {
        name: table.to_string(),
        create_sql,
    })
}

/// Fetches the stored columns of a table in declaration order
///
/// Generated columns are left out: the server recomputes them on restore
/// and rejects explicit values for them.
///
/// # Errors
///
/// Returns `DumpError::UnsupportedType` if a column type has no literal form.
pub fn fetch_columns<C: Connection + ?Sized>(conn: &mut C, table: &str) -> Result<Vec<TableColumn>> {
    let sql = format!("SHOW COLUMNS FROM {}", quote_ident(table));
    let result = query_all(conn, &sql)?;

    let index = |name: &str| {
        result
            .column_index(name)
            .ok_or_else(|| DumpError::Schema(format!("{} has no `{}` column", sql, name)))
    };
    let field_idx = index("Field")?;
    let type_idx = index("Type")?;
    let null_idx = index("Null")?;
    let extra_idx = index("Extra")?;

    let mut columns = Vec::new();
    for row in &result.rows {
        let cell = |i: usize| row.get(i).cloned().flatten().unwrap_or_default();
        let name = cell(field_idx);
        let extra = cell(extra_idx);

        if is_generated(&extra) {
            debug!("Skipping generated column `{}`.`{}`", table, name);
            continue;
        }

        let type_name = cell(type_idx);
        let kind = ValueKind::classify(&name, &type_name)?;
        columns.push(TableColumn {
            nullable: cell(null_idx).eq_ignore_ascii_case("YES"),
            name,
            type_name,
            kind,
        });
    }

    Ok(columns)
}

/// Whether a `SHOW COLUMNS` Extra value marks a generated column
pub fn is_generated(extra: &str) -> bool {
    extra.to_ascii_uppercase().contains("GENERATED")
}
