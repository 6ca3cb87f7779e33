//! Table discovery for the connected schema.

use tracing::debug;

use crate::core::db::{query_all, Connection};
use crate::core::{DumpError, Result};

const SHOW_FULL_TABLES: &str = "SHOW FULL TABLES";
const TABLE_TYPE: &str = "Table_type";

/// Lists the base tables of the connected schema in the order the server
/// returns them. The order is kept as is; an empty schema is valid.
///
/// Views are skipped: they have no rows of their own, and their
/// `CREATE VIEW` text cannot follow `DROP TABLE`.
///
/// # Errors
///
/// Returns `DumpError::Query` if the query fails; there is no retry.
pub fn list_tables<C: Connection + ?Sized>(conn: &mut C) -> Result<Vec<String>> {
    let result = query_all(conn, SHOW_FULL_TABLES)?;
    let type_idx = result.column_index(TABLE_TYPE);

    let mut tables = Vec::new();
    for row in result.rows {
        let table_type = type_idx.and_then(|i| row.get(i).cloned().flatten());
        let name = row
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| DumpError::Schema(format!("{} returned an empty name", SHOW_FULL_TABLES)))?;

        match table_type.as_deref() {
            Some(kind) if !kind.eq_ignore_ascii_case("BASE TABLE") => {
                debug!("Skipping `{}` ({})", name, kind);
            }
            _ => tables.push(name),
        }
    }

    Ok(tables)
}
