//! Consistent SQL dumps of a MySQL-compatible database.
//!
//! [`dump`] reads every table through a [`Connection`] inside one
//! transaction and writes a script that recreates the schema and data:
//! a session-variable header, per table a `DROP TABLE` / `CREATE TABLE`
//! structure section and a data section of batched `INSERT` statements,
//! then a footer restoring the session variables.
//!
//! ```no_run
//! # fn run<C: sqldump::Connection>(conn: &mut C) -> sqldump::Result<()> {
//! let config = sqldump::load_config("dump.toml")?;
//! let mut out = config.open_output()?;
//! let summary = sqldump::dump(conn, &mut out, &config)?;
//! println!("{} tables, {} rows", summary.tables, summary.rows);
//! # Ok(())
//! # }
//! ```

// Core infrastructure modules
pub mod core;

// Dump pipeline
pub mod catalog;
pub mod config;
pub mod dump;
pub mod rows;
pub mod template;
pub mod value;

// Scripted connection for tests
pub mod test_utils;

pub use config::{load_config, DumpConfig};
pub use core::db::{ColumnDesc, Connection, RowCursor, Value};
pub use core::{DumpError, Result};
pub use dump::{dump, DumpSession, DumpSummary};
pub use value::{SqlValue, ValueKind};
