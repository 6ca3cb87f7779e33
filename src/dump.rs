//! The dump engine.
//!
//! A dump runs strictly sequentially inside one transaction so that every
//! table is read from the same snapshot:
//!
//! 1. begin the transaction
//! 2. fetch the server version and write the header
//! 3. list the tables
//! 4. per table: structure section, then the data section, optionally
//!    bracketed by a server-side read lock
//! 5. write the footer
//! 6. roll the transaction back
//!
//! The transaction is always rolled back, never committed: the dump writes
//! nothing, and rollback is what releases the snapshot.

use std::io::Write;

use chrono::Local;
use tracing::{debug, error, info, warn};

use crate::catalog;
use crate::config::DumpConfig;
use crate::core::db::{fetch_columns, fetch_create_table, query_single_string, quote_ident};
use crate::core::db::{Connection, TableColumn};
use crate::core::Result;
use crate::rows::{insert_prefix, write_inserts, RowStream};

const SERVER_VERSION: &str = "SELECT version()";
const UNLOCK_TABLES: &str = "UNLOCK TABLES";
const COMPLETED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What a successful dump wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DumpSummary {
    pub tables: usize,
    pub rows: u64,
}

/// Dumps every table reachable through `conn` into `out`.
///
/// `conn` must be open with no transaction in progress. On failure the
/// output is incomplete; the transaction has still been rolled back.
///
/// # Errors
///
/// Returns the first failure encountered. A rollback failure after an
/// earlier error is logged and the earlier error is returned.
pub fn dump<C, W>(conn: &mut C, out: &mut W, config: &DumpConfig) -> Result<DumpSummary>
where
    C: Connection + ?Sized,
    W: Write + ?Sized,
{
    config.validate()?;
    DumpSession::new(conn, out, config).run()
}

/// State of one dump invocation.
pub struct DumpSession<'a, C: Connection + ?Sized, W: Write + ?Sized> {
    conn: &'a mut C,
    out: &'a mut W,
    config: &'a DumpConfig,
    server_version: String,
}

impl<'a, C: Connection + ?Sized, W: Write + ?Sized> DumpSession<'a, C, W> {
    pub fn new(conn: &'a mut C, out: &'a mut W, config: &'a DumpConfig) -> Self {
        DumpSession {
            conn,
            out,
            config,
            server_version: String::new(),
        }
    }

    /// Runs the dump inside one transaction and rolls it back.
    pub fn run(mut self) -> Result<DumpSummary> {
        self.conn.begin()?;

        let result = self.dump_all();
        let rollback = self.conn.rollback();

        match (result, rollback) {
            (Ok(summary), Ok(())) => {
                info!(
                    "Dump completed: {} tables, {} rows (server {})",
                    summary.tables, summary.rows, self.server_version
                );
                Ok(summary)
            }
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(rollback_err)) => {
                error!("Rollback after failed dump also failed: {}", rollback_err);
                Err(e)
            }
        }
    }

    fn dump_all(&mut self) -> Result<DumpSummary> {
        self.server_version = query_single_string(&mut *self.conn, SERVER_VERSION)?;
        self.config
            .boilerplate
            .write_header(&mut *self.out, &self.server_version)?;

        let tables = catalog::list_tables(&mut *self.conn)?;
        info!(
            "Dumping {} tables from server {}",
            tables.len(),
            self.server_version
        );

        let mut rows = 0;
        for table in &tables {
            rows += self.dump_table(table)?;
        }

        let completed_at = Local::now().format(COMPLETED_AT_FORMAT).to_string();
        self.config.boilerplate.write_footer(&mut *self.out, &completed_at)?;
        self.out.flush()?;

        Ok(DumpSummary {
            tables: tables.len(),
            rows,
        })
    }

    fn dump_table(&mut self, table: &str) -> Result<u64> {
        debug!("Dumping table `{}`", table);

        let descriptor = fetch_create_table(&mut *self.conn, table)?;
        self.config
            .boilerplate
            .write_table_structure(&mut *self.out, &descriptor)?;

        let columns = fetch_columns(&mut *self.conn, table)?;
        self.config.boilerplate.write_data_header(&mut *self.out, table)?;

        if !self.config.lock_tables {
            return self.dump_table_data(table, &columns);
        }

        self.conn
            .execute(&format!("LOCK TABLES {} READ /*!32311 LOCAL */", quote_ident(table)))?;
        let result = self.dump_table_data(table, &columns);
        let unlock = self.conn.execute(UNLOCK_TABLES);

        match (result, unlock) {
            (Ok(rows), Ok(())) => Ok(rows),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(unlock_err)) => {
                warn!("Unlocking `{}` after failure also failed: {}", table, unlock_err);
                Err(e)
            }
        }
    }

    /// Writes the data section body. Lock lines are only written when the
    /// table has rows; the key markers are always written.
    fn dump_table_data(&mut self, table: &str, columns: &[TableColumn]) -> Result<u64> {
        let config = self.config;
        let boilerplate = &config.boilerplate;
        let out = &mut *self.out;

        if columns.is_empty() {
            debug!("Table `{}` has no stored columns", table);
            boilerplate.write_disable_keys(out, table)?;
            boilerplate.write_enable_keys(out, table)?;
            return Ok(0);
        }

        let mut rows = RowStream::open(&mut *self.conn, table, columns)?.peekable();
        if rows.peek().is_none() {
            boilerplate.write_disable_keys(out, table)?;
            boilerplate.write_enable_keys(out, table)?;
            return Ok(0);
        }

        if config.lock_tables {
            boilerplate.write_lock(out, table)?;
        }
        boilerplate.write_disable_keys(out, table)?;
        let written = write_inserts(
            out,
            &insert_prefix(table, columns),
            rows,
            config.batch_size,
        )?;
        boilerplate.write_enable_keys(out, table)?;
        if config.lock_tables {
            boilerplate.write_unlock(out)?;
        }

        debug!("Dumped {} rows from `{}`", written, table);
        Ok(written)
    }
}
