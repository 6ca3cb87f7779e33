//! Streaming of table rows into batched `INSERT` statements.
//!
//! [`RowStream`] pulls rows one at a time from a forward-only cursor and
//! renders each into a `(v1,v2,...)` tuple. [`write_inserts`] groups the
//! tuples into statements of at most `batch_size` rows. A batch is only
//! written to the sink once it is complete, so a failure mid-table never
//! leaves a truncated `INSERT` behind.

use std::io::Write;

use tracing::debug;

use crate::core::db::{quote_ident, Connection, RowCursor, TableColumn, Value};
use crate::core::{DumpError, Result};
use crate::value::SqlValue;

/// A rendered `(v1,v2,...)` tuple
pub type RenderedRow = Vec<u8>;

/// Builds the row query for the given stored columns
pub fn select_sql(table: &str, columns: &[TableColumn]) -> String {
    format!("SELECT {} FROM {}", column_list(columns), quote_ident(table))
}

/// Builds the `INSERT INTO ... VALUES ` prefix shared by every batch
pub fn insert_prefix(table: &str, columns: &[TableColumn]) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ",
        quote_ident(table),
        column_list(columns)
    )
}

fn column_list(columns: &[TableColumn]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Lazy, forward-only sequence of rendered rows for one table.
///
/// The underlying cursor is released when the stream is dropped.
pub struct RowStream<'a> {
    cursor: Box<dyn RowCursor + 'a>,
    columns: &'a [TableColumn],
    finished: bool,
}

impl<'a> RowStream<'a> {
    /// Issues the row query and checks the result width against `columns`
    pub fn open<C: Connection + ?Sized>(
        conn: &'a mut C,
        table: &str,
        columns: &'a [TableColumn],
    ) -> Result<Self> {
        let sql = select_sql(table, columns);
        let cursor = conn.query(&sql)?;

        let width = cursor.columns().len();
        if width != columns.len() {
            return Err(DumpError::Schema(format!(
                "{} returned {} columns, expected {}",
                sql,
                width,
                columns.len()
            )));
        }

        Ok(RowStream {
            cursor,
            columns,
            finished: false,
        })
    }

    fn render_row(&self, values: Vec<Value>) -> Result<RenderedRow> {
        if values.len() != self.columns.len() {
            return Err(DumpError::Schema(format!(
                "row has {} values, expected {}",
                values.len(),
                self.columns.len()
            )));
        }

        let mut out = Vec::with_capacity(16 * values.len());
        out.push(b'(');
        for (i, (value, column)) in values.into_iter().zip(self.columns).enumerate() {
            if i > 0 {
                out.push(b',');
            }
            SqlValue::decode(value, column.kind, &column.name)?.render_into(&mut out);
        }
        out.push(b')');
        Ok(out)
    }
}

impl Iterator for RowStream<'_> {
    type Item = Result<RenderedRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let item = match self.cursor.next_row() {
            Ok(Some(values)) => self.render_row(values),
            Ok(None) => {
                self.finished = true;
                return None;
            }
            Err(e) => Err(e),
        };

        if item.is_err() {
            self.finished = true;
        }
        Some(item)
    }
}

/// Writes rendered rows as `INSERT` statements of at most `batch_size` rows
///
/// Returns the number of rows written.
///
/// # Errors
///
/// Stops at the first row or sink error. Rows of the batch in progress are
/// dropped; every statement already written is complete.
pub fn write_inserts<W, I>(out: &mut W, prefix: &str, rows: I, batch_size: usize) -> Result<u64>
where
    W: Write + ?Sized,
    I: Iterator<Item = Result<RenderedRow>>,
{
    let batch_size = batch_size.max(1);
    let mut batch: Vec<u8> = Vec::new();
    let mut in_batch = 0usize;
    let mut total = 0u64;

    for row in rows {
        let row = row?;
        if in_batch == 0 {
            batch.extend_from_slice(prefix.as_bytes());
        } else {
            batch.push(b',');
        }
        batch.extend_from_slice(&row);
        in_batch += 1;
        total += 1;

        if in_batch == batch_size {
            flush_batch(out, &mut batch, in_batch)?;
            in_batch = 0;
        }
    }

    if in_batch > 0 {
        flush_batch(out, &mut batch, in_batch)?;
    }

    Ok(total)
}

fn flush_batch<W: Write + ?Sized>(out: &mut W, batch: &mut Vec<u8>, rows: usize) -> Result<()> {
    batch.extend_from_slice(b";\n");
    out.write_all(batch)?;
    debug!("Flushed INSERT batch of {} rows ({} bytes)", rows, batch.len());
    batch.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockConnection, MockRows};
    use crate::value::ValueKind;

    fn columns() -> Vec<TableColumn> {
        vec![
            TableColumn {
                name: "id".to_string(),
                type_name: "int(11)".to_string(),
                nullable: false,
                kind: ValueKind::Integer,
            },
            TableColumn {
                name: "name".to_string(),
                type_name: "varchar(32)".to_string(),
                nullable: true,
                kind: ValueKind::Text,
            },
        ]
    }

    fn rows(n: i64) -> MockRows {
        (1..=n).fold(MockRows::new(&["id", "name"]), |rows, i| {
            rows.add_row(vec![Value::Int(i), Value::text(format!("n{}", i))])
        })
    }

    #[test]
    fn test_statement_text() {
        let cols = columns();
        assert_eq!(select_sql("t", &cols), "SELECT `id`, `name` FROM `t`");
        assert_eq!(insert_prefix("t", &cols), "INSERT INTO `t` (`id`, `name`) VALUES ");
    }

    #[test]
    fn test_row_stream_renders_tuples() {
        let cols = columns();
        let mut conn = MockConnection::new();
        conn.expect_query(
            "^SELECT `id`, `name` FROM `t`$",
            MockRows::new(&["id", "name"])
                .add_row(vec![Value::Int(1), Value::text("O'Brien")])
                .add_row(vec![Value::Int(2), Value::Null]),
        );

        let rendered: Vec<String> = RowStream::open(&mut conn, "t", &cols)
            .unwrap()
            .map(|r| String::from_utf8(r.unwrap()).unwrap())
            .collect();
        assert_eq!(rendered, vec!["(1,'O\\'Brien')", "(2,NULL)"]);
        assert_eq!(conn.open_cursors(), 0);
    }

    #[test]
    fn test_row_stream_width_mismatch() {
        let cols = columns();
        let mut conn = MockConnection::new();
        conn.expect_query("^SELECT", MockRows::new(&["id"]));

        assert!(matches!(
            RowStream::open(&mut conn, "t", &cols),
            Err(DumpError::Schema(_))
        ));
    }

    #[test]
    fn test_row_stream_stops_after_error() {
        let cols = columns();
        let mut conn = MockConnection::new();
        conn.expect_query("^SELECT", rows(3).fail_after(1, "cursor reset"));

        let mut stream = RowStream::open(&mut conn, "t", &cols).unwrap();
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_err());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_write_inserts_batches() {
        let cols = columns();
        let mut conn = MockConnection::new();
        conn.expect_query("^SELECT", rows(5));

        let mut out = Vec::new();
        let stream = RowStream::open(&mut conn, "t", &cols).unwrap();
        let written = write_inserts(&mut out, &insert_prefix("t", &cols), stream, 2).unwrap();

        assert_eq!(written, 5);
        let text = String::from_utf8(out).unwrap();
        let statements: Vec<&str> = text.lines().collect();
        assert_eq!(statements.len(), 3);
        assert_eq!(
            statements[0],
            "INSERT INTO `t` (`id`, `name`) VALUES (1,'n1'),(2,'n2');"
        );
        assert_eq!(statements[2], "INSERT INTO `t` (`id`, `name`) VALUES (5,'n5');");
    }

    #[test]
    fn test_write_inserts_never_flushes_partial_batch() {
        let cols = columns();
        let mut conn = MockConnection::new();
        conn.expect_query("^SELECT", rows(5).fail_after(3, "cursor reset"));

        let mut out = Vec::new();
        let stream = RowStream::open(&mut conn, "t", &cols).unwrap();
        let result = write_inserts(&mut out, &insert_prefix("t", &cols), stream, 2);

        assert!(matches!(result, Err(DumpError::Query(_))));
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "INSERT INTO `t` (`id`, `name`) VALUES (1,'n1'),(2,'n2');\n");
    }

    #[test]
    fn test_write_inserts_empty_input() {
        let mut out = Vec::new();
        let written = write_inserts(&mut out, "INSERT INTO `t` VALUES ", std::iter::empty(), 10).unwrap();
        assert_eq!(written, 0);
        assert!(out.is_empty());
    }
}
