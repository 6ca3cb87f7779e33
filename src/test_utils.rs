/// # Test Utilities Module
///
/// A scripted stand-in for a live database connection.
///
/// [`MockConnection`] holds an ordered list of expected calls. Every call the
/// engine makes must match the next expectation (queries and statements are
/// matched with a regular expression), otherwise it fails with a
/// `DumpError::Query` naming the unexpected call. After the run,
/// [`MockConnection::expectations_were_met`] reports leftovers.

use crate::core::db::{ColumnDesc, Connection, RowCursor, TransactionState, Value};
use crate::core::{DumpError, Result};
use regex::Regex;
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Canned result set returned for an expected query
#[derive(Debug, Clone, Default)]
pub struct MockRows {
    columns: Vec<ColumnDesc>,
    rows: Vec<Vec<Value>>,
    fail_after: Option<(usize, String)>,
}

impl MockRows {
    /// Result set with nullable VARCHAR columns of the given names
    pub fn new(names: &[&str]) -> Self {
        Self::with_columns(
            names
                .iter()
                .map(|n| ColumnDesc::new(*n, "VARCHAR", true))
                .collect(),
        )
    }

    pub fn with_columns(columns: Vec<ColumnDesc>) -> Self {
        MockRows {
            columns,
            rows: Vec::new(),
            fail_after: None,
        }
    }

    pub fn add_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    /// Makes the cursor fail after yielding `rows` rows
    pub fn fail_after(mut self, rows: usize, message: impl Into<String>) -> Self {
        self.fail_after = Some((rows, message.into()));
        self
    }
}

#[derive(Debug)]
enum Expectation {
    Begin(Option<String>),
    Rollback(Option<String>),
    Query(Regex, std::result::Result<MockRows, String>),
    Execute(Regex, Option<String>),
}

impl Expectation {
    fn describe(&self) -> String {
        match self {
            Expectation::Begin(_) => "BEGIN".to_string(),
            Expectation::Rollback(_) => "ROLLBACK".to_string(),
            Expectation::Query(re, _) => format!("query matching {}", re),
            Expectation::Execute(re, _) => format!("execute matching {}", re),
        }
    }
}

fn pattern(re: &str) -> Regex {
    Regex::new(re).unwrap_or_else(|e| panic!("invalid expectation pattern {}: {}", re, e))
}

/// Scripted connection used in tests
#[derive(Debug, Default)]
pub struct MockConnection {
    expectations: VecDeque<Expectation>,
    state: TransactionState,
    statements: Vec<String>,
    open_cursors: Rc<Cell<usize>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_begin(&mut self) {
        self.expectations.push_back(Expectation::Begin(None));
    }

    pub fn expect_begin_error(&mut self, message: &str) {
        self.expectations
            .push_back(Expectation::Begin(Some(message.to_string())));
    }

    pub fn expect_rollback(&mut self) {
        self.expectations.push_back(Expectation::Rollback(None));
    }

    pub fn expect_rollback_error(&mut self, message: &str) {
        self.expectations
            .push_back(Expectation::Rollback(Some(message.to_string())));
    }

    pub fn expect_query(&mut self, re: &str, rows: MockRows) {
        self.expectations
            .push_back(Expectation::Query(pattern(re), Ok(rows)));
    }

    pub fn expect_query_error(&mut self, re: &str, message: &str) {
        self.expectations
            .push_back(Expectation::Query(pattern(re), Err(message.to_string())));
    }

    pub fn expect_execute(&mut self, re: &str) {
        self.expectations
            .push_back(Expectation::Execute(pattern(re), None));
    }

    pub fn expect_execute_error(&mut self, re: &str, message: &str) {
        self.expectations
            .push_back(Expectation::Execute(pattern(re), Some(message.to_string())));
    }

    /// Every call made so far, in order (`BEGIN`, `ROLLBACK` and SQL text)
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Cursors handed out and not yet dropped
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.get()
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.state
    }

    /// Reports expectations that were never consumed
    pub fn expectations_were_met(&self) -> std::result::Result<(), String> {
        if self.expectations.is_empty() {
            Ok(())
        } else {
            let pending: Vec<String> = self.expectations.iter().map(|e| e.describe()).collect();
            Err(format!("unfulfilled expectations: {}", pending.join(", ")))
        }
    }

    fn next_expectation(&mut self, call: &str) -> Result<Expectation> {
        self.statements.push(call.to_string());
        self.expectations
            .pop_front()
            .ok_or_else(|| DumpError::Query(format!("unexpected call: {}", call)))
    }

    fn unexpected(&mut self, call: &str, expected: Expectation) -> DumpError {
        let err = DumpError::Query(format!(
            "unexpected call: {} (expected {})",
            call,
            expected.describe()
        ));
        self.expectations.push_front(expected);
        err
    }
}

impl Connection for MockConnection {
    fn begin(&mut self) -> Result<()> {
        match self.next_expectation("BEGIN")? {
            Expectation::Begin(None) => {
                if self.state == TransactionState::Transaction {
                    return Err(DumpError::Transaction("Transaction already in progress".to_string()));
                }
                self.state = TransactionState::Transaction;
                Ok(())
            }
            Expectation::Begin(Some(message)) => Err(DumpError::Transaction(message)),
            other => Err(self.unexpected("BEGIN", other)),
        }
    }

    fn rollback(&mut self) -> Result<()> {
        match self.next_expectation("ROLLBACK")? {
            Expectation::Rollback(failure) => {
                if self.state != TransactionState::Transaction {
                    return Err(DumpError::Transaction("No transaction in progress".to_string()));
                }
                self.state = TransactionState::Autocommit;
                match failure {
                    Some(message) => Err(DumpError::Transaction(message)),
                    None => Ok(()),
                }
            }
            other => Err(self.unexpected("ROLLBACK", other)),
        }
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        match self.next_expectation(sql)? {
            Expectation::Execute(re, failure) if re.is_match(sql) => match failure {
                Some(message) => Err(DumpError::query(sql, message)),
                None => Ok(()),
            },
            other => Err(self.unexpected(sql, other)),
        }
    }

    fn query(&mut self, sql: &str) -> Result<Box<dyn RowCursor + '_>> {
        match self.next_expectation(sql)? {
            Expectation::Query(re, reply) if re.is_match(sql) => {
                let rows = reply.map_err(|message| DumpError::query(sql, message))?;
                self.open_cursors.set(self.open_cursors.get() + 1);
                Ok(Box::new(MockCursor {
                    columns: rows.columns,
                    rows: rows.rows.into(),
                    fail_after: rows.fail_after,
                    yielded: 0,
                    sql: sql.to_string(),
                    open_cursors: Rc::clone(&self.open_cursors),
                }))
            }
            other => Err(self.unexpected(sql, other)),
        }
    }
}

struct MockCursor {
    columns: Vec<ColumnDesc>,
    rows: VecDeque<Vec<Value>>,
    fail_after: Option<(usize, String)>,
    yielded: usize,
    sql: String,
    open_cursors: Rc<Cell<usize>>,
}

impl RowCursor for MockCursor {
    fn columns(&self) -> &[ColumnDesc] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        if let Some((limit, message)) = &self.fail_after {
            if self.yielded >= *limit {
                return Err(DumpError::query(&self.sql, message));
            }
        }
        let row = self.rows.pop_front();
        if row.is_some() {
            self.yielded += 1;
        }
        Ok(row)
    }
}

impl Drop for MockCursor {
    fn drop(&mut self) {
        self.open_cursors.set(self.open_cursors.get() - 1);
    }
}
