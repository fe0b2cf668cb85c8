//! Test doubles shared by the unit tests.

use std::sync::Mutex;
use sw_db::{Database, DbError, DbResult, DuckDbBackend, Row, SqlValue};

/// In-memory DuckDB that fails any statement containing one of `fail_on`.
///
/// Lets tests break a single ledger update (`"SET applied_at"`,
/// `"DELETE FROM"`, `"SET error"`) while every other statement runs for real.
pub(crate) struct FailingDb {
    inner: DuckDbBackend,
    fail_on: Vec<&'static str>,
    /// Every batch handed to `execute_batch`, failed or not
    pub batches: Mutex<Vec<String>>,
}

impl FailingDb {
    pub fn wrap(inner: DuckDbBackend) -> Self {
        Self {
            inner,
            fail_on: Vec::new(),
            batches: Mutex::default(),
        }
    }

    pub fn fail_on(mut self, fragment: &'static str) -> Self {
        self.fail_on.push(fragment);
        self
    }

    /// Let every statement through from now on
    pub fn heal(&mut self) {
        self.fail_on.clear();
    }

    pub fn ran(&self, sql: &str) -> usize {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.as_str() == sql)
            .count()
    }

    fn check(&self, sql: &str) -> DbResult<()> {
        match self.fail_on.iter().find(|f| sql.contains(**f)) {
            Some(fragment) => Err(DbError::ExecutionError(format!(
                "injected failure on '{fragment}'"
            ))),
            None => Ok(()),
        }
    }
}

impl Database for FailingDb {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        self.check(sql)?;
        self.inner.execute(sql, params)
    }

    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.batches.lock().unwrap().push(sql.to_string());
        self.check(sql)?;
        self.inner.execute_batch(sql)
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Row>> {
        self.check(sql)?;
        self.inner.query(sql, params)
    }

    fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.inner.relation_exists(name)
    }

    fn db_type(&self) -> &'static str {
        "failing-duckdb"
    }

    fn close(self: Box<Self>) -> DbResult<()> {
        Box::new(self.inner).close()
    }
}
