//! Database trait definition

use crate::error::DbResult;

/// A bindable parameter or a decoded column value.
///
/// Covers what the ledger stores: integers, text, and NULLs. Backends
/// convert to and from their native types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Text(String),
}

/// One result row, columns in `SELECT` order.
pub type Row = Vec<SqlValue>;

impl SqlValue {
    /// Integer payload, or `None` for NULL and text values
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Text payload, or `None` for NULL and integer values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// Database abstraction trait for Stepwise
///
/// This is the whole surface the migration engine needs from a store:
/// parameterized execution, single- and multi-row queries, and batch
/// execution for migration payloads. Placeholders are positional `?`.
///
/// Implementations must be Send + Sync so a registry can hand them out
/// across threads; the engine itself only ever uses one at a time.
pub trait Database: Send + Sync {
    /// Execute a single parameterized statement, returns affected rows
    fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize>;

    /// Execute one or more statements without parameters
    fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run a query and collect every row
    fn query(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Row>>;

    /// Run a query and return its first row, `None` when it yields nothing
    fn query_row(&self, sql: &str, params: &[SqlValue]) -> DbResult<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    /// Check if a table or view exists
    fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Verify the connection is usable
    fn ping(&self) -> DbResult<()> {
        self.query("SELECT 1", &[]).map(|_| ())
    }

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;

    /// Close the underlying connection, surfacing any error the driver reports
    fn close(self: Box<Self>) -> DbResult<()>;
}
