//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{Database, Row, SqlValue};
use duckdb::types::{ToSqlOutput, Value};
use duckdb::{params_from_iter, Config, Connection, ToSql};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Path that selects an in-memory database
pub const MEMORY_PATH: &str = ":memory:";

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::wrap(conn))
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self::wrap(conn))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path.is_empty() || path == MEMORY_PATH {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Open with DuckDB configuration options (e.g. `threads`, `access_mode`)
    pub fn with_options(path: &str, options: &BTreeMap<String, String>) -> DbResult<Self> {
        if options.is_empty() {
            return Self::new(path);
        }
        let mut config = Config::default();
        for (key, value) in options {
            config = config.with(key, value).map_err(|e| {
                DbError::ConnectionError(format!("invalid option '{key}={value}': {e}"))
            })?;
        }
        let conn = if path.is_empty() || path == MEMORY_PATH {
            Connection::open_in_memory_with_flags(config)
        } else {
            Connection::open_with_flags(path, config)
        }
        .map_err(|e| DbError::ConnectionError(format!("{e}: {path}")))?;
        Ok(Self::wrap(conn))
    }

    fn wrap(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Query rows synchronously, decoding every column
    fn query_sync(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Row>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        // column_count() is only valid once the statement has run, so it is
        // read per row instead of from the prepared statement.
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                let col_count = row.as_ref().column_count();
                (0..col_count)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<duckdb::Result<Vec<Value>>>()
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|values| values.into_iter().map(decode_value).collect())
            .collect()
    }

    /// Check if relation exists synchronously
    fn relation_exists_sync(&self, name: &str) -> DbResult<bool> {
        let (schema, table) = match name.rfind('.') {
            Some(pos) => (&name[..pos], &name[pos + 1..]),
            None => ("main", name),
        };

        let rows = self.query_sync(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
            &[SqlValue::from(schema), SqlValue::from(table)],
        )?;
        let count = rows
            .first()
            .and_then(|row| row.first())
            .and_then(SqlValue::as_i64)
            .unwrap_or(0);
        Ok(count > 0)
    }
}

/// Convert a DuckDB value into the backend-neutral representation
fn decode_value(value: Value) -> DbResult<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(v) => SqlValue::Integer(i64::from(v)),
        Value::TinyInt(v) => SqlValue::Integer(i64::from(v)),
        Value::SmallInt(v) => SqlValue::Integer(i64::from(v)),
        Value::Int(v) => SqlValue::Integer(i64::from(v)),
        Value::BigInt(v) => SqlValue::Integer(v),
        Value::UTinyInt(v) => SqlValue::Integer(i64::from(v)),
        Value::USmallInt(v) => SqlValue::Integer(i64::from(v)),
        Value::UInt(v) => SqlValue::Integer(i64::from(v)),
        Value::UBigInt(v) => SqlValue::Integer(
            i64::try_from(v).map_err(|_| DbError::Decode(format!("{v} overflows i64")))?,
        ),
        Value::Text(v) => SqlValue::Text(v),
        other => return Err(DbError::Decode(format!("unsupported DuckDB value {other:?}"))),
    })
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(match self {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(v) => Value::BigInt(*v),
            SqlValue::Text(v) => Value::Text(v.clone()),
        }))
    }
}

impl Database for DuckDbBackend {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        let conn = self.lock()?;
        let affected = conn.execute(sql, params_from_iter(params.iter()))?;
        Ok(affected)
    }

    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Row>> {
        self.query_sync(sql, params)
    }

    fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.relation_exists_sync(name)
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }

    fn close(self: Box<Self>) -> DbResult<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        conn.close()
            .map_err(|(_, e)| DbError::ConnectionError(format!("close failed: {e}")))
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
