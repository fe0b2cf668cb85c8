//! Ledger table manager.
//!
//! The ledger is the table inside the target database that records every
//! migration's name, SQL text, status, and last error. [`Ledger`] owns all
//! SQL that touches it; the table name is validated once on construction
//! because it is interpolated into every statement.

use crate::error::{MigrateError, MigrateResult, Phase};
use crate::migration::Migration;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;
use sw_db::{Database, DbError, DbResult, Row, SqlValue};

/// Ledger row status.
///
/// A missing row means the migration is unapplied; a row with a non-empty
/// error is failed whatever its status says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "&'static str")]
pub enum Status {
    Applying,
    Applied,
    RollingBack,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Applying => "applying",
            Status::Applied => "applied",
            Status::RollingBack => "rolling back",
        }
    }
}

impl From<Status> for &'static str {
    fn from(status: Status) -> Self {
        status.as_str()
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "applying" => Ok(Status::Applying),
            "applied" => Ok(Status::Applied),
            "rolling back" => Ok(Status::RollingBack),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// Columns read back for a full row, in this order.
const SELECT_COLUMNS: &str =
    "id, name, up, down, error, status, epoch_us(applied_at), epoch_us(created_at)";

/// Handle on one ledger table
#[derive(Clone, Copy)]
pub struct Ledger<'a> {
    db: &'a dyn Database,
    table: &'a str,
}

impl<'a> Ledger<'a> {
    /// Address the ledger table `table` on `db`
    pub fn new(db: &'a dyn Database, table: &'a str) -> MigrateResult<Self> {
        if !is_valid_table_name(table) {
            return Err(MigrateError::InvalidTableName(table.to_string()));
        }
        Ok(Self { db, table })
    }

    pub fn table(&self) -> &str {
        self.table
    }

    /// Create the ledger table.
    ///
    /// DuckDB has no auto-increment column type, so ids come from a sequence
    /// named `<table>_id_seq` created alongside the table. Fails if either
    /// already exists.
    pub fn init(&self) -> DbResult<()> {
        let table = self.table;
        log::debug!("Creating ledger table {table}");
        self.db.execute_batch(&format!(
            "CREATE SEQUENCE {table}_id_seq;
             CREATE TABLE {table} (
                 id         BIGINT PRIMARY KEY DEFAULT nextval('{table}_id_seq'),
                 name       VARCHAR(512) UNIQUE NOT NULL,
                 up         TEXT NOT NULL,
                 down       TEXT NOT NULL,
                 error      TEXT,
                 status     VARCHAR(16) NOT NULL,
                 applied_at TIMESTAMP,
                 created_at TIMESTAMP NOT NULL DEFAULT now()
             );"
        ))
    }

    /// Whether the ledger table itself exists
    pub fn is_initialized(&self) -> DbResult<bool> {
        self.db.relation_exists(self.table)
    }

    /// Whether a row exists for `name`
    pub fn exists(&self, name: &str) -> DbResult<bool> {
        let row = self.db.query_row(
            &format!("SELECT 1 FROM {} WHERE name = ?", self.table),
            &[name.into()],
        )?;
        Ok(row.is_some())
    }

    /// Insert a row in `applying` status, returning its id
    pub fn insert(&self, name: &str, up: &str, down: &str) -> DbResult<i64> {
        let row = self.db.query_row(
            &format!(
                "INSERT INTO {} (name, up, down, status) VALUES (?, ?, ?, ?) RETURNING id",
                self.table
            ),
            &[
                name.into(),
                up.into(),
                down.into(),
                Status::Applying.as_str().into(),
            ],
        )?;
        row.and_then(|r| r.first().and_then(SqlValue::as_i64))
            .ok_or_else(|| DbError::Decode(format!("no id returned for inserted row '{name}'")))
    }

    /// Load the row for `name`
    pub fn fetch(&self, name: &str) -> DbResult<Option<Migration>> {
        let row = self.db.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM {} WHERE name = ?", self.table),
            &[name.into()],
        )?;
        row.map(migration_from_row).transpose()
    }

    /// Every row, ordered by name
    pub fn list(&self) -> DbResult<Vec<Migration>> {
        self.db
            .query(
                &format!("SELECT {SELECT_COLUMNS} FROM {} ORDER BY name", self.table),
                &[],
            )?
            .into_iter()
            .map(migration_from_row)
            .collect()
    }

    /// Mark row `id` as applied now
    pub fn mark_applied(&self, id: i64) -> DbResult<usize> {
        self.db.execute(
            &format!(
                "UPDATE {} SET applied_at = now(), status = ? WHERE id = ?",
                self.table
            ),
            &[Status::Applied.as_str().into(), id.into()],
        )
    }

    /// Mark the row for `name` as rolling back
    pub fn mark_rolling_back(&self, name: &str) -> DbResult<usize> {
        self.db.execute(
            &format!("UPDATE {} SET status = ? WHERE name = ?", self.table),
            &[Status::RollingBack.as_str().into(), name.into()],
        )
    }

    pub fn record_error_by_id(&self, id: i64, message: &str) -> DbResult<usize> {
        self.db.execute(
            &format!("UPDATE {} SET error = ? WHERE id = ?", self.table),
            &[message.into(), id.into()],
        )
    }

    pub fn record_error_by_name(&self, name: &str, message: &str) -> DbResult<usize> {
        self.db.execute(
            &format!("UPDATE {} SET error = ? WHERE name = ?", self.table),
            &[message.into(), name.into()],
        )
    }

    /// Delete the row for `name`, returns the number of rows removed
    pub fn delete(&self, name: &str) -> DbResult<usize> {
        self.db.execute(
            &format!("DELETE FROM {} WHERE name = ?", self.table),
            &[name.into()],
        )
    }
}

/// Create the ledger table `table` on `db`
pub fn init(table: &str, db: &dyn Database) -> MigrateResult<()> {
    Ledger::new(db, table)?
        .init()
        .map_err(|source| MigrateError::Storage {
            phase: Phase::Init,
            name: table.to_string(),
            action: "failed to create ledger table",
            source,
        })
}

/// `[schema.]identifier` where each part is ASCII alphanumerics or `_` and
/// does not start with a digit.
pub(crate) fn is_valid_table_name(table: &str) -> bool {
    let parts: Vec<&str> = table.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

fn migration_from_row(row: Row) -> DbResult<Migration> {
    let [id, name, up, down, error, status, applied_at, created_at]: [SqlValue; 8] = row
        .try_into()
        .map_err(|r: Row| DbError::Decode(format!("ledger row has {} columns, expected 8", r.len())))?;

    let name = text(name, "name")?;
    let malformed = |message: String| DbError::Decode(format!("ledger row '{name}': {message}"));

    Ok(Migration {
        id: Some(
            id.as_i64()
                .ok_or_else(|| malformed(format!("id is not an integer: {id:?}")))?,
        ),
        up: text(up, "up")?,
        down: text(down, "down")?,
        error: match error {
            SqlValue::Null => None,
            other => Some(text(other, "error")?),
        },
        status: Some(text(status, "status")?.parse::<Status>().map_err(malformed)?),
        applied_at: timestamp(applied_at, "applied_at")?,
        created_at: timestamp(created_at, "created_at")?,
        name,
    })
}

fn text(value: SqlValue, column: &str) -> DbResult<String> {
    match value {
        SqlValue::Text(s) => Ok(s),
        other => Err(DbError::Decode(format!(
            "ledger column {column} is not text: {other:?}"
        ))),
    }
}

/// Ledger timestamps are read as `epoch_us(...)`
fn timestamp(value: SqlValue, column: &str) -> DbResult<Option<DateTime<Utc>>> {
    match value {
        SqlValue::Null => Ok(None),
        SqlValue::Integer(micros) => DateTime::<Utc>::from_timestamp_micros(micros)
            .map(Some)
            .ok_or_else(|| DbError::Decode(format!("ledger column {column} is out of range"))),
        other => Err(DbError::Decode(format!(
            "ledger column {column} is not a timestamp: {other:?}"
        ))),
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
