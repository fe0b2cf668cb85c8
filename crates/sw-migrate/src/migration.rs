//! The migration entity and its ledger lifecycle.
//!
//! ```text
//! unapplied ──apply──▶ applying ──ok──▶ applied ──rollback──▶ rolling back ──ok──▶ unapplied
//!                          │                                        │
//!                          └──err──▶ failed ◀───────────err─────────┘
//!                                      │
//!                                      └──resolve──▶ unapplied
//! ```
//!
//! "Failed" is not a status value: it is any row whose `error` column is set.
//! None of the operations wrap their statements in a transaction. A failure
//! between the schema statement and the ledger update leaves the ledger
//! visibly out of step with the schema and is reported as
//! [`MigrateError::PartialCompletion`].

use crate::error::{Direction, MigrateError, MigrateResult, Phase};
use crate::ledger::{Ledger, Status};
use crate::loader::{FsSource, MigrationSource};
use crate::normalize::normalize_query;
use crate::step::Step;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use sw_db::{Database, DbError};

/// One named, reversible schema change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Migration {
    /// Ledger-assigned id; only set after an insert or a load from the ledger
    pub id: Option<i64>,
    /// Unique name, also the sort key
    pub name: String,
    /// SQL that moves the schema forward
    pub up: String,
    /// SQL that reverses `up`
    pub down: String,
    /// Last recorded failure
    pub error: Option<String>,
    /// Ledger status; `None` while unapplied
    pub status: Option<Status>,
    pub applied_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Migration {
    /// An unapplied migration
    pub fn new(name: impl Into<String>, up: impl Into<String>, down: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            up: up.into(),
            down: down.into(),
            error: None,
            status: None,
            applied_at: None,
            created_at: None,
        }
    }

    /// Load the migration recorded as `name` in the ledger.
    ///
    /// Fails with [`MigrateError::DoesNotExist`] when there is no such row.
    pub fn from_ledger(name: &str, table: &str, db: &dyn Database) -> MigrateResult<Self> {
        Self::fetch_remote(name, table, db, Phase::Validate)
    }

    /// [`Migration::from_ledger`] with storage errors attributed to `phase`
    pub(crate) fn fetch_remote(
        name: &str,
        table: &str,
        db: &dyn Database,
        phase: Phase,
    ) -> MigrateResult<Self> {
        Ledger::new(db, table)?
            .fetch(name)
            .map_err(|source| MigrateError::Storage {
                phase,
                name: name.to_string(),
                action: "failed to retrieve migration entry",
                source,
            })?
            .ok_or_else(|| MigrateError::DoesNotExist {
                name: name.to_string(),
            })
    }

    /// Read the up and down statements from two files
    pub fn from_files(name: &str, up_path: &Path, down_path: &Path) -> MigrateResult<Self> {
        Self::from_source(&FsSource, name, up_path, down_path)
    }

    /// Read the up and down statements through `source`
    pub fn from_source(
        source: &dyn MigrationSource,
        name: &str,
        up_path: &Path,
        down_path: &Path,
    ) -> MigrateResult<Self> {
        let read = |path: &Path| {
            source
                .read_to_string(path)
                .map_err(|e| MigrateError::Io {
                    path: path.display().to_string(),
                    source: e,
                })
        };
        Ok(Self::new(name, read(up_path)?, read(down_path)?))
    }

    /// Whether the ledger recorded a failure for this migration
    pub fn is_failed(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// Compare against the ledger's copy of this migration.
    ///
    /// A recorded error wins over drift; up is checked before down. Text is
    /// compared after [`normalize_query`].
    pub fn reconcile(&self, remote: &Migration) -> MigrateResult<()> {
        if remote.is_failed() {
            return Err(MigrateError::RecordedFailure {
                name: self.name.clone(),
                error: remote.error.clone().unwrap_or_default(),
            });
        }
        if normalize_query(&self.up) != normalize_query(&remote.up) {
            return Err(MigrateError::Drift {
                name: self.name.clone(),
                direction: Direction::Up,
                local: self.up.clone(),
                remote: remote.up.clone(),
            });
        }
        if normalize_query(&self.down) != normalize_query(&remote.down) {
            return Err(MigrateError::Drift {
                name: self.name.clone(),
                direction: Direction::Down,
                local: self.down.clone(),
                remote: remote.down.clone(),
            });
        }
        Ok(())
    }

    /// Forget everything the ledger told us; the row is gone
    fn clear_ledger_state(&mut self) {
        self.id = None;
        self.error = None;
        self.status = None;
        self.applied_at = None;
        self.created_at = None;
    }

    fn storage(&self, phase: Phase, action: &'static str, source: DbError) -> MigrateError {
        MigrateError::Storage {
            phase,
            name: self.name.clone(),
            action,
            source,
        }
    }

    /// Turn a failed up/down statement into an error, keeping the recording
    /// failure (if any) alongside the original one
    fn statement_failed(
        &mut self,
        phase: Phase,
        source: DbError,
        record: impl FnOnce(&str) -> Result<usize, DbError>,
    ) -> MigrateError {
        let message = source.to_string();
        let recording = record(&message).err();
        if let Some(e) = &recording {
            log::warn!("[{phase}:{}] failed to record error on ledger row: {e}", self.name);
        }
        self.error = Some(message);
        MigrateError::StatementFailed {
            phase,
            name: self.name.clone(),
            source,
            recording,
        }
    }
}

impl Step for Migration {
    fn apply(&mut self, table: &str, db: &dyn Database) -> MigrateResult<()> {
        let ledger = Ledger::new(db, table)?;

        let exists = ledger.exists(&self.name).map_err(|e| {
            self.storage(
                Phase::Apply,
                "failed to check if migration has already been applied",
                e,
            )
        })?;
        if exists {
            return Err(MigrateError::AlreadyApplied {
                name: self.name.clone(),
            });
        }

        let id = ledger
            .insert(&self.name, &self.up, &self.down)
            .map_err(|e| {
                self.storage(
                    Phase::Apply,
                    "failed to insert migration entry into migration table",
                    e,
                )
            })?;
        self.id = Some(id);
        self.status = Some(Status::Applying);
        log::debug!("[apply:{}] running up statement (ledger id {id})", self.name);

        if let Err(e) = db.execute_batch(&self.up) {
            return Err(self.statement_failed(Phase::Apply, e, |message| {
                ledger.record_error_by_id(id, message)
            }));
        }

        ledger
            .mark_applied(id)
            .map_err(|source| MigrateError::PartialCompletion {
                phase: Phase::Apply,
                name: self.name.clone(),
                source,
            })?;
        self.status = Some(Status::Applied);
        log::info!("Applied migration {}", self.name);
        Ok(())
    }

    fn rollback(&mut self, table: &str, db: &dyn Database) -> MigrateResult<()> {
        let ledger = Ledger::new(db, table)?;

        // Scoped to this migration's row; other rows keep their status.
        let marked = ledger.mark_rolling_back(&self.name).map_err(|e| {
            self.storage(
                Phase::Rollback,
                "failed to update status for rollback migration",
                e,
            )
        })?;
        if marked > 0 {
            self.status = Some(Status::RollingBack);
        }
        log::debug!("[rollback:{}] running down statement", self.name);

        if let Err(e) = db.execute_batch(&self.down) {
            let name = self.name.clone();
            return Err(self.statement_failed(Phase::Rollback, e, |message| {
                ledger.record_error_by_name(&name, message)
            }));
        }

        ledger
            .delete(&self.name)
            .map_err(|source| MigrateError::PartialCompletion {
                phase: Phase::Rollback,
                name: self.name.clone(),
                source,
            })?;
        self.clear_ledger_state();
        log::info!("Rolled back migration {}", self.name);
        Ok(())
    }

    fn resolve(&mut self, table: &str, db: &dyn Database) -> MigrateResult<()> {
        let ledger = Ledger::new(db, table)?;
        let removed = ledger.delete(&self.name).map_err(|e| {
            self.storage(Phase::Resolve, "failed to resolve migration error", e)
        })?;
        self.clear_ledger_state();
        log::info!("Resolved migration {} ({removed} ledger row(s) removed)", self.name);
        Ok(())
    }

    fn validate(&self, table: &str, db: &dyn Database) -> MigrateResult<()> {
        let remote = Migration::from_ledger(&self.name, table, db)?;
        self.reconcile(&remote)
    }
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
