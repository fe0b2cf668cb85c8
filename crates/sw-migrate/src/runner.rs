//! Sequential application of a [`MigrationSet`].
//!
//! The runner never resolves anything on its own: drift and recorded
//! failures stop the run and are handed back for an operator to look at.

use crate::error::{Direction, MigrateError, MigrateResult, Phase};
use crate::ledger::{Ledger, Status};
use crate::migration::Migration;
use crate::set::MigrationSet;
use crate::step::Step;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use sw_db::Database;

/// Outcome of an apply or rollback run
#[derive(Debug, Default)]
pub struct RunReport {
    pub applied: Vec<String>,
    /// Already applied and consistent with the ledger
    pub skipped: Vec<String>,
    pub rolled_back: Vec<String>,
    /// The migration that stopped the run and why
    pub failure: Option<(String, MigrateError)>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// The stopping error, if any
    pub fn into_result(self) -> MigrateResult<Self> {
        match self.failure {
            Some((_, e)) => Err(e),
            None => Ok(self),
        }
    }
}

/// Where one migration stands relative to the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MigrationState {
    /// No ledger row
    Pending,
    Applied { applied_at: Option<DateTime<Utc>> },
    /// Row left in `applying` or `rolling back` without an error
    Incomplete { status: Status },
    Failed { error: String },
    Drifted { direction: Direction },
    /// Ledger row with no local definition
    Orphaned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub name: String,
    #[serde(flatten)]
    pub state: MigrationState,
}

/// Drives migrations against one ledger table
pub struct Runner<'a> {
    db: &'a dyn Database,
    ledger: Ledger<'a>,
}

impl<'a> Runner<'a> {
    pub fn new(db: &'a dyn Database, table: &'a str) -> MigrateResult<Self> {
        Ok(Self {
            db,
            ledger: Ledger::new(db, table)?,
        })
    }

    /// Apply every migration that has no ledger row, in name order.
    ///
    /// Migrations that validate cleanly and are settled as `applied` are
    /// skipped. Anything else stops the run, since later migrations may
    /// depend on the one that failed.
    pub fn apply(&self, set: &mut MigrationSet) -> RunReport {
        let table = self.ledger.table();
        let mut report = RunReport::default();

        for migration in set.iter_mut() {
            let outcome = match self.check_applied(migration, Phase::Apply) {
                Ok(()) => {
                    log::debug!("Skipping {}: already applied", migration.name);
                    report.skipped.push(migration.name.clone());
                    continue;
                }
                Err(MigrateError::DoesNotExist { .. }) => migration.apply(table, self.db),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => report.applied.push(migration.name.clone()),
                Err(e) => {
                    report.failure = Some((migration.name.clone(), e));
                    break;
                }
            }
        }
        report
    }

    /// Roll back up to `steps` applied migrations, newest name first.
    ///
    /// Migrations without a ledger row are passed over; drift, a recorded
    /// failure, or a row stuck mid-step stops the run.
    pub fn rollback(&self, set: &mut MigrationSet, steps: usize) -> RunReport {
        let table = self.ledger.table();
        let mut report = RunReport::default();

        for migration in set.iter_mut().rev() {
            if report.rolled_back.len() >= steps {
                break;
            }
            let outcome = match self.check_applied(migration, Phase::Rollback) {
                Ok(()) => migration.rollback(table, self.db),
                Err(MigrateError::DoesNotExist { .. }) => continue,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => report.rolled_back.push(migration.name.clone()),
                Err(e) => {
                    report.failure = Some((migration.name.clone(), e));
                    break;
                }
            }
        }
        report
    }

    /// Clear the ledger row for `name`.
    ///
    /// Works for rows with no local definition too, so orphans can be
    /// cleaned up.
    pub fn resolve(&self, set: &mut MigrationSet, name: &str) -> MigrateResult<()> {
        let table = self.ledger.table();
        match set.get_mut(name) {
            Some(migration) => migration.resolve(table, self.db),
            None => Migration::fetch_remote(name, table, self.db, Phase::Resolve)?
                .resolve(table, self.db),
        }
    }

    /// Validate `migration` and require its row to be settled as `applied`.
    ///
    /// A row left in `applying` or `rolling back` without an error means a
    /// schema statement ran but the ledger was not updated to match; it is
    /// reported as [`MigrateError::Incomplete`] instead of being treated as
    /// applied.
    fn check_applied(&self, migration: &Migration, phase: Phase) -> MigrateResult<()> {
        let remote =
            Migration::fetch_remote(&migration.name, self.ledger.table(), self.db, phase)?;
        migration.reconcile(&remote)?;
        match remote.status {
            Some(Status::Applied) | None => Ok(()),
            Some(status) => Err(MigrateError::Incomplete {
                phase,
                name: migration.name.clone(),
                status,
            }),
        }
    }

    /// State of every local migration, followed by orphaned ledger rows
    pub fn status(&self, set: &MigrationSet) -> MigrateResult<Vec<MigrationStatus>> {
        let mut remote: BTreeMap<String, Migration> = self
            .ledger
            .list()
            .map_err(|source| MigrateError::Storage {
                phase: Phase::Status,
                name: self.ledger.table().to_string(),
                action: "failed to list migration entries",
                source,
            })?
            .into_iter()
            .map(|m| (m.name.clone(), m))
            .collect();

        let mut statuses: Vec<MigrationStatus> = set
            .iter()
            .map(|local| {
                let state = match remote.remove(&local.name) {
                    None => MigrationState::Pending,
                    Some(row) => state_of(local, &row),
                };
                MigrationStatus {
                    name: local.name.clone(),
                    state,
                }
            })
            .collect();

        statuses.extend(remote.into_keys().map(|name| MigrationStatus {
            name,
            state: MigrationState::Orphaned,
        }));
        Ok(statuses)
    }
}

fn state_of(local: &Migration, row: &Migration) -> MigrationState {
    match local.reconcile(row) {
        Err(MigrateError::RecordedFailure { error, .. }) => MigrationState::Failed { error },
        Err(MigrateError::Drift { direction, .. }) => MigrationState::Drifted { direction },
        _ => match row.status {
            Some(Status::Applied) => MigrationState::Applied {
                applied_at: row.applied_at,
            },
            Some(status) => MigrationState::Incomplete { status },
            None => MigrationState::Pending,
        },
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
