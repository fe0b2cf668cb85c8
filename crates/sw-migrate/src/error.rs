//! Error types for the migration engine.

use crate::ledger::Status;
use serde::Serialize;
use sw_db::DbError;
use thiserror::Error;

/// Lifecycle phase an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Apply,
    Rollback,
    Resolve,
    Validate,
    Init,
    Status,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Apply => write!(f, "apply"),
            Phase::Rollback => write!(f, "rollback"),
            Phase::Resolve => write!(f, "resolve"),
            Phase::Validate => write!(f, "validate"),
            Phase::Init => write!(f, "init"),
            Phase::Status => write!(f, "status"),
        }
    }
}

/// Which half of a migration diverged from the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "upward"),
            Direction::Down => write!(f, "downward"),
        }
    }
}

/// A reason a file or pair was rejected while loading a directory
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadDiagnostic {
    #[error("filename {filename} does not end with .{{up, down}}.sql")]
    InvalidSuffix { filename: String },

    #[error("could not find reverse migration for {filename}")]
    MissingReverse { filename: String },

    #[error("failed to read {path}: {message}")]
    Unreadable { path: String, message: String },
}

/// Migration engine errors.
///
/// `AlreadyApplied` and `DoesNotExist` are expected outcomes a runner acts
/// on; the rest need an operator or a code fix.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// A ledger row already exists for this name (M001).
    #[error("[M001] migration '{name}' has already been applied")]
    AlreadyApplied { name: String },

    /// No ledger row exists for this name (M002).
    #[error("[M002] migration '{name}' does not exist")]
    DoesNotExist { name: String },

    /// Local SQL no longer matches the ledger (M003).
    #[error("[M003] [validate:{name}] failed to reconcile {direction} migration query local and remote versions:\n{local}\n--\n{remote}")]
    Drift {
        name: String,
        direction: Direction,
        local: String,
        remote: String,
    },

    /// A previous apply or rollback left an error on the row (M004).
    #[error("[M004] [validate:{name}] migration exists but has been recorded as failed: '{error}'")]
    RecordedFailure { name: String, error: String },

    /// A ledger statement failed (M005).
    #[error("[M005] [{phase}:{name}] {action}: {source}")]
    Storage {
        phase: Phase,
        name: String,
        action: &'static str,
        #[source]
        source: DbError,
    },

    /// The migration's own up or down statement failed (M006).
    ///
    /// `recording` holds the error from trying to store the failure on the
    /// ledger row, when that also failed.
    #[error("[M006] [{phase}:{name}] failed to {phase} migration: {source}{}", recording_suffix(.recording))]
    StatementFailed {
        phase: Phase,
        name: String,
        #[source]
        source: DbError,
        recording: Option<DbError>,
    },

    /// The schema change ran but the ledger was not updated to match (M007).
    #[error("[M007] [{phase}:{name}] schema statement succeeded but the ledger was not updated, manual repair needed: {source}")]
    PartialCompletion {
        phase: Phase,
        name: String,
        #[source]
        source: DbError,
    },

    /// Ledger table names are interpolated into SQL and must be identifiers (M008).
    #[error("[M008] invalid ledger table name '{0}': expected [schema.]identifier")]
    InvalidTableName(String),

    /// Directory loading produced diagnostics (M009).
    #[error("[M009] following errors/warnings happened while loading {path}:{}", format_diagnostics(.diagnostics))]
    Load {
        path: String,
        diagnostics: Vec<LoadDiagnostic>,
    },

    /// Filesystem error with the path that caused it (M010).
    #[error("[M010] IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file not found (M011).
    #[error("[M011] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration file could not be parsed (M012).
    #[error("[M012] Failed to parse config {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Configuration is syntactically valid but unusable (M013).
    #[error("[M013] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// The ledger row is consistent with the local files but stuck mid-step,
    /// e.g. the schema statement ran and the status update did not (M014).
    #[error("[M014] [{phase}:{name}] ledger row is still '{status}', manual repair needed before continuing")]
    Incomplete {
        phase: Phase,
        name: String,
        status: Status,
    },
}

/// Result type alias for [`MigrateError`].
pub type MigrateResult<T> = Result<T, MigrateError>;

impl MigrateError {
    /// True for the outcomes a runner treats as signals rather than failures
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            MigrateError::AlreadyApplied { .. } | MigrateError::DoesNotExist { .. }
        )
    }
}

fn recording_suffix(recording: &Option<DbError>) -> String {
    match recording {
        Some(e) => format!(" (additionally failed to record the error: {e})"),
        None => String::new(),
    }
}

fn format_diagnostics(diagnostics: &[LoadDiagnostic]) -> String {
    diagnostics.iter().map(|d| format!("\n{d}")).collect()
}
