//! The operation set every migration exposes to a runner.

use crate::error::MigrateResult;
use sw_db::Database;

/// Lifecycle operations against a ledger table.
///
/// Each takes the ledger table name and a live connection. Storage engines
/// plug in behind [`Database`], so the same step works against any backend.
pub trait Step {
    /// Record and run the up statement. Fails with `AlreadyApplied` when a
    /// ledger row for this name exists.
    fn apply(&mut self, table: &str, db: &dyn Database) -> MigrateResult<()>;

    /// Run the down statement and delete the ledger row.
    fn rollback(&mut self, table: &str, db: &dyn Database) -> MigrateResult<()>;

    /// Delete the ledger row whatever its state, clearing a failure.
    fn resolve(&mut self, table: &str, db: &dyn Database) -> MigrateResult<()>;

    /// Compare against the ledger. `DoesNotExist` means safe to apply.
    fn validate(&self, table: &str, db: &dyn Database) -> MigrateResult<()>;
}
