//! Migration lifecycle engine for Stepwise.
//!
//! Tracks named, reversible schema changes in a ledger table that lives in
//! the target database. Each [`Migration`] drives its own ledger row through
//! apply, rollback, resolve, and validate; [`loader`] builds migrations from
//! paired `<name>.up.sql` / `<name>.down.sql` files and [`Runner`] walks a
//! [`MigrationSet`] in name order.

pub mod config;
pub mod error;
pub mod ledger;
pub mod loader;
pub mod migration;
pub mod normalize;
pub mod runner;
pub mod set;
pub mod step;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{Direction, LoadDiagnostic, MigrateError, MigrateResult, Phase};
pub use ledger::{Ledger, Status};
pub use loader::{load_directory, migration_names_from_filenames, FsSource, LoadReport, MigrationSource};
pub use migration::Migration;
pub use normalize::normalize_query;
pub use runner::{MigrationState, MigrationStatus, RunReport, Runner};
pub use set::MigrationSet;
pub use step::Step;
