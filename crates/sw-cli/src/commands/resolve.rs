//! Resolve command implementation - clears a ledger row

use anyhow::{Context, Result};
use sw_migrate::{MigrationSet, Runner};

use crate::cli::{GlobalArgs, ResolveArgs};
use crate::commands::common::Project;

/// Execute the resolve command
///
/// Local files are optional here: a row whose files were deleted can still
/// be resolved from the ledger copy.
pub(crate) fn execute(args: &ResolveArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let mut set = match project.load_migrations() {
        Ok(set) => set,
        Err(err) => {
            log::warn!("Resolving without local migrations: {err:#}");
            MigrationSet::default()
        }
    };
    let session = project.connect(global)?;
    let runner = Runner::new(session.db()?, &project.config.table)?;

    runner
        .resolve(&mut set, &args.name)
        .with_context(|| format!("Failed to resolve '{}'", args.name))?;
    println!("Resolved {}", args.name);
    Ok(())
}
