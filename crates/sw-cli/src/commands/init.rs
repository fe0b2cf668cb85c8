//! Init command implementation - creates the ledger table

use anyhow::{Context, Result};

use crate::cli::GlobalArgs;
use crate::commands::common::Project;

/// Execute the init command
pub(crate) fn execute(global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let session = project.connect(global)?;
    let table = &project.config.table;

    sw_migrate::ledger::init(table, session.db()?)
        .with_context(|| format!("Failed to initialize ledger on '{}'", session.name()))?;
    println!("Created ledger table '{table}' on '{}'", session.name());
    Ok(())
}
