//! Check command implementation - verifies the selected connection

use anyhow::Result;

use crate::cli::GlobalArgs;
use crate::commands::common::Project;

/// Execute the check command
pub(crate) fn execute(global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let session = project.connect(global)?;
    session.check()?;

    let db = session.db()?;
    println!("✓ Connection '{}' ({}) is reachable", session.name(), db.db_type());

    let table = &project.config.table;
    if db.relation_exists(table)? {
        println!("✓ Ledger table '{table}' exists");
    } else {
        println!("✗ Ledger table '{table}' is missing, run `sw init`");
    }
    Ok(())
}
