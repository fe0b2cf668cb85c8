//! Validate command implementation - compares local files with the ledger

use anyhow::Result;
use sw_migrate::{MigrateError, Step};

use crate::cli::GlobalArgs;
use crate::commands::common::{ExitCode, Project};

/// Execute the validate command
pub(crate) fn execute(global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let set = project.load_migrations()?;
    let session = project.connect(global)?;
    let db = session.db()?;
    let table = &project.config.table;

    let mut problems = 0;
    for migration in &set {
        match migration.validate(table, db) {
            Ok(()) => println!("  ✓ {}", migration.name),
            Err(MigrateError::DoesNotExist { .. }) => println!("  - {} (pending)", migration.name),
            Err(err) => {
                problems += 1;
                println!("  ✗ {}", migration.name);
                eprintln!("{err}");
            }
        }
    }

    if problems > 0 {
        println!("\n{problems} migration(s) failed validation");
        return Err(ExitCode(1).into());
    }
    println!("\nAll {} migration(s) valid", set.len());
    Ok(())
}
