//! Rollback command implementation - reverses the newest migrations

use anyhow::Result;
use sw_migrate::Runner;

use crate::cli::{GlobalArgs, RollbackArgs};
use crate::commands::common::{report_failure, Project};

/// Execute the rollback command
pub(crate) fn execute(args: &RollbackArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let mut set = project.load_migrations()?;
    let session = project.connect(global)?;
    let runner = Runner::new(session.db()?, &project.config.table)?;

    let report = runner.rollback(&mut set, args.steps);
    for name in &report.rolled_back {
        println!("  ✓ rolled back {name}");
    }
    if report.rolled_back.is_empty() && report.is_success() {
        println!("Nothing to roll back");
    }
    report_failure(report)
}
