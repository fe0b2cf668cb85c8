//! Apply command implementation - runs every pending migration

use anyhow::Result;
use sw_migrate::Runner;

use crate::cli::GlobalArgs;
use crate::commands::common::{report_failure, Project};

/// Execute the apply command
pub(crate) fn execute(global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let mut set = project.load_migrations()?;
    let session = project.connect(global)?;
    let runner = Runner::new(session.db()?, &project.config.table)?;

    let report = runner.apply(&mut set);
    for name in &report.applied {
        println!("  ✓ applied {name}");
    }
    println!(
        "\n{} applied, {} already up to date",
        report.applied.len(),
        report.skipped.len()
    );
    report_failure(report)
}
