//! Status command implementation - shows ledger state per migration

use anyhow::{Context, Result};
use sw_migrate::{MigrationState, MigrationStatus, Runner};

use crate::cli::{GlobalArgs, StatusArgs, StatusOutput};
use crate::commands::common::Project;

/// Execute the status command
pub(crate) fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let set = project.load_migrations()?;
    let session = project.connect(global)?;
    let runner = Runner::new(session.db()?, &project.config.table)?;
    let statuses = runner.status(&set)?;

    match args.output {
        StatusOutput::Json => {
            let json = serde_json::to_string_pretty(&statuses)
                .context("Failed to serialize migration status")?;
            println!("{json}");
        }
        StatusOutput::Table => print!("{}", format_table(&statuses)),
    }
    Ok(())
}

fn describe(state: &MigrationState) -> String {
    match state {
        MigrationState::Pending => "pending".to_string(),
        MigrationState::Applied { applied_at: Some(at) } => {
            format!("applied {}", at.format("%Y-%m-%d %H:%M:%S"))
        }
        MigrationState::Applied { applied_at: None } => "applied".to_string(),
        MigrationState::Incomplete { status } => format!("incomplete ({status})"),
        MigrationState::Failed { error } => {
            format!("failed: {}", error.lines().next().unwrap_or_default())
        }
        MigrationState::Drifted { direction } => format!("drifted ({direction} query changed)"),
        MigrationState::Orphaned => "orphaned (no local files)".to_string(),
    }
}

pub(crate) fn format_table(statuses: &[MigrationStatus]) -> String {
    if statuses.is_empty() {
        return "No migrations found\n".to_string();
    }
    let width = statuses
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0)
        .max("MIGRATION".len());

    let mut out = format!("{:<width$}  STATE\n", "MIGRATION");
    for status in statuses {
        out.push_str(&format!("{:<width$}  {}\n", status.name, describe(&status.state)));
    }
    out
}

#[cfg(test)]
#[path = "status_test.rs"]
mod tests;
