//! New command implementation - scaffolds a migration file pair

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use sw_migrate::loader::{DOWN_SUFFIX, UP_SUFFIX};

use crate::cli::{GlobalArgs, NewArgs};
use crate::commands::common::Project;

/// Execute the new command
pub(crate) fn execute(args: &NewArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let dir = project.migrations_dir();
    let (up, down) = create_pair(&dir, &args.name, Utc::now())?;

    println!("Created {}", up.display());
    println!("Created {}", down.display());
    Ok(())
}

/// `<YYYYMMDDHHMMSS>_<slug>` where the slug is lowercased and every run of
/// characters outside `[a-z0-9_]` becomes a single `_`
pub(crate) fn migration_name(name: &str, now: DateTime<Utc>) -> Result<String> {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        anyhow::bail!("Invalid migration name '{name}': must contain at least one letter or digit");
    }
    Ok(format!("{}_{slug}", now.format("%Y%m%d%H%M%S")))
}

/// Write empty up/down templates, refusing to overwrite existing files
pub(crate) fn create_pair(dir: &Path, name: &str, now: DateTime<Utc>) -> Result<(PathBuf, PathBuf)> {
    let full_name = migration_name(name, now)?;
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let up = dir.join(format!("{full_name}{UP_SUFFIX}"));
    let down = dir.join(format!("{full_name}{DOWN_SUFFIX}"));
    for path in [&up, &down] {
        if path.exists() {
            anyhow::bail!("Migration file already exists: {}", path.display());
        }
    }

    let created = now.format("%Y-%m-%d %H:%M:%S UTC");
    fs::write(&up, format!("-- {full_name} (up)\n-- Created: {created}\n\n"))
        .with_context(|| format!("Failed to write {}", up.display()))?;
    fs::write(&down, format!("-- {full_name} (down)\n-- Reverses the up migration\n\n"))
        .with_context(|| format!("Failed to write {}", down.display()))?;
    log::debug!("Scaffolded migration {full_name}");
    Ok((up, down))
}

#[cfg(test)]
#[path = "new_test.rs"]
mod tests;
