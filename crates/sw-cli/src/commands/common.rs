//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use sw_db::{ConnectionOptions, ConnectionRegistry, Database, DriverKind, DEFAULT_CONNECTION_NAME};
use sw_migrate::{load_directory, Config, FsSource, MigrationSet, RunReport};

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that open connections are closed before the process ends.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the command has already printed its report.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Turn a run's stopping failure into the command's error
pub(crate) fn report_failure(report: RunReport) -> Result<()> {
    match report.failure {
        Some((name, err)) => Err(anyhow::Error::new(err).context(format!("Migration '{name}' failed"))),
        None => Ok(()),
    }
}

/// A loaded project: its root directory and parsed configuration
pub(crate) struct Project {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
}

impl Project {
    /// Load stepwise.yml from `--config` or the project directory
    pub(crate) fn load(global: &GlobalArgs) -> Result<Self> {
        let root = PathBuf::from(&global.project_dir);
        let config = match &global.config {
            Some(path) => Config::load(Path::new(path)),
            None => Config::load_from_dir(&root),
        }
        .context("Failed to load project configuration")?;
        Ok(Self { root, config })
    }

    pub(crate) fn migrations_dir(&self) -> PathBuf {
        self.config.migrations_dir(&self.root)
    }

    /// Load every migration pair; any diagnostic fails the load
    pub(crate) fn load_migrations(&self) -> Result<MigrationSet> {
        let dir = self.migrations_dir();
        let set = load_directory(&FsSource, &dir)
            .and_then(|report| report.into_set())
            .with_context(|| format!("Failed to load migrations from {}", dir.display()))?;
        log::debug!("Loaded {} migration(s)", set.len());
        Ok(set)
    }

    /// Open the connection selected by `--connection`.
    ///
    /// A name that is not configured falls back to the default connection,
    /// the same way [`ConnectionRegistry::get`] does.
    pub(crate) fn connect(&self, global: &GlobalArgs) -> Result<Session> {
        let name = global
            .connection
            .as_deref()
            .unwrap_or(DEFAULT_CONNECTION_NAME);
        let options = self.config.resolve_connection(name).with_context(|| {
            let known: Vec<&str> = self
                .config
                .connections
                .iter()
                .map(|c| c.connection_name.as_str())
                .collect();
            if known.is_empty() {
                "No connections are configured in stepwise.yml".to_string()
            } else {
                format!(
                    "Unknown connection '{name}' and no '{DEFAULT_CONNECTION_NAME}' connection to fall back to. Configured connections: {}",
                    known.join(", ")
                )
            }
        })?;

        let mut registry = ConnectionRegistry::new();
        registry
            .open(resolve_database_path(options, &self.root))
            .with_context(|| format!("Failed to open connection '{}'", options.connection_name))?;
        Ok(Session {
            registry,
            name: options.connection_name.clone(),
        })
    }
}

/// DuckDB file paths in the config are relative to the project root
pub(crate) fn resolve_database_path(options: &ConnectionOptions, root: &Path) -> ConnectionOptions {
    let mut options = options.clone();
    let is_file = options.driver == DriverKind::DuckDb
        && !options.database.is_empty()
        && options.database != sw_db::duckdb::MEMORY_PATH;
    if is_file && Path::new(&options.database).is_relative() {
        options.database = root.join(&options.database).display().to_string();
    }
    options
}

/// An open connection; closed when dropped
pub(crate) struct Session {
    registry: ConnectionRegistry,
    name: String,
}

impl Session {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn db(&self) -> Result<&dyn Database> {
        self.registry
            .get(Some(&self.name))
            .with_context(|| format!("Connection '{}' is not open", self.name))
    }

    pub(crate) fn check(&self) -> Result<()> {
        self.registry
            .check(Some(&self.name))
            .with_context(|| format!("Connection '{}' is not reachable", self.name))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        for err in self.registry.close_all() {
            log::warn!("Failed to close connection '{}': {err}", self.name);
        }
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
