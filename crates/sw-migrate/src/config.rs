//! Project configuration from stepwise.yml

use crate::error::{MigrateError, MigrateResult};
use crate::ledger::is_valid_table_name;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use sw_db::{ConnectionOptions, DEFAULT_CONNECTION_NAME};

/// File names searched by [`Config::load_from_dir`], in order
pub const CONFIG_FILE_NAMES: [&str; 2] = ["stepwise.yml", "stepwise.yaml"];

/// Main project configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory holding the `.up.sql` / `.down.sql` files, relative to the
    /// project root
    #[serde(default = "default_migrations_path")]
    pub migrations_path: String,

    /// Ledger table, optionally schema-qualified
    #[serde(default = "default_table")]
    pub table: String,

    #[serde(default)]
    pub connections: Vec<ConnectionOptions>,
}

fn default_migrations_path() -> String {
    "migrations".to_string()
}

fn default_table() -> String {
    "migrations".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            migrations_path: default_migrations_path(),
            table: default_table(),
            connections: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> MigrateResult<Self> {
        if !path.exists() {
            return Err(MigrateError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| MigrateError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let config = Self::from_yaml(&content, &path.display().to_string())?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a project directory.
    /// Looks for stepwise.yml or stepwise.yaml
    pub fn load_from_dir(dir: &Path) -> MigrateResult<Self> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
            .map_or_else(
                || {
                    Err(MigrateError::ConfigNotFound {
                        path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
                    })
                },
                |path| Self::load(&path),
            )
    }

    /// Parse and validate YAML text
    pub fn parse(content: &str) -> MigrateResult<Self> {
        Self::from_yaml(content, "<inline>")
    }

    fn from_yaml(content: &str, origin: &str) -> MigrateResult<Self> {
        let mut config: Config =
            serde_yaml::from_str(content).map_err(|e| MigrateError::ConfigParse {
                path: origin.to_string(),
                message: e.to_string(),
            })?;
        for options in &mut config.connections {
            options.assign_defaults();
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> MigrateResult<()> {
        if !is_valid_table_name(&self.table) {
            return Err(MigrateError::ConfigInvalid {
                message: format!(
                    "table '{}' is not a valid identifier (expected [schema.]name)",
                    self.table
                ),
            });
        }

        if self.migrations_path.trim().is_empty() {
            return Err(MigrateError::ConfigInvalid {
                message: "migrations_path cannot be empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for options in &self.connections {
            if !seen.insert(options.connection_name.as_str()) {
                return Err(MigrateError::ConfigInvalid {
                    message: format!(
                        "connection '{}' is defined more than once",
                        options.connection_name
                    ),
                });
            }
        }

        Ok(())
    }

    /// Absolute migrations directory for a project root
    pub fn migrations_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.migrations_path)
    }

    /// Connection options by name
    pub fn connection(&self, name: &str) -> Option<&ConnectionOptions> {
        self.connections
            .iter()
            .find(|options| options.connection_name == name)
    }

    /// Connection options by name, falling back to the default connection
    /// when `name` is not configured
    pub fn resolve_connection(&self, name: &str) -> Option<&ConnectionOptions> {
        self.connection(name).or_else(|| {
            let fallback = self.connection(DEFAULT_CONNECTION_NAME)?;
            log::warn!("Connection '{name}' is not configured, using '{DEFAULT_CONNECTION_NAME}'");
            Some(fallback)
        })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
