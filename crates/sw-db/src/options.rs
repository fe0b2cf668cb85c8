//! Connection options and driver selection

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Connection name used when none is given
pub const DEFAULT_CONNECTION_NAME: &str = "default";

/// Database driver selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// DuckDB (default)
    #[default]
    DuckDb,
    /// MySQL (DSN formatting only)
    MySql,
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverKind::DuckDb => write!(f, "duckdb"),
            DriverKind::MySql => write!(f, "mysql"),
        }
    }
}

impl FromStr for DriverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "duckdb" => Ok(DriverKind::DuckDb),
            "mysql" => Ok(DriverKind::MySql),
            other => Err(format!(
                "unsupported driver '{other}', expected one of: duckdb, mysql"
            )),
        }
    }
}

/// Options used while establishing a database connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionOptions {
    /// Local name of the connection, defaults to [`DEFAULT_CONNECTION_NAME`]
    #[serde(default)]
    pub connection_name: String,

    /// Hostname where the database service can be reached
    #[serde(default)]
    pub hostname: String,

    /// Port the database service listens on
    #[serde(default)]
    pub port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Database (schema) name for servers, file path for DuckDB
    #[serde(default)]
    pub database: String,

    #[serde(default)]
    pub driver: DriverKind,

    /// Extra connection parameters. Appended to the DSN for server
    /// drivers, applied as configuration options for DuckDB.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl ConnectionOptions {
    /// Fill in optional fields that were left unset
    pub fn assign_defaults(&mut self) {
        if self.connection_name.is_empty() {
            self.connection_name = DEFAULT_CONNECTION_NAME.to_string();
        }
    }

    /// Options for a DuckDB database at `path` (`:memory:` or empty for in-memory)
    pub fn duckdb(path: impl Into<String>) -> Self {
        let mut options = Self {
            database: path.into(),
            driver: DriverKind::DuckDb,
            ..Self::default()
        };
        options.assign_defaults();
        options
    }
}
