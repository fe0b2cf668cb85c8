//! Named database connections.
//!
//! [`ConnectionRegistry`] is an explicit object owned by the caller; there is
//! no process-wide connection state. Lookups for an unknown name fall back to
//! the connection registered as [`DEFAULT_CONNECTION_NAME`].

use crate::duckdb::DuckDbBackend;
use crate::dsn::generate_dsn;
use crate::error::{DbError, DbResult};
use crate::options::{ConnectionOptions, DriverKind, DEFAULT_CONNECTION_NAME};
use crate::traits::Database;
use std::collections::BTreeMap;

/// Registry of open connections keyed by connection name
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: BTreeMap<String, Box<dyn Database>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a connection described by `options` and register it.
    ///
    /// An existing connection with the same name is closed and replaced.
    pub fn open(&mut self, mut options: ConnectionOptions) -> DbResult<()> {
        options.assign_defaults();
        let db: Box<dyn Database> = match options.driver {
            DriverKind::DuckDb => Box::new(DuckDbBackend::with_options(
                &generate_dsn(&options),
                &options.params,
            )?),
            DriverKind::MySql => {
                return Err(DbError::NotImplemented {
                    backend: options.driver.to_string(),
                    feature: "opening connections".to_string(),
                })
            }
        };
        log::debug!(
            "Opened {} connection '{}'",
            db.db_type(),
            options.connection_name
        );
        if let Some(previous) = self.connections.insert(options.connection_name.clone(), db) {
            if let Err(e) = previous.close() {
                log::warn!(
                    "Failed to close replaced connection '{}': {e}",
                    options.connection_name
                );
            }
        }
        Ok(())
    }

    /// Register an existing connection under `name`.
    ///
    /// Fails if another connection with the same name already exists.
    pub fn import(&mut self, name: &str, db: Box<dyn Database>) -> DbResult<()> {
        if self.connections.contains_key(name) {
            return Err(DbError::ConnectionExists(name.to_string()));
        }
        self.connections.insert(name.to_string(), db);
        Ok(())
    }

    /// Connection registered as `name`, else the default connection
    pub fn get(&self, name: Option<&str>) -> Option<&dyn Database> {
        let name = name.unwrap_or(DEFAULT_CONNECTION_NAME);
        self.connections
            .get(name)
            .or_else(|| self.connections.get(DEFAULT_CONNECTION_NAME))
            .map(|db| &**db)
    }

    /// Verify that the named (or default) connection is usable
    pub fn check(&self, name: Option<&str>) -> DbResult<()> {
        let db = self.get(name).ok_or_else(|| {
            DbError::UnknownConnection(name.unwrap_or(DEFAULT_CONNECTION_NAME).to_string())
        })?;
        db.ping()
    }

    /// Names of all registered connections, sorted
    pub fn names(&self) -> Vec<&str> {
        self.connections.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Close every connection, returning the errors of those that failed.
    ///
    /// The registry is empty afterwards either way.
    pub fn close_all(&mut self) -> Vec<DbError> {
        let mut errors = Vec::new();
        for (name, db) in std::mem::take(&mut self.connections) {
            if let Err(e) = db.close() {
                errors.push(DbError::ConnectionError(format!(
                    "error while closing connection '{name}': {e}"
                )));
            }
        }
        errors
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
