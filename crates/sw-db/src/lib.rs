//! sw-db - Database abstraction layer for Stepwise
//!
//! This crate provides the `Database` capability trait consumed by the
//! migration engine, a DuckDB implementation, connection options with
//! driver-specific DSN formatting, and an explicit connection registry.

pub mod duckdb;
pub mod dsn;
pub mod error;
pub mod options;
pub mod registry;
pub mod traits;

pub use duckdb::DuckDbBackend;
pub use dsn::generate_dsn;
pub use error::{DbError, DbResult};
pub use options::{ConnectionOptions, DriverKind, DEFAULT_CONNECTION_NAME};
pub use registry::ConnectionRegistry;
pub use traits::{Database, Row, SqlValue};
