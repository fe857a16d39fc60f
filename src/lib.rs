//! querykit library
//!
//! A blocking convenience layer over sqlx for MySQL, PostgreSQL and SQLite:
//! configured connections with a named registry, `:name` parameter queries and
//! an in-memory result wrapper with JSON export.

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::{Config, DriverOptions};
pub use db::{ConnectionManager, ConnectionRegistry, Query, QueryOutcome};
pub use error::{DbError, DbResult};
pub use models::{ColumnValues, ConnectionConfig, DatabaseType, ResultSet, Row, Value};

/// Library name and version, e.g. `querykit version 0.1.0`.
pub fn version() -> String {
    format!("querykit version {}", env!("CARGO_PKG_VERSION"))
}
