//! Data models for querykit.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod result_set;
pub mod row;
pub mod value;

// Re-export commonly used types
pub use connection::{ConnectionConfig, ConnectionConfigBuilder, DatabaseType};
pub use result_set::{ColumnValues, ResultSet};
pub use row::Row;
pub use value::Value;
