//! Database access layer.
//!
//! This module provides database access functionality:
//! - Connection lifecycle and the named registry
//! - Named-parameter queries
//! - Statement execution and type mappings
//! - Database dispatch macros for reducing code duplication

#[macro_use]
mod macros;

pub mod client;
pub mod executor;
pub mod manager;
mod params;
pub mod placeholders;
pub mod query;
pub mod registry;
pub mod types;

pub use client::{Client, DbConnection};
pub use executor::ExecOutcome;
pub use manager::ConnectionManager;
pub use placeholders::{BoundStatement, bind_named};
pub use query::{Query, QueryOutcome};
pub use registry::ConnectionRegistry;
