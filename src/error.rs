//! Error types for querykit.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Connection and statement failures are always surfaced as `Err` values so callers
//! cannot silently proceed on a failed connection or a failed statement.

use crate::models::DatabaseType;
use std::time::Duration;
use thiserror::Error;

/// Coarse reason a connection attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Host unreachable, refused, TLS or I/O failure.
    Network,
    /// Credentials rejected by the server.
    Authentication,
    /// Bad connection parameters (unknown database, invalid options).
    Configuration,
    Other,
}

impl std::fmt::Display for ConnectionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Authentication => write!(f, "authentication"),
            Self::Configuration => write!(f, "configuration"),
            Self::Other => write!(f, "other"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed ({kind}): {message}")]
    Connection {
        kind: ConnectionErrorKind,
        message: String,
        suggestion: String,
    },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42S02" for an unknown table on MySQL
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Timeout: {operation} exceeded {limit_ms}ms")]
    Timeout { operation: String, limit_ms: u64 },

    #[error("Connection '{alias}' is not connected")]
    NotConnected { alias: String },

    #[error("Connection has been closed")]
    ConnectionClosed,

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Row index {index} out of range (rows: {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(
        kind: ConnectionErrorKind,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Connection {
            kind,
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, limit: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            limit_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn not_connected(alias: impl Into<String>) -> Self {
        Self::NotConnected {
            alias: alias.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classify an error raised while opening a connection.
    ///
    /// Every driver failure at this stage becomes a `Connection` error whose kind
    /// tells network trouble apart from rejected credentials and bad parameters.
    pub fn connect_failed(db_type: DatabaseType, err: &sqlx::Error) -> Self {
        let kind = classify_connect_error(err);
        Self::connection(
            kind,
            format!("Failed to connect: {}", err),
            connection_suggestion(db_type, kind, err),
        )
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::NotConnected { .. } => Some("Call connect() and check its result first"),
            _ => None,
        }
    }

    /// Connection failure kind, if this is a connection error.
    pub fn connection_kind(&self) -> Option<ConnectionErrorKind> {
        match self {
            Self::Connection { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection {
                kind: ConnectionErrorKind::Network,
                ..
            } | Self::Timeout { .. }
        )
    }
}

fn classify_connect_error(err: &sqlx::Error) -> ConnectionErrorKind {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_) => {
            ConnectionErrorKind::Network
        }
        sqlx::Error::Configuration(_) => ConnectionErrorKind::Configuration,
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            let message = db_err.message().to_lowercase();
            // 28000 / 28P01: invalid authorization; 1045 shows up as "access denied"
            if code.starts_with("28")
                || message.contains("access denied")
                || message.contains("password authentication")
            {
                ConnectionErrorKind::Authentication
            } else if code == "3D000"
                || code == "42000"
                || message.contains("unknown database")
                || message.contains("does not exist")
                || message.contains("unable to open database")
            {
                ConnectionErrorKind::Configuration
            } else {
                ConnectionErrorKind::Other
            }
        }
        _ => ConnectionErrorKind::Other,
    }
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(
    db_type: DatabaseType,
    kind: ConnectionErrorKind,
    error: &sqlx::Error,
) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return format!(
            "Check that the {} server is running and accessible",
            db_type
        );
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    match kind {
        ConnectionErrorKind::Authentication => {
            return "Verify the username and password".to_string();
        }
        ConnectionErrorKind::Configuration if db_type != DatabaseType::SQLite => {
            return "Check that the database name exists".to_string();
        }
        _ => {}
    }

    match db_type {
        DatabaseType::PostgreSQL => {
            "Verify host, port and database: pgsql:host=localhost;dbname=db;port=5432".to_string()
        }
        DatabaseType::MySQL => {
            "Verify host, port and database: mysql:host=localhost;dbname=db;port=3306".to_string()
        }
        DatabaseType::SQLite => {
            "Verify the file path exists and is accessible: sqlite:path/to/db.sqlite".to_string()
        }
    }
}

/// Convert sqlx errors raised by statements to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                ConnectionErrorKind::Configuration,
                msg.to_string(),
                "Check the connection parameters",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::Io(io_err) => DbError::connection(
                ConnectionErrorKind::Network,
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                ConnectionErrorKind::Network,
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                ConnectionErrorKind::Network,
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => DbError::database(
                format!("Column not found: {}", col),
                None,
                "Check the selected column names",
            ),
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::internal(format!("JSON encoding failed: {}", err))
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
