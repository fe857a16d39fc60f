//! Live database connections.
//!
//! A [`Client`] owns exactly one sqlx connection (MySqlConnection, PgConnection or
//! SqliteConnection) plus the current-thread tokio runtime that drives it. Every
//! call blocks the caller until the driver returns.
//!
//! Calling into a `Client` from inside another async runtime is unsupported:
//! `Runtime::block_on` panics when nested.

use crate::config::DriverOptions;
use crate::db::executor::{self, ExecOutcome};
use crate::db::placeholders::BoundStatement;
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionConfig, DatabaseType, Row};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::runtime::Runtime;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Database-specific connection (avoids AnyConnection limitations).
#[derive(Debug)]
pub enum DbConnection {
    MySql(MySqlConnection),
    Postgres(PgConnection),
    SQLite(SqliteConnection),
}

impl DbConnection {
    /// Get the database type for this connection.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbConnection::MySql(_) => DatabaseType::MySQL,
            DbConnection::Postgres(_) => DatabaseType::PostgreSQL,
            DbConnection::SQLite(_) => DatabaseType::SQLite,
        }
    }
}

/// One open connection and the runtime that drives it.
pub struct Client {
    db_type: DatabaseType,
    options: DriverOptions,
    connection: Mutex<Option<DbConnection>>,
    runtime: Runtime,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("db_type", &self.db_type)
            .field("options", &self.options)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Open a connection for the given configuration.
    pub fn open(config: &ConnectionConfig) -> DbResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DbError::internal(format!("Failed to start runtime: {}", e)))?;

        let connect_timeout = config.options().connect_timeout();
        let connection = runtime.block_on(async {
            match timeout(connect_timeout, open_connection(config)).await {
                Ok(Ok(connection)) => Ok(connection),
                Ok(Err(e)) => Err(DbError::connect_failed(config.driver(), &e)),
                Err(_) => Err(DbError::timeout("connect", connect_timeout)),
            }
        })?;

        Ok(Self {
            db_type: config.driver(),
            options: config.options().clone(),
            connection: Mutex::new(Some(connection)),
            runtime,
        })
    }

    pub fn db_type(&self) -> DatabaseType {
        self.db_type
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// False once [`Client::close`] has run.
    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Run a row-returning statement and buffer every row.
    pub(crate) fn fetch_rows(&self, statement: &BoundStatement) -> DbResult<Vec<Row>> {
        let mut guard = self.lock();
        let connection = guard.as_mut().ok_or(DbError::ConnectionClosed)?;
        self.runtime
            .block_on(executor::fetch_rows(connection, statement, &self.options))
    }

    /// Run a statement that returns no rows.
    pub(crate) fn execute(&self, statement: &BoundStatement) -> DbResult<ExecOutcome> {
        let mut guard = self.lock();
        let connection = guard.as_mut().ok_or(DbError::ConnectionClosed)?;
        self.runtime
            .block_on(executor::execute(connection, statement, &self.options))
    }

    /// Get the server version from the connected database.
    pub fn server_version(&self) -> DbResult<String> {
        let mut guard = self.lock();
        let connection = guard.as_mut().ok_or(DbError::ConnectionClosed)?;
        let version = impl_db_dispatch!(connection, {
            MySql(c) => self.runtime.block_on(
                sqlx::query_scalar::<_, String>("SELECT version()").fetch_one(&mut *c),
            ),
            Postgres(c) => self.runtime.block_on(
                sqlx::query_scalar::<_, String>("SELECT version()").fetch_one(&mut *c),
            ),
            SQLite(c) => self.runtime.block_on(
                sqlx::query_scalar::<_, String>("SELECT sqlite_version()").fetch_one(&mut *c),
            ),
        })?;
        debug!(version = %version, "Got server version");
        Ok(version)
    }

    /// Close the connection. Later statements fail with `ConnectionClosed`.
    pub fn close(&self) {
        let Some(connection) = self.lock().take() else {
            return;
        };

        let result = impl_db_dispatch!(connection, {
            MySql(c) => self.runtime.block_on(c.close()),
            Postgres(c) => self.runtime.block_on(c.close()),
            SQLite(c) => self.runtime.block_on(c.close()),
        });
        if let Err(e) = result {
            warn!(error = %e, "Error while closing connection");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<DbConnection>> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}

/// Open the driver-specific connection for a configuration.
async fn open_connection(config: &ConnectionConfig) -> Result<DbConnection, sqlx::Error> {
    match config.driver() {
        DatabaseType::MySQL => {
            let mut options = MySqlConnectOptions::new()
                .host(config.server_name())
                .database(config.database());
            if let Some(port) = config.port() {
                options = options.port(port);
            }
            if let Some(username) = config.username() {
                options = options.username(username);
            }
            if let Some(password) = config.password() {
                options = options.password(password);
            }
            if let Some(charset) = config.charset() {
                options = options.charset(charset);
            }
            Ok(DbConnection::MySql(options.connect().await?))
        }
        DatabaseType::PostgreSQL => {
            let mut options = PgConnectOptions::new()
                .host(config.server_name())
                .database(config.database());
            if let Some(port) = config.port() {
                options = options.port(port);
            }
            if let Some(username) = config.username() {
                options = options.username(username);
            }
            if let Some(password) = config.password() {
                options = options.password(password);
            }
            Ok(DbConnection::Postgres(options.connect().await?))
        }
        DatabaseType::SQLite => {
            let options = SqliteConnectOptions::new()
                .filename(config.database())
                .create_if_missing(config.options().create_if_missing);
            Ok(DbConnection::SQLite(options.connect().await?))
        }
    }
}
