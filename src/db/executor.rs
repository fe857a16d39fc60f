//! Statement execution.
//!
//! This module runs bound statements on a single [`DbConnection`] with support for:
//! - Positional parameter binding
//! - Optional statement timeouts
//! - Row decoding with driver options applied
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific fetch and execute
//! - `postgres`: PostgreSQL-specific fetch and execute
//! - `sqlite`: SQLite-specific fetch and execute
//!
//! Each submodule provides identical functionality adapted to the database's type system.

use crate::config::DriverOptions;
use crate::db::client::DbConnection;
use crate::db::placeholders::BoundStatement;
use crate::db::types::RowToValues;
use crate::error::{DbError, DbResult};
use crate::models::Row;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

/// What a row-less statement did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    /// Generated key of the last inserted row, when the driver reports one.
    pub last_insert_id: Option<i64>,
}

/// Run a row-returning statement and decode every row.
pub(crate) async fn fetch_rows(
    connection: &mut DbConnection,
    statement: &BoundStatement,
    options: &DriverOptions,
) -> DbResult<Vec<Row>> {
    let start = Instant::now();
    let query_timeout = options.query_timeout();

    debug!(
        sql = %statement.sql,
        params = statement.values.len(),
        timeout_secs = ?query_timeout.map(|t| t.as_secs()),
        "Fetching rows"
    );

    let rows = impl_db_dispatch!(connection, {
        MySql(c) => {
            decode_rows(mysql::fetch_rows(c, statement, query_timeout).await?, options)
        },
        Postgres(c) => {
            decode_rows(postgres::fetch_rows(c, statement, query_timeout).await?, options)
        },
        SQLite(c) => {
            decode_rows(sqlite::fetch_rows(c, statement, query_timeout).await?, options)
        },
    });

    debug!(
        rows = rows.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Fetched rows"
    );
    Ok(rows)
}

/// Run a statement that returns no rows.
pub(crate) async fn execute(
    connection: &mut DbConnection,
    statement: &BoundStatement,
    options: &DriverOptions,
) -> DbResult<ExecOutcome> {
    let start = Instant::now();
    let query_timeout = options.query_timeout();

    debug!(
        sql = %statement.sql,
        params = statement.values.len(),
        timeout_secs = ?query_timeout.map(|t| t.as_secs()),
        "Executing statement"
    );

    let outcome = impl_db_dispatch!(connection, {
        MySql(c) => mysql::execute(c, statement, query_timeout).await?,
        Postgres(c) => postgres::execute(c, statement, query_timeout).await?,
        SQLite(c) => sqlite::execute(c, statement, query_timeout).await?,
    });

    debug!(
        rows_affected = outcome.rows_affected,
        last_insert_id = ?outcome.last_insert_id,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Statement executed"
    );
    Ok(outcome)
}

// =============================================================================
// Common Helper Functions
// =============================================================================

fn decode_rows<R: RowToValues>(rows: Vec<R>, options: &DriverOptions) -> Vec<Row> {
    rows.iter().map(|r| r.to_row(options)).collect()
}

/// Await a driver future, bounded by `limit` when one is configured.
async fn with_timeout<T, F>(limit: Option<Duration>, operation: &str, future: F) -> DbResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    let result = match limit {
        Some(limit) => match timeout(limit, future).await {
            Ok(result) => result,
            Err(_) => return Err(timeout_error(operation, limit)),
        },
        None => future.await,
    };
    result.map_err(DbError::from)
}

fn timeout_error(operation: &str, timeout: Duration) -> DbError {
    DbError::timeout(operation, timeout)
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.
// Statements without parameters go through the raw executor so that SQL which
// cannot be prepared (CREATE PROCEDURE, multi-statement scripts) still runs.

mod mysql {
    use super::*;
    use crate::db::params::bind_mysql_param;
    use sqlx::Executor;
    use sqlx::mysql::{MySqlConnection, MySqlRow};

    pub async fn fetch_rows(
        conn: &mut MySqlConnection,
        statement: &BoundStatement,
        query_timeout: Option<Duration>,
    ) -> DbResult<Vec<MySqlRow>> {
        if statement.values.is_empty() {
            return with_timeout(query_timeout, "query", conn.fetch_all(statement.sql.as_str()))
                .await;
        }
        let mut query = sqlx::query(&statement.sql);
        for value in &statement.values {
            query = bind_mysql_param(query, value);
        }
        with_timeout(query_timeout, "query", query.fetch_all(conn)).await
    }

    pub async fn execute(
        conn: &mut MySqlConnection,
        statement: &BoundStatement,
        query_timeout: Option<Duration>,
    ) -> DbResult<ExecOutcome> {
        let result = if statement.values.is_empty() {
            with_timeout(query_timeout, "execute", conn.execute(statement.sql.as_str())).await?
        } else {
            let mut query = sqlx::query(&statement.sql);
            for value in &statement.values {
                query = bind_mysql_param(query, value);
            }
            with_timeout(query_timeout, "execute", query.execute(conn)).await?
        };

        // MySQL reports 0 when the statement generated no key
        let last_insert_id = match result.last_insert_id() {
            0 => None,
            id => i64::try_from(id).ok(),
        };
        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id,
        })
    }
}

mod postgres {
    use super::*;
    use crate::db::params::bind_postgres_param;
    use sqlx::Executor;
    use sqlx::postgres::{PgConnection, PgRow};

    pub async fn fetch_rows(
        conn: &mut PgConnection,
        statement: &BoundStatement,
        query_timeout: Option<Duration>,
    ) -> DbResult<Vec<PgRow>> {
        if statement.values.is_empty() {
            return with_timeout(query_timeout, "query", conn.fetch_all(statement.sql.as_str()))
                .await;
        }
        let mut query = sqlx::query(&statement.sql);
        for value in &statement.values {
            query = bind_postgres_param(query, value);
        }
        with_timeout(query_timeout, "query", query.fetch_all(conn)).await
    }

    pub async fn execute(
        conn: &mut PgConnection,
        statement: &BoundStatement,
        query_timeout: Option<Duration>,
    ) -> DbResult<ExecOutcome> {
        let result = if statement.values.is_empty() {
            with_timeout(query_timeout, "execute", conn.execute(statement.sql.as_str())).await?
        } else {
            let mut query = sqlx::query(&statement.sql);
            for value in &statement.values {
                query = bind_postgres_param(query, value);
            }
            with_timeout(query_timeout, "execute", query.execute(conn)).await?
        };

        // PostgreSQL has no implicit insert id; use RETURNING with fetch instead
        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: None,
        })
    }
}

mod sqlite {
    use super::*;
    use crate::db::params::bind_sqlite_param;
    use sqlx::Executor;
    use sqlx::sqlite::{SqliteConnection, SqliteRow};

    pub async fn fetch_rows(
        conn: &mut SqliteConnection,
        statement: &BoundStatement,
        query_timeout: Option<Duration>,
    ) -> DbResult<Vec<SqliteRow>> {
        if statement.values.is_empty() {
            return with_timeout(query_timeout, "query", conn.fetch_all(statement.sql.as_str()))
                .await;
        }
        let mut query = sqlx::query(&statement.sql);
        for value in &statement.values {
            query = bind_sqlite_param(query, value);
        }
        with_timeout(query_timeout, "query", query.fetch_all(conn)).await
    }

    pub async fn execute(
        conn: &mut SqliteConnection,
        statement: &BoundStatement,
        query_timeout: Option<Duration>,
    ) -> DbResult<ExecOutcome> {
        let result = if statement.values.is_empty() {
            with_timeout(query_timeout, "execute", conn.execute(statement.sql.as_str())).await?
        } else {
            let mut query = sqlx::query(&statement.sql);
            for value in &statement.values {
                query = bind_sqlite_param(query, value);
            }
            with_timeout(query_timeout, "execute", query.execute(conn)).await?
        };

        let rowid = result.last_insert_rowid();
        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: (rowid > 0).then_some(rowid),
        })
    }
}
