//! Statement execution against a live connection.

use crate::db::client::Client;
use crate::db::executor::ExecOutcome;
use crate::db::placeholders::{BoundStatement, bind_named};
use crate::error::DbResult;
use crate::models::{ResultSet, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Outcome of the most recent `fetch` or `execute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryOutcome {
    pub success: bool,
    pub affected_rows: u64,
    pub last_insert_id: Option<i64>,
}

/// A statement with named parameters, bound to a live connection.
///
/// Built by [`ConnectionManager::query`](crate::db::ConnectionManager::query).
/// The outcome is reset at the start of every call and filled in once the
/// driver returns.
#[derive(Debug)]
pub struct Query {
    client: Arc<Client>,
    sql: String,
    params: Vec<(String, Value)>,
    outcome: QueryOutcome,
}

impl Query {
    pub(crate) fn new(client: Arc<Client>, sql: impl Into<String>) -> Self {
        Self {
            client,
            sql: sql.into(),
            params: Vec::new(),
            outcome: QueryOutcome::default(),
        }
    }

    /// Bind a named parameter, replacing any earlier value for the same name.
    /// A leading `:` on the name is optional.
    pub fn bind(mut self, name: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.add_param(name, value);
        self
    }

    /// In-place variant of [`Query::bind`].
    pub fn add_param(&mut self, name: impl AsRef<str>, value: impl Into<Value>) -> &mut Self {
        let name = name.as_ref().trim_start_matches(':');
        let value = value.into();
        match self.params.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.params.push((name.to_string(), value)),
        }
        self
    }

    /// Run the statement and buffer every returned row.
    pub fn fetch(&mut self) -> DbResult<ResultSet> {
        self.outcome = QueryOutcome::default();
        let start = Instant::now();

        let rows = self
            .bind_statement()
            .and_then(|statement| self.client.fetch_rows(&statement))
            .inspect_err(|e| warn!(sql = %self.sql, error = %e, "Query failed"))?;

        self.outcome.success = true;
        debug!(
            sql = %self.sql,
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Query fetched"
        );
        Ok(ResultSet::new(rows))
    }

    /// Run a statement that returns no rows; returns the affected row count.
    pub fn execute(&mut self) -> DbResult<u64> {
        self.outcome = QueryOutcome::default();
        let start = Instant::now();

        let ExecOutcome {
            rows_affected,
            last_insert_id,
        } = self
            .bind_statement()
            .and_then(|statement| self.client.execute(&statement))
            .inspect_err(|e| warn!(sql = %self.sql, error = %e, "Statement failed"))?;

        self.outcome = QueryOutcome {
            success: true,
            affected_rows: rows_affected,
            last_insert_id,
        };
        debug!(
            sql = %self.sql,
            rows_affected,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Statement executed"
        );
        Ok(rows_affected)
    }

    fn bind_statement(&self) -> DbResult<BoundStatement> {
        bind_named(&self.sql, self.client.db_type(), &self.params)
    }

    /// Rows changed by the last successful `execute`; 0 otherwise.
    pub fn affected_rows(&self) -> u64 {
        self.outcome.affected_rows
    }

    /// Whether the last `fetch` or `execute` succeeded.
    pub fn succeeded(&self) -> bool {
        self.outcome.success
    }

    pub fn last_insert_id(&self) -> Option<i64> {
        self.outcome.last_insert_id
    }

    pub fn outcome(&self) -> QueryOutcome {
        self.outcome
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[(String, Value)] {
        &self.params
    }
}
