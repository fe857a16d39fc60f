//! Connection lifecycle for one configured database.
//!
//! A [`ConnectionManager`] holds a [`ConnectionConfig`] and at most one live
//! [`Client`]. Connecting is lazy and explicit: nothing is opened until
//! [`ConnectionManager::connect`] runs.

use crate::db::client::Client;
use crate::db::query::Query;
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionConfig, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

pub struct ConnectionManager {
    alias: String,
    config: ConnectionConfig,
    client: Mutex<Option<Arc<Client>>>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("alias", &self.alias)
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl ConnectionManager {
    /// Create a manager whose alias is the database name.
    pub fn new(config: ConnectionConfig) -> Self {
        let alias = config.database().to_string();
        Self::with_alias(config, alias)
    }

    pub fn with_alias(config: ConnectionConfig, alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            config,
            client: Mutex::new(None),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn database(&self) -> &str {
        self.config.database()
    }

    /// Data source name for the configuration.
    pub fn dsn(&self) -> String {
        self.config.dsn()
    }

    /// Open the connection if none is live.
    ///
    /// On failure the manager stays disconnected and the error is returned.
    pub fn connect(&self) -> DbResult<()> {
        if self.is_connected() {
            debug!(alias = %self.alias, "Already connected");
            return Ok(());
        }

        info!(
            alias = %self.alias,
            db_type = %self.config.driver(),
            dsn = %self.dsn(),
            "Connecting to database"
        );

        let client = Client::open(&self.config).inspect_err(|e| {
            warn!(alias = %self.alias, error = %e, "Connection failed");
        })?;

        // Re-check after the open: another thread may have connected meanwhile
        let duplicate = {
            let mut slot = self.lock();
            if slot.is_some() {
                Some(client)
            } else {
                *slot = Some(Arc::new(client));
                None
            }
        };
        if let Some(client) = duplicate {
            debug!(alias = %self.alias, "Discarding concurrent connection");
            client.close();
            return Ok(());
        }

        info!(alias = %self.alias, "Connected successfully");
        Ok(())
    }

    /// Whether a live connection is held. Never probes the server.
    pub fn is_connected(&self) -> bool {
        self.lock().is_some()
    }

    /// Build a query on the live connection.
    pub fn query(&self, sql: impl Into<String>) -> DbResult<Query> {
        let client = self.client()?;
        Ok(Query::new(client, sql))
    }

    /// Build a query with its named parameters already bound.
    pub fn query_with_params<I, K, V>(&self, sql: impl Into<String>, params: I) -> DbResult<Query>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut query = self.query(sql)?;
        for (name, value) in params {
            query.add_param(name, value);
        }
        Ok(query)
    }

    /// Server version reported by the live connection.
    pub fn server_version(&self) -> DbResult<String> {
        self.client()?.server_version()
    }

    /// Release the connection. Queries still holding it fail with `ConnectionClosed`.
    pub fn close(&self) {
        let Some(client) = self.lock().take() else {
            return;
        };
        client.close();
        info!(alias = %self.alias, "Connection closed");
    }

    fn client(&self) -> DbResult<Arc<Client>> {
        self.lock()
            .clone()
            .ok_or_else(|| DbError::not_connected(&self.alias))
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<Client>>> {
        self.client.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}
