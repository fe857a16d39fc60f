//! Named connection registry.
//!
//! Maps aliases to shared [`ConnectionManager`]s. The first registration for an
//! alias wins; later attempts leave the existing entry in place.

use crate::db::manager::ConnectionManager;
use crate::models::ConnectionConfig;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    managers: RwLock<HashMap<String, Arc<ConnectionManager>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a manager for `config` and register it unless the alias is taken.
    ///
    /// The alias defaults to the database name. The freshly built manager is
    /// returned either way; use [`ConnectionRegistry::get`] to reach the
    /// registered one.
    pub fn configure(
        &self,
        config: ConnectionConfig,
        alias: Option<&str>,
    ) -> Arc<ConnectionManager> {
        let manager = Arc::new(match alias {
            Some(alias) => ConnectionManager::with_alias(config, alias),
            None => ConnectionManager::new(config),
        });
        self.register(manager.clone());
        manager
    }

    /// Register a manager under its alias. Returns false if the alias was taken.
    pub fn register(&self, manager: Arc<ConnectionManager>) -> bool {
        let mut managers = self.write();
        if managers.contains_key(manager.alias()) {
            debug!(alias = %manager.alias(), "Alias already registered, keeping existing entry");
            return false;
        }
        debug!(alias = %manager.alias(), "Registered connection");
        managers.insert(manager.alias().to_string(), manager);
        true
    }

    pub fn get(&self, alias: &str) -> Option<Arc<ConnectionManager>> {
        self.read().get(alias).cloned()
    }

    /// Registered manager for `alias`, or a new unregistered one using `alias`
    /// as both database name and alias.
    pub fn lookup(&self, alias: &str) -> Arc<ConnectionManager> {
        self.get(alias).unwrap_or_else(|| {
            debug!(alias = %alias, "No registered connection, using alias as database");
            Arc::new(ConnectionManager::new(ConnectionConfig::new(alias)))
        })
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.read().contains_key(alias)
    }

    /// Registered aliases, sorted.
    pub fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.read().keys().cloned().collect();
        aliases.sort();
        aliases
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Deregister `alias`. The manager is returned still connected.
    pub fn remove(&self, alias: &str) -> Option<Arc<ConnectionManager>> {
        self.write().remove(alias)
    }

    /// Close every registered connection and empty the registry.
    pub fn close_all(&self) {
        let drained: Vec<_> = self.write().drain().collect();
        for (alias, manager) in drained {
            info!(alias = %alias, "Closing connection");
            manager.close();
        }
        info!("All connections closed");
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<ConnectionManager>>> {
        self.managers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<ConnectionManager>>> {
        self.managers.write().unwrap_or_else(PoisonError::into_inner)
    }
}
