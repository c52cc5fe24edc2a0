//! Driver registry for resolving drivers by name

use dbexec_core::{ConnectionManager, DatabaseDriver, DbExecError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry of available database drivers
pub struct DriverRegistry {
    drivers: BTreeMap<String, Arc<dyn DatabaseDriver>>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: BTreeMap::new(),
        }
    }

    /// Create a registry with all built-in drivers registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        #[cfg(feature = "mysql")]
        registry.register(Arc::new(crate::mysql::MySqlDriver::new()));
        #[cfg(feature = "sqlite")]
        registry.register(Arc::new(crate::sqlite::SqliteDriver::new()));

        registry
    }

    /// Register a new driver
    pub fn register(&mut self, driver: Arc<dyn DatabaseDriver>) {
        let name = driver.name().to_string();
        tracing::debug!(driver = %name, "registering database driver");
        self.drivers.insert(name, driver);
    }

    /// Get a driver by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn DatabaseDriver>> {
        let driver = self.drivers.get(name).cloned();
        if driver.is_none() {
            tracing::warn!(driver = %name, "driver not found in registry");
        }
        driver
    }

    /// List all registered driver names, sorted
    pub fn list(&self) -> Vec<&str> {
        self.drivers.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a driver is registered
    pub fn has(&self, name: &str) -> bool {
        self.drivers.contains_key(name)
    }

    /// Build a connection manager for the named driver
    pub fn manager(&self, name: &str) -> Result<ConnectionManager> {
        self.get(name).map(ConnectionManager::new).ok_or_else(|| {
            DbExecError::Configuration(format!(
                "unknown driver '{}', expected one of: {}",
                name,
                self.list().join(", ")
            ))
        })
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry() {
        let registry = DriverRegistry::new();
        assert!(registry.list().is_empty());
        assert!(registry.get("mysql").is_none());
    }

    #[cfg(all(feature = "mysql", feature = "sqlite"))]
    #[test]
    fn test_default_drivers() {
        let registry = DriverRegistry::with_defaults();

        assert_eq!(registry.list(), vec!["mysql", "sqlite"]);
        assert!(registry.has("mysql"));
        assert_eq!(registry.get("mysql").unwrap().default_port(), Some(3306));
    }

    #[test]
    fn test_unknown_driver_is_configuration_error() {
        let registry = DriverRegistry::with_defaults();

        let err = registry.manager("oracle").err().unwrap();

        assert!(matches!(err, DbExecError::Configuration(_)));
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_manager_connects_through_registry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.db");
        let manager = DriverRegistry::with_defaults().manager("sqlite").unwrap();

        let conn = manager
            .connect(&dbexec_core::ConnectRequest {
                database: path.to_str().unwrap(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(conn.driver_name(), "sqlite");
        assert_eq!(conn.database_name(), Some("registry"));
        conn.close().await.unwrap();
    }
}
