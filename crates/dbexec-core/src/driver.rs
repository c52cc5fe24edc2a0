//! Database driver trait definition

use crate::{Connection, DbExecError, Result};
use async_trait::async_trait;
use std::fmt;

/// Core driver trait that all database drivers must implement
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Unique identifier for this driver (e.g., "mysql", "sqlite")
    fn id(&self) -> &'static str {
        self.name()
    }

    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Default connection port (None for file-based databases like SQLite)
    fn default_port(&self) -> Option<u16> {
        None
    }

    /// Whether this driver talks to a server (host, port and user required)
    fn is_server_based(&self) -> bool {
        self.default_port().is_some()
    }

    /// Create a new connection
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>>;

    /// Connect, run the ping statement and close again
    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()> {
        tracing::debug!(driver = self.name(), "testing connection");
        let conn = self.connect(config).await?;
        let ping = conn.execute(conn.ping_statement()).await;
        conn.close().await?;
        ping.map(|_| ())
    }

    /// Build a connection string from configuration, never including the password
    fn build_connection_string(&self, config: &ConnectionConfig) -> String;
}

/// Connection configuration.
///
/// The password is write-only: it is handed to the driver on connect and is
/// never rendered by `Debug` or by connection strings.
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Driver ID (e.g., "mysql", "sqlite")
    pub driver: String,
    /// Host address (empty for file-based databases)
    pub host: String,
    /// Port number (0 for default or file-based)
    pub port: u16,
    /// Database name or file path
    pub database: Option<String>,
    pub username: Option<String>,
    password: Option<String>,
}

impl ConnectionConfig {
    /// Create a new configuration with default values
    pub fn new(driver: &str) -> Self {
        Self {
            driver: driver.to_string(),
            host: String::new(),
            port: 0,
            database: None,
            username: None,
            password: None,
        }
    }

    /// Create a SQLite configuration
    pub fn new_sqlite(database_path: &str) -> Self {
        let mut config = Self::new("sqlite");
        config.database = Some(database_path.to_string());
        config
    }

    /// Create a MySQL configuration
    pub fn new_mysql(host: &str, port: u16, database: &str, username: &str) -> Self {
        let mut config = Self::new("mysql");
        config.host = host.to_string();
        config.port = port;
        config.database = Some(database.to_string());
        config.username = Some(username.to_string());
        config
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.password = (!password.is_empty()).then_some(password);
        self
    }

    /// Look up a connection field by the key drivers use for it
    pub fn get_string(&self, key: &str) -> Option<String> {
        match key {
            "host" => (!self.host.is_empty()).then(|| self.host.clone()),
            "database" | "path" => self.database.clone(),
            "username" | "user" => self.username.clone(),
            _ => None,
        }
    }

    /// Hand the password to a driver. Only drivers should call this.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Require a database name, as every supported driver needs one
    pub fn require_database(&self) -> Result<&str> {
        self.database
            .as_deref()
            .filter(|db| !db.is_empty())
            .ok_or_else(|| DbExecError::Configuration("database is required".into()))
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
