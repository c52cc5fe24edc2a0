//! Connection manager: validates operator input and opens one session

use crate::{Connection, ConnectionConfig, DatabaseDriver, DbExecError, Result};
use std::sync::Arc;

/// Raw connection inputs, as typed by an operator
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectRequest<'a> {
    pub host: &'a str,
    /// Port as text; empty selects the driver's default port
    pub port: &'a str,
    pub user: &'a str,
    pub password: &'a str,
    /// Database name, or file path for file-based drivers
    pub database: &'a str,
}

impl std::fmt::Display for ConnectRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.is_empty() {
            write!(f, "{}", self.database)
        } else {
            write!(f, "{}:{}/{}", self.host, self.port, self.database)
        }
    }
}

/// Opens connections through a single driver.
///
/// Every attempt emits exactly one log line, whether it succeeds, fails in
/// the driver, or is rejected before the driver is called. There is no
/// retry: callers re-invoke `connect` explicitly.
pub struct ConnectionManager {
    driver: Arc<dyn DatabaseDriver>,
}

impl ConnectionManager {
    pub fn new(driver: Arc<dyn DatabaseDriver>) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &Arc<dyn DatabaseDriver> {
        &self.driver
    }

    /// Validate a request and turn it into a driver configuration
    pub fn build_config(&self, request: &ConnectRequest<'_>) -> Result<ConnectionConfig> {
        let database = request.database.trim();
        if database.is_empty() {
            return Err(DbExecError::Configuration("database is required".into()));
        }

        let mut config = ConnectionConfig::new(self.driver.id());
        config.database = Some(database.to_string());

        if self.driver.is_server_based() {
            let host = request.host.trim();
            if host.is_empty() {
                return Err(DbExecError::Configuration("host is required".into()));
            }
            let user = request.user.trim();
            if user.is_empty() {
                return Err(DbExecError::Configuration("user is required".into()));
            }
            config.host = host.to_string();
            config.username = Some(user.to_string());
            config.port = parse_port(request.port, self.driver.default_port())?;
            config = config.with_password(request.password);
        }

        Ok(config)
    }

    /// Open a connection for `request`
    pub async fn connect(&self, request: &ConnectRequest<'_>) -> Result<Box<dyn Connection>> {
        let config = match self.build_config(request) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, target_db = %request, "Connection not attempted");
                return Err(e);
            }
        };

        match self.driver.connect(&config).await {
            Ok(conn) => {
                tracing::info!(
                    driver = self.driver.name(),
                    host = %display_host(&config),
                    target_db = %self.driver.build_connection_string(&config),
                    "Connection successful"
                );
                Ok(conn)
            }
            Err(e) => {
                let message = match e {
                    DbExecError::Connection(message) => message,
                    other => other.to_string(),
                };
                tracing::error!(
                    driver = self.driver.name(),
                    host = %display_host(&config),
                    error = %message,
                    "Connection failed"
                );
                Err(DbExecError::Connection(message))
            }
        }
    }

    /// Connect, ping and disconnect
    pub async fn test_connection(&self, request: &ConnectRequest<'_>) -> Result<()> {
        let config = self.build_config(request)?;
        self.driver.test_connection(&config).await.inspect_err(|e| {
            tracing::error!(error = %e, "Connection test failed");
        })?;
        tracing::info!(host = %display_host(&config), "Connection test succeeded");
        Ok(())
    }
}

fn display_host(config: &ConnectionConfig) -> &str {
    if config.host.is_empty() {
        config.database.as_deref().unwrap_or_default()
    } else {
        &config.host
    }
}

/// Parse a port typed by an operator; must be a positive integer
pub fn parse_port(raw: &str, default: Option<u16>) -> Result<u16> {
    let raw = raw.trim();
    if raw.is_empty() {
        return default.ok_or_else(|| DbExecError::Configuration("port is required".into()));
    }
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(DbExecError::Configuration(format!(
            "port must be a positive integer, got '{}'",
            raw
        ))),
    }
}
