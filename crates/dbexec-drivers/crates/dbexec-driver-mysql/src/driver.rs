//! MySQL driver implementation

use async_trait::async_trait;
use dbexec_core::{Connection, ConnectionConfig, DatabaseDriver, DbExecError, Result};

use crate::MySqlConnection;

const DEFAULT_PORT: u16 = 3306;

/// MySQL database driver
pub struct MySqlDriver;

impl MySqlDriver {
    /// Create a new MySQL driver instance
    pub fn new() -> Self {
        tracing::debug!("MySQL driver initialized");
        Self
    }
}

impl Default for MySqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for MySqlDriver {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn default_port(&self) -> Option<u16> {
        Some(DEFAULT_PORT)
    }

    #[tracing::instrument(skip(self, config), fields(host = config.get_string("host").as_deref(), database = config.get_string("database").as_deref()))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let host = config
            .get_string("host")
            .unwrap_or_else(|| "localhost".to_string());
        let port = if config.port > 0 { config.port } else { DEFAULT_PORT };
        let database = config.get_string("database");
        let user = config.get_string("user");

        let conn = MySqlConnection::connect(
            &host,
            port,
            database.as_deref(),
            user.as_deref(),
            config.password(),
        )
        .await
        .map_err(|e| match e {
            DbExecError::Connection(message) => DbExecError::Connection(message),
            other => DbExecError::Connection(other.to_string()),
        })?;

        Ok(Box::new(conn))
    }

    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        let host = config
            .get_string("host")
            .unwrap_or_else(|| "localhost".to_string());
        let port = if config.port > 0 { config.port } else { DEFAULT_PORT };

        let mut conn_str = String::from("mysql://");

        if let Some(u) = config.get_string("user") {
            conn_str.push_str(&u);
            conn_str.push('@');
        }

        conn_str.push_str(&format!("{}:{}", host, port));

        if let Some(db) = config.get_string("database") {
            conn_str.push('/');
            conn_str.push_str(&db);
        }

        conn_str
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_string_omits_password() {
        let driver = MySqlDriver::new();
        let config = ConnectionConfig::new_mysql("db.internal", 3307, "inventory", "deploy")
            .with_password("hunter2");

        assert_eq!(
            driver.build_connection_string(&config),
            "mysql://deploy@db.internal:3307/inventory"
        );
    }

    #[test]
    fn test_connection_string_defaults() {
        let driver = MySqlDriver::new();
        let config = ConnectionConfig::new("mysql");

        assert_eq!(driver.build_connection_string(&config), "mysql://localhost:3306");
    }

    #[tokio::test]
    async fn test_connect_refused_is_connection_error() {
        let driver = MySqlDriver::new();
        // Port 1 is reserved and nothing listens there on a test host
        let config = ConnectionConfig::new_mysql("127.0.0.1", 1, "inventory", "root");

        let result = driver.connect(&config).await;

        assert!(matches!(result, Err(DbExecError::Connection(_))));
    }
}
