//! SQLite driver implementation

use async_trait::async_trait;
use dbexec_core::{Connection, ConnectionConfig, DatabaseDriver, DbExecError, Result};

use crate::SqliteConnection;

/// SQLite database driver
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create a new SQLite driver instance
    pub fn new() -> Self {
        tracing::debug!("SQLite driver initialized");
        Self
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    #[tracing::instrument(skip(self, config), fields(path = config.get_string("path").as_deref()))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let path = config.get_string("path").ok_or_else(|| {
            DbExecError::Configuration(
                "SQLite requires a database file path, e.g. --database /path/to/database.db".into(),
            )
        })?;

        let conn = SqliteConnection::open(&path)?;
        Ok(Box::new(conn))
    }

    fn build_connection_string(&self, config: &ConnectionConfig) -> String {
        config
            .get_string("path")
            .unwrap_or_else(|| ":memory:".to_string())
    }
}
