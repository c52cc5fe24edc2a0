//! Connection trait

use crate::{Result, StatementResult};
use async_trait::async_trait;
use std::path::Path;

/// A single live database session.
///
/// Connections are exclusively owned by the caller (`Box<dyn Connection>`)
/// and passed explicitly to every operation that needs one. Callers must not
/// drive two operations against the same connection concurrently.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "mysql", "sqlite")
    fn driver_name(&self) -> &str;

    /// Name of the database this session is using, if one is selected
    fn database_name(&self) -> Option<&str>;

    /// Execute one statement as-is, without parameters
    async fn execute(&self, sql: &str) -> Result<StatementResult>;

    /// Commit any open unit of work.
    ///
    /// Connections run in autocommit mode, so this only has an effect when
    /// an executed statement opened a transaction explicitly.
    async fn commit(&self) -> Result<()>;

    /// Statement used to verify that the session is usable
    fn ping_statement(&self) -> &'static str {
        "SELECT 1"
    }

    /// File extension for backups written by this engine
    fn backup_extension(&self) -> &'static str {
        "bak"
    }

    /// Build the server-side full backup command for `database` into `target`.
    ///
    /// The default is the `BACKUP DATABASE ... TO DISK` form; drivers
    /// override it with their engine's equivalent.
    fn backup_command(&self, database: &str, target: &Path) -> String {
        format!(
            "BACKUP DATABASE {} TO DISK = {}",
            database,
            quote_literal(&target.to_string_lossy())
        )
    }

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}

/// Render `value` as a single-quoted SQL string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_literal_doubles_single_quotes() {
        assert_eq!(quote_literal("/tmp/o'brien"), "'/tmp/o''brien'");
        assert_eq!(quote_literal(""), "''");
    }
}
