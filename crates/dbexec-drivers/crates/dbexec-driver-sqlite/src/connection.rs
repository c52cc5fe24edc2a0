//! SQLite connection implementation

use async_trait::async_trait;
use dbexec_core::{Connection, DbExecError, Result, StatementResult, quote_literal};
use parking_lot::Mutex;
use rusqlite::{Connection as RusqliteConnection, OpenFlags};
use std::path::Path;

/// SQLite connection wrapper
pub struct SqliteConnection {
    conn: Mutex<Option<RusqliteConnection>>,
    path: String,
    /// File stem of `path`, used as the database name for backups
    database_name: String,
}

impl SqliteConnection {
    /// Open a SQLite database
    pub fn open(path: &str) -> Result<Self> {
        tracing::info!(path = %path, "opening SQLite database");
        let expanded_path = Self::expand_path(path)?;

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = if path == ":memory:" {
            RusqliteConnection::open_in_memory().map_err(|e| {
                DbExecError::Connection(format!("Failed to open in-memory database: {}", e))
            })?
        } else {
            if !expanded_path.starts_with("file:") {
                let file_path = Path::new(&expanded_path);
                if let Some(parent) = file_path.parent()
                    && !parent.exists()
                {
                    return Err(DbExecError::Connection(format!(
                        "Parent directory does not exist: {}",
                        parent.display()
                    )));
                }
            }

            RusqliteConnection::open_with_flags(&expanded_path, flags).map_err(|e| {
                DbExecError::Connection(format!(
                    "Failed to open SQLite database at '{}': {}",
                    expanded_path, e
                ))
            })?
        };

        conn.pragma_update(None, "foreign_keys", "ON").map_err(|e| {
            DbExecError::Connection(format!("Failed to enable foreign keys: {}", e))
        })?;

        let database_name = if path == ":memory:" {
            "memory".to_string()
        } else {
            Path::new(&expanded_path)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "main".to_string())
        };

        tracing::debug!(path = %expanded_path, "SQLite database connection established");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: expanded_path,
            database_name,
        })
    }

    /// Absolute path of the database file
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Expand path to handle ~ (home directory) and relative paths
    fn expand_path(path: &str) -> Result<String> {
        if path == ":memory:" || path.starts_with("file:") {
            return Ok(path.to_string());
        }

        let expanded = if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                let home_path = std::path::PathBuf::from(home);
                home_path.join(rest).to_string_lossy().to_string()
            } else {
                return Err(DbExecError::Configuration(
                    "Unable to determine HOME directory".into(),
                ));
            }
        } else if path.starts_with('~') {
            return Err(DbExecError::Configuration(
                "User-specific home directories (~user) are not supported".into(),
            ));
        } else {
            path.to_string()
        };

        let path_buf = std::path::PathBuf::from(&expanded);
        let result = if path_buf.is_relative() {
            std::env::current_dir()?
                .join(path_buf)
                .to_string_lossy()
                .to_string()
        } else {
            expanded
        };

        Ok(result)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&RusqliteConnection) -> rusqlite::Result<T>) -> Result<T> {
        let guard = self.conn.lock();
        let conn = guard
            .as_ref()
            .ok_or_else(|| DbExecError::Connection("SQLite connection is closed".into()))?;
        f(conn).map_err(|e| DbExecError::Query(e.to_string()))
    }
}

fn total_changes(conn: &RusqliteConnection) -> rusqlite::Result<u64> {
    conn.query_row("SELECT total_changes()", [], |row| row.get::<_, i64>(0))
        .map(|count| count as u64)
}

#[async_trait]
impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    fn database_name(&self) -> Option<&str> {
        Some(&self.database_name)
    }

    #[tracing::instrument(skip(self, sql), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str) -> Result<StatementResult> {
        // execute_batch also accepts statements that return rows; their
        // output is discarded like the other drivers do.
        // changes() keeps the count of the last DML statement across DDL and
        // queries, so the count is taken as a total_changes() delta instead.
        let affected_rows = self.with_conn(|conn| {
            let before = total_changes(conn)?;
            conn.execute_batch(sql)?;
            let after = total_changes(conn)?;
            Ok(after.saturating_sub(before))
        })?;

        tracing::debug!(affected_rows, "statement executed");
        Ok(StatementResult::new(affected_rows))
    }

    async fn commit(&self) -> Result<()> {
        self.with_conn(|conn| {
            if conn.is_autocommit() {
                Ok(())
            } else {
                conn.execute_batch("COMMIT")
            }
        })
    }

    fn backup_extension(&self) -> &'static str {
        "db"
    }

    fn backup_command(&self, _database: &str, target: &Path) -> String {
        format!("VACUUM INTO {}", quote_literal(&target.to_string_lossy()))
    }

    async fn close(&self) -> Result<()> {
        if let Some(conn) = self.conn.lock().take() {
            conn.close().map_err(|(_, e)| {
                DbExecError::Connection(format!("Failed to close SQLite database: {}", e))
            })?;
            tracing::debug!(path = %self.path, "SQLite database closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_reports_affected_rows() {
        let conn = SqliteConnection::open(":memory:").unwrap();

        conn.execute("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .unwrap();
        let result = conn
            .execute("INSERT INTO items (name) VALUES ('a'), ('b')")
            .await
            .unwrap();

        assert_eq!(result.affected_rows, 2);
    }

    #[tokio::test]
    async fn test_ddl_and_queries_after_dml_report_zero_rows() {
        let conn = SqliteConnection::open(":memory:").unwrap();
        conn.execute("CREATE TABLE t (id INTEGER)").await.unwrap();
        let inserted = conn
            .execute("INSERT INTO t VALUES (1), (2), (3)")
            .await
            .unwrap();

        let created = conn.execute("CREATE TABLE u (id INTEGER)").await.unwrap();
        let selected = conn.execute("SELECT * FROM t").await.unwrap();
        let updated = conn.execute("UPDATE t SET id = id + 1 WHERE id > 1").await.unwrap();

        assert_eq!(inserted.affected_rows, 3);
        assert_eq!(created.affected_rows, 0);
        assert_eq!(selected.affected_rows, 0);
        assert_eq!(updated.affected_rows, 2);
    }

    #[tokio::test]
    async fn test_select_statement_is_accepted() {
        let conn = SqliteConnection::open(":memory:").unwrap();
        conn.execute("SELECT 1").await.unwrap();
    }

    #[tokio::test]
    async fn test_driver_error_is_query_error() {
        let conn = SqliteConnection::open(":memory:").unwrap();

        let err = conn.execute("INSERT INTO missing VALUES (1)").await.unwrap_err();

        match err {
            DbExecError::Query(message) => assert!(message.contains("no such table")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_commit_closes_explicit_transaction() {
        let conn = SqliteConnection::open(":memory:").unwrap();
        conn.execute("CREATE TABLE t (v INTEGER)").await.unwrap();
        conn.execute("BEGIN").await.unwrap();
        conn.execute("INSERT INTO t VALUES (1)").await.unwrap();

        conn.commit().await.unwrap();

        assert!(conn.with_conn(|c| Ok(c.is_autocommit())).unwrap());
        // Committing in autocommit mode is a no-op
        conn.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_invalidates_connection() {
        let conn = SqliteConnection::open(":memory:").unwrap();
        assert!(!conn.is_closed());

        conn.close().await.unwrap();

        assert!(conn.is_closed());
        assert!(matches!(
            conn.execute("SELECT 1").await,
            Err(DbExecError::Connection(_))
        ));
    }

    #[test]
    fn test_database_name_is_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.db");

        let conn = SqliteConnection::open(path.to_str().unwrap()).unwrap();

        assert_eq!(conn.database_name(), Some("inventory"));
    }

    #[test]
    fn test_missing_parent_directory_is_connection_error() {
        let result = SqliteConnection::open("/definitely/not/here/data.db");
        assert!(matches!(result, Err(DbExecError::Connection(_))));
    }

    #[test]
    fn test_backup_command_is_vacuum_into() {
        let conn = SqliteConnection::open(":memory:").unwrap();
        assert_eq!(
            conn.backup_command("memory", Path::new("/tmp/memory_1.db")),
            "VACUUM INTO '/tmp/memory_1.db'"
        );
    }
}
