//! MySQL connection implementation

use async_trait::async_trait;
use dbexec_core::{Connection, DbExecError, Result, StatementResult, quote_literal};
use mysql_async::{Conn, Opts, OptsBuilder, prelude::*};
use std::path::Path;
use tokio::sync::Mutex;

/// MySQL connection wrapper.
///
/// Holds exactly one server session. Statements run in the session's
/// autocommit mode, so a `BEGIN` issued by a script stays open until
/// `commit` is called.
pub struct MySqlConnection {
    conn: Mutex<Option<Conn>>,
    /// Resolved at connect time so backups can name their file even when
    /// no database was passed explicitly.
    database_name: Option<String>,
}

impl MySqlConnection {
    /// Connect to a MySQL database
    pub async fn connect(
        host: &str,
        port: u16,
        database: Option<&str>,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self> {
        tracing::info!(host = %host, port = %port, database = ?database, "connecting to MySQL database");

        let mut opts_builder = OptsBuilder::from_opts(Opts::default())
            .ip_or_hostname(host)
            .tcp_port(port);

        if let Some(db) = database {
            opts_builder = opts_builder.db_name(Some(db));
        }
        if let Some(u) = user {
            opts_builder = opts_builder.user(Some(u));
        }
        if let Some(p) = password {
            opts_builder = opts_builder.pass(Some(p));
        }

        let mut conn = Conn::new(opts_builder)
            .await
            .map_err(|e| DbExecError::Connection(e.to_string()))?;

        let database_name = match database {
            Some(db) => Some(db.to_string()),
            None => {
                let row: Option<(Option<String>,)> = conn
                    .query_first("SELECT DATABASE()")
                    .await
                    .map_err(|e| DbExecError::Connection(format!("Failed to query DATABASE(): {}", e)))?;
                row.and_then(|(db,)| db)
            }
        };

        tracing::debug!(host = %host, port = %port, database = ?database_name, "MySQL session established");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            database_name,
        })
    }
}

fn backup_command(database: &str, target: &Path) -> String {
    format!(
        "BACKUP DATABASE `{}` TO DISK = {};",
        database.replace('`', "``"),
        quote_literal(&target.to_string_lossy())
    )
}

fn closed_error() -> DbExecError {
    DbExecError::Connection("MySQL connection is closed".into())
}

#[async_trait]
impl Connection for MySqlConnection {
    fn driver_name(&self) -> &str {
        "mysql"
    }

    fn database_name(&self) -> Option<&str> {
        self.database_name.as_deref()
    }

    #[tracing::instrument(skip(self, sql), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str) -> Result<StatementResult> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed_error)?;

        conn.query_drop(sql)
            .await
            .map_err(|e| DbExecError::Query(e.to_string()))?;

        let affected_rows = conn.affected_rows();
        tracing::debug!(affected_rows, "statement executed");
        Ok(StatementResult::new(affected_rows))
    }

    async fn commit(&self) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed_error)?;
        conn.query_drop("COMMIT")
            .await
            .map_err(|e| DbExecError::Query(e.to_string()))
    }

    fn backup_extension(&self) -> &'static str {
        "sql"
    }

    fn backup_command(&self, database: &str, target: &Path) -> String {
        backup_command(database, target)
    }

    async fn close(&self) -> Result<()> {
        let conn = self.conn.lock().await.take();
        if let Some(conn) = conn {
            conn.disconnect()
                .await
                .map_err(|e| DbExecError::Connection(format!("Failed to close MySQL connection: {}", e)))?;
            tracing::debug!("MySQL connection closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        match self.conn.try_lock() {
            Ok(guard) => guard.is_none(),
            // Busy means a statement is running on a live session
            Err(_) => false,
        }
    }
}
