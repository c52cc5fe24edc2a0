//! Subcommand implementations
//!
//! Each command opens at most one connection, runs one operation against
//! it and closes it again before returning.

use crate::config::ConnectionSettings;
use dbexec_batch::{BackupReport, BatchExecutor, BatchOptions, BatchReport, Statement};
use dbexec_core::{Connection, Result};
use dbexec_drivers::DriverRegistry;
use std::path::Path;

async fn connect(settings: &ConnectionSettings) -> Result<Box<dyn Connection>> {
    let manager = DriverRegistry::with_defaults().manager(&settings.driver)?;
    manager.connect(&settings.request()).await
}

async fn close(conn: Box<dyn Connection>) {
    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, "failed to close connection");
    }
}

/// Check that the database is reachable with the given settings
pub async fn ping(settings: &ConnectionSettings) -> Result<()> {
    let manager = DriverRegistry::with_defaults().manager(&settings.driver)?;
    manager.test_connection(&settings.request()).await
}

/// Execute every script below `query_dir`
pub async fn run(
    settings: &ConnectionSettings,
    query_dir: &Path,
    dry_run: bool,
) -> Result<BatchReport> {
    // Checked before connecting: opening a SQLite session creates the file
    dbexec_batch::validate_root(query_dir).inspect_err(|e| {
        tracing::error!(error = %e, "EXECUTE not attempted");
    })?;

    let executor = BatchExecutor::new(BatchOptions::new().with_dry_run(dry_run));
    let conn = connect(settings).await?;
    let result = executor.run(conn.as_ref(), query_dir).await;
    close(conn).await;
    result
}

/// Take a full backup of the connected database into `backup_dir`
pub async fn backup(settings: &ConnectionSettings, backup_dir: &Path) -> Result<BackupReport> {
    let conn = connect(settings).await?;
    let result = dbexec_batch::backup(conn.as_ref(), backup_dir).await;
    close(conn).await;
    result
}

/// Split one script without connecting anywhere
pub fn split(file: &Path) -> Result<Vec<Statement>> {
    let contents = std::fs::read_to_string(file)?;
    Ok(dbexec_batch::split(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionArgs, ConnectionProfile};
    use dbexec_core::DbExecError;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn sqlite_settings(db: &Path) -> ConnectionSettings {
        let args = ConnectionArgs {
            driver: Some("sqlite".into()),
            database: Some(db.to_string_lossy().into_owned()),
            ..Default::default()
        };
        ConnectionSettings::resolve(&args, &ConnectionProfile::default())
    }

    #[tokio::test]
    async fn test_run_against_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let queries = dir.path().join("queries");
        fs::create_dir_all(&queries).unwrap();
        fs::write(
            queries.join("01.sql"),
            "CREATE TABLE t (v INTEGER)\nGO\nINSERT INTO t VALUES (1)\n",
        )
        .unwrap();
        let db = dir.path().join("app.db");

        let report = run(&sqlite_settings(&db), &queries, false).await.unwrap();

        assert_eq!(report.statement_count(), 2);
        let conn = rusqlite::Connection::open(&db).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_missing_query_folder_never_connects() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("app.db");

        let err = run(&sqlite_settings(&db), &dir.path().join("missing"), false)
            .await
            .unwrap_err();

        assert!(matches!(err, DbExecError::NotFound(_)));
        assert!(!db.exists());
    }

    #[tokio::test]
    async fn test_missing_query_folder_wins_over_unreachable_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = Path::new("/no/such/parent/app.db");

        let err = run(&sqlite_settings(db), &dir.path().join("missing"), false)
            .await
            .unwrap_err();

        assert!(matches!(err, DbExecError::NotFound(_)));
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_unknown_driver_is_configuration_error() {
        let args = ConnectionArgs {
            driver: Some("oracle".into()),
            database: Some("x".into()),
            ..Default::default()
        };
        let settings = ConnectionSettings::resolve(&args, &ConnectionProfile::default());

        let err = ping(&settings).await.unwrap_err();

        assert!(matches!(err, DbExecError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_mysql_without_host_is_rejected_before_connecting() {
        let args = ConnectionArgs {
            database: Some("inventory".into()),
            user: Some("root".into()),
            ..Default::default()
        };
        let settings = ConnectionSettings::resolve(&args, &ConnectionProfile::default());

        let err = run(&settings, Path::new("."), false).await.unwrap_err();

        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_backup_against_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("app.db");
        let backups = dir.path().join("backups");
        fs::create_dir_all(&backups).unwrap();

        let report = backup(&sqlite_settings(&db), &backups).await.unwrap();

        assert!(report.location().starts_with(&backups));
        assert!(report.location().exists());
    }

    #[test]
    fn test_split_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.sql");
        fs::write(&file, "SELECT 1\nGO\nSELECT 2\n").unwrap();

        let statements = split(&file).unwrap();

        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1].sql, "SELECT 2");
    }

    #[test]
    fn test_split_missing_file_is_io_error() {
        let err = split(Path::new("/no/such/script.sql")).unwrap_err();
        assert!(matches!(err, DbExecError::Io(_)));
    }
}
