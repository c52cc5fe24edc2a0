//! Full database backups through the live connection
//!
//! The backup itself runs on the server: this module only names the target
//! file, asks the connection for its engine's backup command and executes
//! it. The destination path is interpreted by the database server, not by
//! this process.

use chrono::{DateTime, Local};
use dbexec_core::{Connection, DbExecError, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[cfg(test)]
mod tests;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `<database>_<YYYYMMDD_HHMMSS>.<extension>`
pub fn backup_file_name(database: &str, extension: &str, timestamp: DateTime<Local>) -> String {
    format!(
        "{}_{}.{}",
        database,
        timestamp.format(TIMESTAMP_FORMAT),
        extension
    )
}

/// A fully resolved backup, ready to be sent to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRequest {
    pub destination: PathBuf,
    pub database: String,
    pub file_name: String,
    /// `destination` joined with `file_name`
    pub target: PathBuf,
    /// Vendor command that writes the backup
    pub command: String,
}

impl BackupRequest {
    /// Resolve the backup target for the connection's current database
    pub fn new(conn: &dyn Connection, destination: &Path, now: DateTime<Local>) -> Result<Self> {
        if destination.as_os_str().is_empty() {
            return Err(DbExecError::Configuration(
                "backup folder not selected".into(),
            ));
        }

        let database = conn
            .database_name()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                DbExecError::Configuration("connection has no active database to back up".into())
            })?
            .to_string();

        let file_name = backup_file_name(&database, conn.backup_extension(), now);
        let target = destination.join(&file_name);
        let command = conn.backup_command(&database, &target);

        Ok(Self {
            destination: destination.to_path_buf(),
            database,
            file_name,
            target,
            command,
        })
    }
}

/// Result of a completed backup
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub request: BackupRequest,
    pub execution_time: Duration,
}

impl BackupReport {
    /// Where the server wrote the backup
    pub fn location(&self) -> &Path {
        &self.request.target
    }
}

/// Take a full backup of the connection's database into `destination`
pub async fn backup(conn: &dyn Connection, destination: &Path) -> Result<BackupReport> {
    let request = BackupRequest::new(conn, destination, Local::now()).inspect_err(|e| {
        tracing::error!(error = %e, "Backup not attempted");
    })?;

    tracing::info!(database = %request.database, "Backup Start");
    tracing::info!(command = %request.command, "Backup command");

    let start = Instant::now();
    let result = match conn.execute(&request.command).await {
        Ok(_) => conn.commit().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            let execution_time = start.elapsed();
            tracing::info!(
                elapsed_ms = execution_time.as_millis() as u64,
                "Backup completed successfully"
            );
            tracing::info!(location = %request.target.display(), "Backup file location");
            Ok(BackupReport {
                request,
                execution_time,
            })
        }
        Err(e) => {
            let message = match e {
                DbExecError::Query(message) | DbExecError::Connection(message) => message,
                other => other.to_string(),
            };
            tracing::error!(error = %message, command = %request.command, "Backup failed");
            Err(DbExecError::Backup(message))
        }
    }
}
