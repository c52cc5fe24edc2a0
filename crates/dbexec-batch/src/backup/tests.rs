use super::*;
use crate::test_helpers::{ScriptedConnection, capture_logs};
use chrono::TimeZone;
use pretty_assertions::assert_eq;

fn fixed_time() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap()
}

#[test]
fn test_backup_file_name_format() {
    assert_eq!(
        backup_file_name("inventory", "bak", fixed_time()),
        "inventory_20240309_070502.bak"
    );
}

#[test]
fn test_request_resolves_target_and_command() {
    let conn = ScriptedConnection::new();
    let destination = Path::new("/var/backups");

    let request = BackupRequest::new(&conn, destination, fixed_time()).unwrap();

    assert_eq!(request.database, "inventory");
    assert_eq!(request.file_name, "inventory_20240309_070502.bak");
    assert_eq!(
        request.target,
        Path::new("/var/backups/inventory_20240309_070502.bak")
    );
    assert_eq!(
        request.command,
        "BACKUP inventory -> /var/backups/inventory_20240309_070502.bak"
    );
}

#[test]
fn test_request_requires_destination() {
    let conn = ScriptedConnection::new();

    let err = BackupRequest::new(&conn, Path::new(""), fixed_time()).unwrap_err();

    assert!(matches!(err, DbExecError::Configuration(_)));
}

#[test]
fn test_request_requires_active_database() {
    let conn = ScriptedConnection::new().with_database(None);

    let err = BackupRequest::new(&conn, Path::new("/var/backups"), fixed_time()).unwrap_err();

    assert!(matches!(err, DbExecError::Configuration(_)));
}

#[tokio::test]
async fn test_backup_executes_command_once() {
    let conn = ScriptedConnection::new();
    let (logs, _guard) = capture_logs();

    let report = backup(&conn, Path::new("/var/backups")).await.unwrap();

    let executed = conn.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0], report.request.command);
    assert_eq!(conn.commit_count(), 1);
    assert!(report.location().starts_with("/var/backups"));
    assert!(report.request.file_name.starts_with("inventory_"));

    assert_eq!(logs.count("Backup Start"), 1);
    assert_eq!(logs.count("Backup completed successfully"), 1);
    assert!(logs.contents().contains(&report.request.command));
}

#[tokio::test]
async fn test_empty_destination_never_reaches_driver() {
    let conn = ScriptedConnection::new();

    let err = backup(&conn, Path::new("")).await.unwrap_err();

    assert!(err.is_configuration());
    assert!(conn.executed().is_empty());
}

#[tokio::test]
async fn test_missing_database_never_reaches_driver() {
    let conn = ScriptedConnection::new().with_database(Some(""));

    let err = backup(&conn, Path::new("/var/backups")).await.unwrap_err();

    assert!(matches!(err, DbExecError::Configuration(_)));
    assert!(conn.executed().is_empty());
}

#[tokio::test]
async fn test_driver_rejection_is_backup_error() {
    let conn = ScriptedConnection::new().failing_on("BACKUP", "Access denied for backup");
    let (logs, _guard) = capture_logs();

    let err = backup(&conn, Path::new("/var/backups")).await.unwrap_err();

    match err {
        DbExecError::Backup(message) => assert_eq!(message, "Access denied for backup"),
        other => panic!("expected backup error, got {other:?}"),
    }
    assert_eq!(conn.commit_count(), 0);
    assert_eq!(logs.count("Backup failed"), 1);
    assert_eq!(logs.count("Backup completed successfully"), 0);
}
