//! Run log for dbexec
//!
//! Each invocation writes a fresh log file named after the local time the
//! run started (`2024-03-09 07 05 02.log`) into the log directory. The file
//! layer never uses ANSI colors; an optional console layer mirrors events to
//! stderr. `RUST_LOG` overrides the default filter.
//!
//! Logging never fails the run. If the file cannot be created, console
//! logging is still installed and the returned handle carries the error so
//! the caller can report it.

use chrono::{DateTime, Local};
use dbexec_core::DbExecError;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const LOG_FILE_FORMAT: &str = "%Y-%m-%d %H %M %S.log";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory where log files should be written
    pub log_dir: PathBuf,

    /// Whether to mirror events to stderr
    pub enable_console_logs: bool,

    /// Default log level filter
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: log_directory(),
            enable_console_logs: true,
            default_filter: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn with_log_dir(mut self, log_dir: PathBuf) -> Self {
        self.log_dir = log_dir;
        self
    }

    pub fn with_console(mut self, enabled: bool) -> Self {
        self.enable_console_logs = enabled;
        self
    }
}

/// Keeps the file writer alive for the duration of the run.
///
/// Dropping the handle flushes buffered events to the log file.
pub struct LogHandle {
    _guard: Option<WorkerGuard>,
    path: Option<PathBuf>,
    error: Option<DbExecError>,
}

impl LogHandle {
    /// Path of this run's log file, if one was created
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Why the log file could not be created
    pub fn error(&self) -> Option<&DbExecError> {
        self.error.as_ref()
    }
}

/// Default log directory: `<local data dir>/dbexec/logs`
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dbexec")
        .join("logs")
}

/// File name for a run started at `started`
pub fn log_file_name(started: DateTime<Local>) -> String {
    started.format(LOG_FILE_FORMAT).to_string()
}

/// Create the log directory and an appender for a new log file in it
fn file_appender(log_dir: &Path, file_name: &str) -> Result<RollingFileAppender, DbExecError> {
    std::fs::create_dir_all(log_dir).map_err(|e| {
        DbExecError::Log(format!(
            "cannot create log directory '{}': {}",
            log_dir.display(),
            e
        ))
    })?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(log_dir)
        .map_err(|e| {
            DbExecError::Log(format!(
                "cannot create log file '{}': {}",
                log_dir.join(file_name).display(),
                e
            ))
        })
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Initialize the logging system for this run.
///
/// Installs the global subscriber; call once per process.
pub fn init(config: LoggingConfig) -> LogHandle {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let mut handle = LogHandle {
        _guard: None,
        path: None,
        error: None,
    };

    let file_name = log_file_name(Local::now());
    match file_appender(&config.log_dir, &file_name) {
        Ok(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(non_blocking)
                .with_filter(env_filter(&config.default_filter))
                .boxed();

            layers.push(file_layer);
            handle._guard = Some(guard);
            handle.path = Some(config.log_dir.join(&file_name));
        }
        Err(e) => handle.error = Some(e),
    }

    if config.enable_console_logs || handle.error.is_some() {
        let console_layer = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(env_filter(&config.default_filter))
            .boxed();

        layers.push(console_layer);
    }

    // A subscriber may already be installed (tests); events then go there
    let _ = tracing_subscriber::registry().with(layers).try_init();

    match (&handle.path, &handle.error) {
        (Some(path), _) => tracing::info!(
            log_file = %path.display(),
            console_enabled = config.enable_console_logs,
            "Logging system initialized"
        ),
        (None, Some(e)) => tracing::warn!(error = %e, "Logging to file disabled"),
        (None, None) => {}
    }

    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_logging_config_defaults() {
        let config = LoggingConfig::default();
        assert!(config.enable_console_logs);
        assert_eq!(config.default_filter, "info");
        assert!(config.log_dir.ends_with("dbexec/logs"));
    }

    #[test]
    fn test_builder_methods() {
        let config = LoggingConfig::default()
            .with_log_dir(PathBuf::from("/tmp/run-logs"))
            .with_console(false);

        assert_eq!(config.log_dir, PathBuf::from("/tmp/run-logs"));
        assert!(!config.enable_console_logs);
    }

    #[test]
    fn test_log_file_name_uses_start_time() {
        let started = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap();
        assert_eq!(log_file_name(started), "2024-03-09 07 05 02.log");
    }

    #[test]
    fn test_file_appender_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("nested").join("logs");

        let appender = file_appender(&log_dir, "run.log").unwrap();
        drop(appender);

        assert!(log_dir.join("run.log").exists());
    }

    #[test]
    fn test_file_appender_reports_unusable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let err = file_appender(&blocker.join("logs"), "run.log").unwrap_err();

        assert!(matches!(err, DbExecError::Log(_)));
    }
}
