//! Test scaffolding for the batch crate
//!
//! `ScriptedConnection` records every statement it is asked to run and fails
//! the ones matching a configured needle. `capture_logs` routes tracing
//! output of the current thread into a buffer for assertions.

use async_trait::async_trait;
use dbexec_core::{Connection, DbExecError, Result, StatementResult};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing_subscriber::fmt::MakeWriter;

pub struct ScriptedConnection {
    executed: Mutex<Vec<String>>,
    commits: AtomicUsize,
    failures: Vec<(String, String)>,
    database: Option<String>,
    closed: AtomicBool,
}

impl ScriptedConnection {
    pub fn new() -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            commits: AtomicUsize::new(0),
            failures: Vec::new(),
            database: Some("inventory".to_string()),
            closed: AtomicBool::new(false),
        }
    }

    /// Fail every statement containing `needle` with `message`
    pub fn failing_on(mut self, needle: &str, message: &str) -> Self {
        self.failures.push((needle.to_string(), message.to_string()));
        self
    }

    pub fn with_database(mut self, database: Option<&str>) -> Self {
        self.database = database.map(str::to_string);
        self
    }

    /// Every statement passed to `execute`, including failed ones
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for ScriptedConnection {
    fn driver_name(&self) -> &str {
        "scripted"
    }

    fn database_name(&self) -> Option<&str> {
        self.database.as_deref()
    }

    async fn execute(&self, sql: &str) -> Result<StatementResult> {
        self.executed.lock().push(sql.to_string());
        if let Some((_, message)) = self.failures.iter().find(|(needle, _)| sql.contains(needle)) {
            return Err(DbExecError::Query(message.clone()));
        }
        Ok(StatementResult::new(1))
    }

    async fn commit(&self) -> Result<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn backup_extension(&self) -> &'static str {
        "bak"
    }

    fn backup_command(&self, database: &str, target: &Path) -> String {
        format!("BACKUP {} -> {}", database, target.display())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    /// Number of captured lines containing `needle`
    pub fn count(&self, needle: &str) -> usize {
        self.contents()
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Capture INFO and above for the current thread until the guard drops
pub fn capture_logs() -> (LogCapture, tracing::subscriber::DefaultGuard) {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}
