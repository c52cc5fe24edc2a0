//! Batch executor implementation
//!
//! Execution is strictly sequential: a statement is awaited to completion
//! and committed before the next one starts. There is no continue-on-error
//! mode and no cross-statement transaction; after a failure the statements
//! already run stay committed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dbexec_core::{Connection, DbExecError, Result, StatementResult};

use crate::discovery::{discover, validate_root};
use crate::splitter::{GoDelimiterSplitter, Statement, StatementSplitter};

/// Configuration options for batch execution
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Discover and split scripts, but execute nothing
    pub dry_run: bool,
}

impl BatchOptions {
    /// Create new batch options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Status of a single statement in the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementStatus {
    /// Statement executed and committed
    Success,
    /// Dry run: statement would have been executed
    Planned,
}

/// Result of one statement that ran (or would run) in the batch.
///
/// A failing statement has no outcome: it ends the batch with
/// `DbExecError::Statement` instead.
#[derive(Debug, Clone)]
pub struct StatementOutcome {
    /// 1-based position within its script
    pub ordinal: usize,
    /// The SQL that was executed
    pub sql: String,
    pub status: StatementStatus,
    /// Rows affected (for DML statements)
    pub affected_rows: u64,
    /// Execution time including the commit
    pub execution_time: Duration,
}

impl StatementOutcome {
    fn success(statement: Statement, result: StatementResult, duration: Duration) -> Self {
        Self {
            ordinal: statement.ordinal,
            sql: statement.sql,
            status: StatementStatus::Success,
            affected_rows: result.affected_rows,
            execution_time: duration,
        }
    }

    fn planned(statement: Statement) -> Self {
        Self {
            ordinal: statement.ordinal,
            sql: statement.sql,
            status: StatementStatus::Planned,
            affected_rows: 0,
            execution_time: Duration::ZERO,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StatementStatus::Success
    }
}

/// Outcomes for one script, in textual order
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcomes: Vec<StatementOutcome>,
}

/// Result of a completed batch
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// One entry per discovered script, in execution order
    pub files: Vec<FileReport>,
    pub total_execution_time: Duration,
    pub dry_run: bool,
}

impl BatchReport {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Number of statements executed (or planned, for a dry run)
    pub fn statement_count(&self) -> usize {
        self.files.iter().map(|f| f.outcomes.len()).sum()
    }

    /// Get the total number of rows affected across all statements
    pub fn total_affected_rows(&self) -> u64 {
        self.outcomes().map(|o| o.affected_rows).sum()
    }

    /// All outcomes across files, in execution order
    pub fn outcomes(&self) -> impl Iterator<Item = &StatementOutcome> {
        self.files.iter().flat_map(|f| f.outcomes.iter())
    }
}

/// Runs the scripts of a query folder against one connection
#[derive(Clone)]
pub struct BatchExecutor {
    options: BatchOptions,
    splitter: Arc<dyn StatementSplitter>,
}

impl BatchExecutor {
    /// Create a batch executor with the given options and the `GO` splitter
    pub fn new(options: BatchOptions) -> Self {
        Self {
            options,
            splitter: Arc::new(GoDelimiterSplitter),
        }
    }

    /// Create a batch executor with default options
    pub fn with_defaults() -> Self {
        Self::new(BatchOptions::default())
    }

    /// Replace the statement splitter
    pub fn with_splitter(mut self, splitter: Arc<dyn StatementSplitter>) -> Self {
        self.splitter = splitter;
        self
    }

    /// Get the current options
    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Execute every script below `root`.
    ///
    /// Returns `DbExecError::Statement` for the first statement the driver
    /// rejects; nothing after it is attempted. Configuration, missing-path
    /// and traversal errors are returned before or between scripts and are
    /// never attributed to a statement.
    pub async fn run(&self, conn: &dyn Connection, root: &Path) -> Result<BatchReport> {
        let batch_start = Instant::now();
        tracing::info!(
            path = %root.display(),
            dry_run = self.options.dry_run,
            "EXECUTE operation started"
        );

        let result = self.run_scripts(conn, root, batch_start).await;

        match &result {
            Ok(report) => tracing::info!(
                files = report.file_count(),
                statements = report.statement_count(),
                affected_rows = report.total_affected_rows(),
                "Executed all queries"
            ),
            // Statement failures are logged where they happen, with the statement text
            Err(DbExecError::Statement { .. }) => {}
            Err(e) => tracing::error!(error = %e, "EXECUTE aborted"),
        }

        tracing::info!(
            elapsed_ms = batch_start.elapsed().as_millis() as u64,
            "EXECUTE operation ended"
        );
        result
    }

    async fn run_scripts(
        &self,
        conn: &dyn Connection,
        root: &Path,
        batch_start: Instant,
    ) -> Result<BatchReport> {
        validate_root(root)?;

        let mut report = BatchReport {
            dry_run: self.options.dry_run,
            ..BatchReport::default()
        };

        for script in discover(root)? {
            let script = script?;
            let statements = self.splitter.split(&script.contents);
            tracing::debug!(
                path = %script.path.display(),
                statements = statements.len(),
                "script loaded"
            );

            let mut file_report = FileReport {
                path: script.path,
                outcomes: Vec::with_capacity(statements.len()),
            };

            for statement in statements {
                let outcome = if self.options.dry_run {
                    tracing::info!(
                        path = %file_report.path.display(),
                        ordinal = statement.ordinal,
                        sql = %statement.sql,
                        "Planned: query not executed (dry run)"
                    );
                    StatementOutcome::planned(statement)
                } else {
                    execute_statement(conn, &file_report.path, statement).await?
                };
                file_report.outcomes.push(outcome);
            }

            report.files.push(file_report);
        }

        report.total_execution_time = batch_start.elapsed();
        Ok(report)
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Execute and commit one statement, logging the outcome
async fn execute_statement(
    conn: &dyn Connection,
    path: &Path,
    statement: Statement,
) -> Result<StatementOutcome> {
    let start = Instant::now();

    let result = match conn.execute(&statement.sql).await {
        Ok(result) => conn.commit().await.map(|_| result),
        Err(e) => Err(e),
    };

    match result {
        Ok(result) => {
            let duration = start.elapsed();
            tracing::info!(
                path = %path.display(),
                ordinal = statement.ordinal,
                affected_rows = result.affected_rows,
                elapsed_ms = duration.as_millis() as u64,
                "Success: query executed"
            );
            Ok(StatementOutcome::success(statement, result, duration))
        }
        Err(e) => {
            let message = driver_message(e);
            tracing::error!(
                path = %path.display(),
                ordinal = statement.ordinal,
                error = %message,
                statement = %statement.sql,
                "EXECUTE statement failed"
            );
            Err(DbExecError::Statement {
                message,
                statement: statement.sql,
                file: path.to_path_buf(),
                ordinal: statement.ordinal,
            })
        }
    }
}

fn driver_message(err: DbExecError) -> String {
    match err {
        DbExecError::Query(message) | DbExecError::Connection(message) => message,
        other => other.to_string(),
    }
}

/// Run a batch with default options
pub async fn run_batch(conn: &dyn Connection, root: &Path) -> Result<BatchReport> {
    BatchExecutor::with_defaults().run(conn, root).await
}
