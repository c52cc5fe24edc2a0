//! Error types for dbexec

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for dbexec operations
#[derive(Error, Debug)]
pub enum DbExecError {
    /// Authentication, network or unknown-database failure while connecting
    #[error("Connection error: {0}")]
    Connection(String),

    /// Missing or malformed operator input
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The driver rejected one statement of a batch
    #[error("Statement {ordinal} of '{}' failed: {message} : {statement}", .file.display())]
    Statement {
        /// Driver message
        message: String,
        /// The offending statement text
        statement: String,
        /// Script the statement came from
        file: PathBuf,
        /// 1-based position of the statement within its script
        ordinal: usize,
    },

    #[error("Backup error: {0}")]
    Backup(String),

    /// The run log could not be created or written
    #[error("Log error: {0}")]
    Log(String),

    /// Driver-level execution failure, before it is attributed to a statement
    #[error("Query error: {0}")]
    Query(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl DbExecError {
    /// Whether the error was raised before any database interaction happened
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::NotFound(_))
    }
}

/// Result type alias for dbexec operations
pub type Result<T> = std::result::Result<T, DbExecError>;
