//! Script batch execution for dbexec
//!
//! Discovers `.sql` files under a root directory, splits each one into
//! statements on `GO` delimiter lines, and executes them one at a time
//! against an explicitly passed connection. The first failing statement
//! aborts the whole batch; statements executed before it stay committed.
//!
//! The backup module issues a single vendor-specific full backup command
//! through the same connection.

pub mod backup;
pub mod batch;
pub mod discovery;
pub mod splitter;

#[cfg(test)]
mod test_helpers;

pub use backup::{BackupReport, BackupRequest, backup, backup_file_name};
pub use batch::{
    BatchExecutor, BatchOptions, BatchReport, FileReport, StatementOutcome, StatementStatus,
    run_batch,
};
pub use discovery::{ScriptFile, ScriptFiles, discover, validate_root};
pub use splitter::{GoDelimiterSplitter, Statement, StatementSplitter, split};
