//! Batch script execution module
//!
//! Runs every statement of every discovered script in order, committing
//! after each one, and stops for good at the first failure.

mod executor;

pub use executor::{
    BatchExecutor, BatchOptions, BatchReport, FileReport, StatementOutcome, StatementStatus,
    run_batch,
};
