//! dbexec Drivers - Database driver implementations
//!
//! This crate provides concrete implementations of the driver traits defined
//! in `dbexec-core`, selected through cargo features.

#[cfg(feature = "mysql")]
pub use dbexec_driver_mysql as mysql;
#[cfg(feature = "sqlite")]
pub use dbexec_driver_sqlite as sqlite;

mod registry;

pub use registry::DriverRegistry;

/// Re-export commonly used types from dbexec-core
pub use dbexec_core::{
    Connection, ConnectionConfig, ConnectionManager, DatabaseDriver, DbExecError, Result,
    StatementResult,
};
