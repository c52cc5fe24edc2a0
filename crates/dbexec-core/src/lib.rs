//! dbexec Core - connection and driver abstractions
//!
//! This crate provides the traits and types every other dbexec crate
//! depends on:
//!
//! - `DatabaseDriver` - Trait for database driver implementations
//! - `Connection` - Trait for a single live database session
//! - `ConnectionManager` - Validated, logged connect requests
//! - `DbExecError` - The error kinds surfaced to operators

mod connection;
mod driver;
mod error;
mod manager;
mod types;

pub use connection::*;
pub use driver::*;
pub use error::*;
pub use manager::*;
pub use types::*;
