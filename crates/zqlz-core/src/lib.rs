//! ZQLZ Core - Core abstractions shared by the metadata layer
//!
//! This crate provides the fundamental traits and types that the
//! metadata crates depend on. It defines:
//!
//! - `Connection` - The query executor an already-open session exposes
//! - `RowStream` - Forward-only cursor over query result rows
//! - `ProgressMonitor` - Caller context for cancellation and status reporting
//! - Common types like `Value`, `Row`, `QueryResult`

mod connection;
mod error;
mod monitor;
mod types;

pub use connection::*;
pub use error::*;
pub use monitor::*;
pub use types::*;
