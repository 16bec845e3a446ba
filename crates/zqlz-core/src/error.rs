//! Error types for ZQLZ

use std::sync::Arc;
use thiserror::Error;

/// Core error type for ZQLZ operations.
///
/// Cloneable so one failed query can be reported to every caller that was
/// waiting on it.
#[derive(Error, Debug, Clone)]
pub enum ZqlzError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl ZqlzError {
    /// Whether the error means the session itself could not be obtained or used,
    /// as opposed to a statement failing on a healthy session.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            ZqlzError::Connection(_) | ZqlzError::Io(_) | ZqlzError::Timeout(_)
        )
    }
}

impl From<std::io::Error> for ZqlzError {
    fn from(err: std::io::Error) -> Self {
        ZqlzError::Io(Arc::new(err))
    }
}

/// Result type alias for ZQLZ operations
pub type Result<T> = std::result::Result<T, ZqlzError>;
