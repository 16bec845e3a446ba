use thiserror::Error;
use zqlz_core::ZqlzError;

pub type MetadataResult<T> = Result<T, MetadataError>;

/// Errors surfaced while loading object metadata
#[derive(Debug, Clone, Error)]
pub enum MetadataError {
    /// The session could not be obtained or used. Passed through unchanged.
    #[error(transparent)]
    Connectivity(ZqlzError),

    #[error("Failed to load {kind} of {parent}: {source}")]
    Query {
        kind: &'static str,
        parent: String,
        #[source]
        source: ZqlzError,
    },

    #[error("Malformed {kind} row for {parent}: {message}")]
    Mapping {
        kind: &'static str,
        parent: String,
        message: String,
    },

    #[error("Metadata loading cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MetadataError {
    /// Classify an executor error raised while loading `kind` for `parent`.
    pub fn from_executor(kind: &'static str, parent: impl Into<String>, err: ZqlzError) -> Self {
        match err {
            ZqlzError::Cancelled => MetadataError::Cancelled,
            err if err.is_connectivity() => MetadataError::Connectivity(err),
            err => MetadataError::Query {
                kind,
                parent: parent.into(),
                source: err,
            },
        }
    }

    /// Whether retrying the same operation later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, MetadataError::Connectivity(_))
    }
}
