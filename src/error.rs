//! Error taxonomy for the indexing and retrieval engine.
//!
//! The split matters for propagation policy: `Load` and `Scan` are file-level
//! errors that a sync run isolates and records, while `Provider` and
//! `Repository` are batch-level errors that fail the run, because a partial
//! embedding or storage failure leaves the whole batch's outcome unknown.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input to a repository or service operation, rejected
    /// before any I/O.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A file could not be stat'd or walked during a scan.
    #[error("cannot scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file's content could not be loaded or parsed into text segments.
    #[error("cannot load {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// Embedding provider failure (quota, auth, network, malformed response).
    #[error("embedding provider error: {0}")]
    Provider(String),

    /// Underlying vector store failure on read or write. The batch in
    /// progress is failed wholesale; no partial recovery is attempted here.
    #[error("vector store error: {0}")]
    Repository(#[from] sqlx::Error),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        EngineError::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        EngineError::Provider(msg.into())
    }
}
