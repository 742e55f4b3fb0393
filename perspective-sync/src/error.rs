//! Error types for perspective-sync.

use std::path::PathBuf;

use thiserror::Error;

use perspective_core::{StateError, TranslateError};

/// All errors that can arise from the sync pipeline.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Import or export rejected the input.
    #[error("translation error: {0}")]
    Translate(#[from] TranslateError),

    /// Config or snapshot could not be read or written.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON error in the hash store or a payload being diffed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
