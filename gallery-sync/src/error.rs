//! Error types for gallery-sync.

use thiserror::Error;

use gallery_core::{FeedError, StoreError};
use gallery_renderer::RenderError;

/// All errors that can arise from a reconciliation run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// JSON serialization/deserialization error (dedup registry).
    #[error("registry JSON error at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Persisted state that does not parse.
    #[error("invalid state at {path}: {message}")]
    Validation { path: String, message: String },
}

impl SyncError {
    /// Whether rerunning later, unchanged, may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Feed(e) => e.is_retryable(),
            SyncError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Whether the run lost an optimistic-concurrency race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, SyncError::Store(StoreError::Conflict { .. }))
    }
}

/// Convenience constructor for [`SyncError::Json`].
pub(crate) fn json_err(path: impl Into<String>, source: serde_json::Error) -> SyncError {
    SyncError::Json {
        path: path.into(),
        source,
    }
}
