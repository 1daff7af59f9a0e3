//! Error types for gallery-renderer.

use thiserror::Error;

/// All errors that can arise from template rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// JSON serialization error (quoting entries).
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
