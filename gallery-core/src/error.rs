//! Error types for gallery-core and the collaborator traits.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a [`crate::FeedSource`].
#[derive(Debug, Error)]
pub enum FeedError {
    /// Network unreachable, connection reset, or timed out.
    #[error("feed transport error: {0}")]
    Transport(String),

    /// The feed answered with a non-2xx status.
    #[error("feed returned HTTP {status} for {url}: {body}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    /// The feed answered 2xx but flagged the request as failed.
    #[error("feed API error: {0}")]
    Api(String),

    /// The payload did not have the expected shape.
    #[error("unexpected feed payload: {0}")]
    Validation(String),
}

impl FeedError {
    /// Whether a later run has a reasonable chance of succeeding unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedError::Transport(_) => true,
            FeedError::Http { status, .. } => is_transient_status(*status),
            FeedError::Api(_) | FeedError::Validation(_) => false,
        }
    }
}

/// Errors raised by an [`crate::ObjectStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store transport error: {0}")]
    Transport(String),

    #[error("store returned HTTP {status} for {url}: {body}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    /// The change token was stale, or a create hit an existing path.
    #[error("conflicting write at {path}: remote state changed since it was read")]
    Conflict { path: String },

    #[error("no blob at {path}")]
    NotFound { path: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store answered with a body we could not interpret.
    #[error("could not decode store response for {path}: {message}")]
    Decode { path: String, message: String },
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Transport(_) => true,
            StoreError::Http { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }
}

/// Convenience constructor for [`StoreError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}

/// Errors from loading the YAML configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with file path and serde_yaml line context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    #[error("environment variable {var} is not set (needed for {purpose})")]
    MissingSecret { var: String, purpose: &'static str },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}
