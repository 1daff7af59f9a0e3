//! # gallery-store
//!
//! [`ObjectStore`](gallery_core::ObjectStore) adapters.
//!
//! - [`GitHubStore`]: a branch of a GitHub repository via the contents API;
//!   the blob `sha` is the change token and every mutation is a commit.
//! - [`LocalStore`]: a directory on disk; the change token is the SHA-256 of
//!   the file content.

pub mod github;
pub mod local;

pub use github::GitHubStore;
pub use local::LocalStore;

use gallery_core::{config::StoreConfig, ConfigError, ObjectStore};

/// Build the store described by `config`.
pub fn from_config(config: &StoreConfig) -> Result<Box<dyn ObjectStore>, ConfigError> {
    match config {
        StoreConfig::Github(gh) => Ok(Box::new(GitHubStore::from_config(gh)?)),
        StoreConfig::Local(local) => Ok(Box::new(LocalStore::new(&local.root))),
    }
}
