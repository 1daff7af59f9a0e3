//! Gallery core library: domain types, collaborator traits, errors, config.
//!
//! - [`types`]: newtypes, feed items, store entries
//! - [`traits`]: [`FeedSource`] and [`ObjectStore`]
//! - [`error`]: [`FeedError`], [`StoreError`], [`ConfigError`]
//! - [`config`]: YAML config loading
//! - [`fingerprint`]: content hasher
//! - [`natural`]: natural-order filename comparison

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod natural;
pub mod traits;
pub mod types;

pub use config::{Config, Layout, StoreConfig};
pub use error::{ConfigError, FeedError, StoreError};
pub use fingerprint::fingerprint;
pub use natural::{natural_cmp, natural_cmp_total};
pub use traits::{FeedSource, ObjectStore};
pub use types::{
    AttachmentRef, ChangeToken, FeedItem, Fingerprint, StoreEntry, StoredName, Versioned,
};
