//! Seams to the two external collaborators: the message feed and the
//! versioned object store.

use crate::error::{FeedError, StoreError};
use crate::types::{AttachmentRef, ChangeToken, FeedItem, StoreEntry, Versioned};

/// An append-only message feed.
pub trait FeedSource {
    /// Items with `cursor_id > since`, in ascending `cursor_id` order.
    /// `None` returns everything the feed still holds.
    fn poll(&self, since: Option<u64>) -> Result<Vec<FeedItem>, FeedError>;

    /// Resolve and download the payload of one attachment.
    fn fetch(&self, attachment: &AttachmentRef) -> Result<Vec<u8>, FeedError>;
}

/// A remote blob store addressed by path, with optimistic concurrency on
/// every mutation.
///
/// `message` is a human-readable description of the change; stores backed by
/// version control record it as the commit message.
pub trait ObjectStore {
    /// Files directly under `dir`. A missing directory lists as empty.
    fn list(&self, dir: &str) -> Result<Vec<StoreEntry>, StoreError>;

    fn read(&self, path: &str) -> Result<Versioned<Vec<u8>>, StoreError>;

    /// Create a new blob. Fails with [`StoreError::Conflict`] if `path` exists.
    fn create(&self, path: &str, bytes: &[u8], message: &str) -> Result<ChangeToken, StoreError>;

    /// Replace a blob. Fails with [`StoreError::Conflict`] if `token` is stale.
    fn update(
        &self,
        path: &str,
        bytes: &[u8],
        token: &ChangeToken,
        message: &str,
    ) -> Result<ChangeToken, StoreError>;

    fn delete(&self, path: &str, token: &ChangeToken, message: &str) -> Result<(), StoreError>;

    /// Create when `token` is `None`, update otherwise.
    fn put(
        &self,
        path: &str,
        bytes: &[u8],
        token: Option<&ChangeToken>,
        message: &str,
    ) -> Result<ChangeToken, StoreError> {
        match token {
            Some(token) => self.update(path, bytes, token, message),
            None => self.create(path, bytes, message),
        }
    }
}
