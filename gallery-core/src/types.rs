//! Domain types shared by the feed reader, the object stores and the
//! reconciler.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Lowercase hex SHA-256 digest of an attachment's bytes. Used as the dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Bare filename of a blob in the image directory, e.g. `image00042.jpg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredName(pub String);

impl fmt::Display for StoredName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for StoredName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StoredName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque version marker handed out by an object store.
///
/// Writes conditioned on a token fail with a conflict once the remote state
/// has moved on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeToken(pub String);

impl fmt::Display for ChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ChangeToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChangeToken {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// Reference to one binary attachment of a feed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    /// Transport-specific identifier used to resolve the payload.
    pub remote_id: String,
    /// Original filename, when the sender attached the image as a document.
    pub file_name: Option<String>,
}

impl AttachmentRef {
    pub fn new(remote_id: impl Into<String>) -> Self {
        Self {
            remote_id: remote_id.into(),
            file_name: None,
        }
    }

    /// Lowercased extension of [`Self::file_name`], if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name.as_deref()?;
        let (_, ext) = name.rsplit_once('.')?;
        if ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// One message pulled from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// Monotonically increasing position of the message in the feed.
    pub cursor_id: u64,
    pub attachments: Vec<AttachmentRef>,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// A listing entry for one blob in a store directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    /// Bare filename.
    pub name: String,
    /// Full store path (`<dir>/<name>`).
    pub path: String,
    pub change_token: ChangeToken,
}

/// Outcome of reading a versioned value from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Versioned<T> {
    Found { value: T, token: ChangeToken },
    Absent,
}

impl<T> Versioned<T> {
    /// The change token to condition the next write on, if the value exists.
    pub fn token(&self) -> Option<&ChangeToken> {
        match self {
            Versioned::Found { token, .. } => Some(token),
            Versioned::Absent => None,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Versioned::Found { value, .. } => Some(value),
            Versioned::Absent => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Versioned<U> {
        match self {
            Versioned::Found { value, token } => Versioned::Found {
                value: f(value),
                token,
            },
            Versioned::Absent => Versioned::Absent,
        }
    }
}

/// Join a store directory and a filename with `/`, tolerating a trailing slash
/// or an empty directory.
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_extension_is_lowercased() {
        let mut att = AttachmentRef::new("abc");
        assert_eq!(att.extension(), None);
        att.file_name = Some("Holiday.PNG".into());
        assert_eq!(att.extension().as_deref(), Some("png"));
        att.file_name = Some("noext".into());
        assert_eq!(att.extension(), None);
        att.file_name = Some("trailing.".into());
        assert_eq!(att.extension(), None);
    }

    #[test]
    fn versioned_token_and_map() {
        let found = Versioned::Found {
            value: 3u64,
            token: ChangeToken::from("t1"),
        };
        assert_eq!(found.token(), Some(&ChangeToken::from("t1")));
        assert_eq!(found.map(|v| v * 2).value(), Some(&6));
        let absent: Versioned<u64> = Versioned::Absent;
        assert!(absent.token().is_none());
    }

    #[test]
    fn join_path_handles_empty_and_trailing_slash() {
        assert_eq!(join_path("images", "a.jpg"), "images/a.jpg");
        assert_eq!(join_path("images/", "a.jpg"), "images/a.jpg");
        assert_eq!(join_path("", "manifest.js"), "manifest.js");
    }
}
