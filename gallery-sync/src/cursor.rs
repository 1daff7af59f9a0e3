//! Cursor store: the highest feed position fully processed.
//!
//! Persisted as plain integer text at `<state_dir>/cursor`.

use gallery_core::{ChangeToken, Layout, ObjectStore, Versioned};

use crate::error::SyncError;

/// Load the cursor. A missing file means nothing has been processed yet.
pub fn load<S: ObjectStore + ?Sized>(store: &S, layout: &Layout) -> Result<Versioned<u64>, SyncError> {
    let path = layout.cursor_path();
    match store.read(&path)? {
        Versioned::Absent => Ok(Versioned::Absent),
        Versioned::Found { value, token } => Ok(Versioned::Found {
            value: parse(&value, &path)?,
            token,
        }),
    }
}

/// Persist `value`, conditioned on `token` (create when `None`).
pub fn save<S: ObjectStore + ?Sized>(
    store: &S,
    layout: &Layout,
    value: u64,
    token: Option<&ChangeToken>,
) -> Result<ChangeToken, SyncError> {
    let path = layout.cursor_path();
    let text = format!("{value}\n");
    let token = store.put(&path, text.as_bytes(), token, &format!("Advance feed cursor to {value}"))?;
    tracing::info!("cursor advanced to {value}");
    Ok(token)
}

fn parse(bytes: &[u8], path: &str) -> Result<u64, SyncError> {
    let invalid = |message: String| SyncError::Validation {
        path: path.to_string(),
        message,
    };
    let text = std::str::from_utf8(bytes).map_err(|e| invalid(e.to_string()))?;
    text.trim()
        .parse::<u64>()
        .map_err(|e| invalid(format!("cursor '{}' is not an integer: {e}", text.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tolerates_whitespace() {
        assert_eq!(parse(b"42\n", "c").unwrap(), 42);
        assert_eq!(parse(b"  7 ", "c").unwrap(), 7);
    }

    #[test]
    fn parse_rejects_garbage() {
        let cases: [&[u8]; 5] = [b"abc", b"", b"-1", b"1.5", &[0xff, 0xfe]];
        for bad in cases {
            let err = parse(bad, ".state/cursor").unwrap_err();
            assert!(matches!(err, SyncError::Validation { .. }), "got: {err}");
        }
    }
}
