//! Directory-backed object store.
//!
//! Change tokens are the SHA-256 of the current file content, so a token goes
//! stale as soon as anyone rewrites the file. Writes go to
//! `<path>.gallery.tmp` and are renamed into place.

use std::path::{Component, Path, PathBuf};

use gallery_core::error::io_err;
use gallery_core::{fingerprint, ChangeToken, ObjectStore, StoreEntry, StoreError, Versioned};

const TMP_SUFFIX: &str = ".gallery.tmp";

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a store path onto the filesystem, refusing anything that would
    /// escape the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let rel = Path::new(path);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(io_err(
                rel,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "store paths must be relative and stay inside the store root",
                ),
            ));
        }
        Ok(self.root.join(rel))
    }

    fn current_token(&self, full: &Path) -> Result<Option<ChangeToken>, StoreError> {
        match std::fs::read(full) {
            Ok(bytes) => Ok(Some(token_for(&bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(full, e)),
        }
    }

    fn write_atomic(&self, full: &Path, bytes: &[u8]) -> Result<ChangeToken, StoreError> {
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let tmp = PathBuf::from(format!("{}{TMP_SUFFIX}", full.display()));
        std::fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, full) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(full, e));
        }
        Ok(token_for(bytes))
    }
}

fn token_for(bytes: &[u8]) -> ChangeToken {
    ChangeToken(fingerprint(bytes).0)
}

impl ObjectStore for LocalStore {
    fn list(&self, dir: &str) -> Result<Vec<StoreEntry>, StoreError> {
        let full = self.resolve(dir)?;
        let read_dir = match std::fs::read_dir(&full) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(io_err(&full, e)),
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| io_err(&full, e))?;
            let is_file = entry
                .file_type()
                .map(|t| t.is_file())
                .map_err(|e| io_err(entry.path(), e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_file || name.starts_with('.') || name.ends_with(TMP_SUFFIX) {
                continue;
            }
            let bytes = std::fs::read(entry.path()).map_err(|e| io_err(entry.path(), e))?;
            entries.push(StoreEntry {
                path: gallery_core::types::join_path(dir, &name),
                name,
                change_token: token_for(&bytes),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read(&self, path: &str) -> Result<Versioned<Vec<u8>>, StoreError> {
        let full = self.resolve(path)?;
        match std::fs::read(&full) {
            Ok(bytes) => {
                let token = token_for(&bytes);
                Ok(Versioned::Found {
                    value: bytes,
                    token,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Versioned::Absent),
            Err(e) => Err(io_err(&full, e)),
        }
    }

    fn create(&self, path: &str, bytes: &[u8], message: &str) -> Result<ChangeToken, StoreError> {
        let full = self.resolve(path)?;
        if full.exists() {
            return Err(StoreError::Conflict {
                path: path.to_string(),
            });
        }
        let token = self.write_atomic(&full, bytes)?;
        tracing::debug!("{message}: created {path}");
        Ok(token)
    }

    fn update(
        &self,
        path: &str,
        bytes: &[u8],
        token: &ChangeToken,
        message: &str,
    ) -> Result<ChangeToken, StoreError> {
        let full = self.resolve(path)?;
        match self.current_token(&full)? {
            None => Err(StoreError::NotFound {
                path: path.to_string(),
            }),
            Some(current) if &current != token => Err(StoreError::Conflict {
                path: path.to_string(),
            }),
            Some(_) => {
                let token = self.write_atomic(&full, bytes)?;
                tracing::debug!("{message}: updated {path}");
                Ok(token)
            }
        }
    }

    fn delete(&self, path: &str, token: &ChangeToken, message: &str) -> Result<(), StoreError> {
        let full = self.resolve(path)?;
        match self.current_token(&full)? {
            None => Err(StoreError::NotFound {
                path: path.to_string(),
            }),
            Some(current) if &current != token => Err(StoreError::Conflict {
                path: path.to_string(),
            }),
            Some(_) => {
                std::fs::remove_file(&full).map_err(|e| io_err(&full, e))?;
                tracing::debug!("{message}: deleted {path}");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn read_missing_is_absent() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        assert_eq!(store.read(".state/cursor").unwrap(), Versioned::Absent);
    }

    #[test]
    fn create_then_read_returns_same_token() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let token = store.create("images/a.jpg", b"aaa", "Add a.jpg").unwrap();
        match store.read("images/a.jpg").unwrap() {
            Versioned::Found { value, token: read } => {
                assert_eq!(value, b"aaa");
                assert_eq!(read, token);
            }
            Versioned::Absent => panic!("expected blob"),
        }
    }

    #[test]
    fn create_on_existing_path_conflicts() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        store.create("manifest.js", b"one", "m").unwrap();
        let err = store.create("manifest.js", b"two", "m").unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }), "got: {err}");
        assert_eq!(std::fs::read(tmp.path().join("manifest.js")).unwrap(), b"one");
    }

    #[test]
    fn update_with_stale_token_conflicts() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let t1 = store.create("f", b"v1", "m").unwrap();
        let t2 = store.update("f", b"v2", &t1, "m").unwrap();
        assert_ne!(t1, t2);
        let err = store.update("f", b"v3", &t1, "m").unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }), "got: {err}");
        store.update("f", b"v3", &t2, "m").unwrap();
    }

    #[test]
    fn update_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let err = store
            .update("f", b"v", &ChangeToken::from("whatever"), "m")
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }), "got: {err}");
    }

    #[test]
    fn delete_checks_token() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let token = store.create("images/x.png", b"x", "m").unwrap();
        let err = store
            .delete("images/x.png", &ChangeToken::from("stale"), "m")
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }), "got: {err}");
        store.delete("images/x.png", &token, "m").unwrap();
        assert!(!tmp.path().join("images/x.png").exists());
    }

    #[test]
    fn list_skips_hidden_tmp_and_directories() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("images");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join(".gitkeep"), b"").unwrap();
        std::fs::write(dir.join("b.jpg"), b"b").unwrap();
        std::fs::write(dir.join("a.jpg"), b"a").unwrap();
        std::fs::write(dir.join("c.jpg.gallery.tmp"), b"c").unwrap();

        let store = LocalStore::new(tmp.path());
        let listed = store.list("images").unwrap();
        let names: Vec<_> = listed.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a.jpg", "b.jpg"]);
        assert_eq!(listed[0].path, "images/a.jpg");
        assert_eq!(listed[0].change_token, token_for(b"a"));
    }

    #[test]
    fn list_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        assert!(store.list("images").unwrap().is_empty());
    }

    #[test]
    fn paths_outside_root_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path().join("root"));
        let err = store.read("../escape").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }), "got: {err}");
        let err = store.create("/etc/passwd", b"", "m").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }), "got: {err}");
    }

    #[test]
    fn tmp_file_cleaned_up_after_write() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        store.create("manifest.js", b"x", "m").unwrap();
        assert!(!tmp.path().join("manifest.js.gallery.tmp").exists());
    }
}
