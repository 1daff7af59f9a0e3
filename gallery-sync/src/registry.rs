//! Dedup registry: content fingerprint → stored image name.
//!
//! Persists a `RegistryFile` JSON document at `<state_dir>/image_hashes.json`.
//! Entries keep document order on load and insertion order on save, so the
//! file diffs cleanly from one run to the next.
//!
//! Earlier deployments wrote a flat `{"<fingerprint>": "<name>"}` map; it is
//! still accepted and migrates to the structured form on the next save.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use gallery_core::{ChangeToken, Fingerprint, Layout, ObjectStore, StoredName, Versioned};

use crate::error::{json_err, SyncError};

/// Insertion-ordered fingerprint → name map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupRegistry {
    entries: Vec<(Fingerprint, StoredName)>,
    index: HashMap<Fingerprint, usize>,
}

impl DedupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, fp: &Fingerprint) -> Option<&StoredName> {
        self.index.get(fp).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, fp: &Fingerprint) -> bool {
        self.index.contains_key(fp)
    }

    /// Insert or overwrite. An overwritten key keeps its original position.
    /// Returns the previous name, if any.
    pub fn insert(&mut self, fp: Fingerprint, name: StoredName) -> Option<StoredName> {
        match self.index.get(&fp) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, name)),
            None => {
                self.index.insert(fp.clone(), self.entries.len());
                self.entries.push((fp, name));
                None
            }
        }
    }

    /// Keep only entries for which `keep` returns true. Returns how many were
    /// removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&Fingerprint, &StoredName) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(fp, name)| keep(fp, name));
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (fp, _))| (fp.clone(), i))
            .collect();
        before - self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Fingerprint, &StoredName)> {
        self.entries.iter().map(|(fp, name)| (fp, name))
    }
}

impl Serialize for DedupRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (fp, name) in &self.entries {
            map.serialize_entry(fp, name)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DedupRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RegistryVisitor;

        impl<'de> Visitor<'de> for RegistryVisitor {
            type Value = DedupRegistry;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of content fingerprints to image names")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut registry = DedupRegistry::new();
                while let Some((fp, name)) = access.next_entry::<Fingerprint, StoredName>()? {
                    registry.insert(fp, name);
                }
                Ok(registry)
            }
        }

        deserializer.deserialize_map(RegistryVisitor)
    }
}

/// On-disk registry payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryFile {
    pub updated_at: DateTime<Utc>,
    pub images: DedupRegistry,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RegistryCompat {
    Structured(RegistryStructuredCompat),
    Legacy(DedupRegistry),
}

#[derive(Debug, Deserialize)]
struct RegistryStructuredCompat {
    pub updated_at: Option<DateTime<Utc>>,
    pub images: DedupRegistry,
}

/// Decode a registry document in either format.
pub fn parse(bytes: &[u8], path: &str) -> Result<RegistryFile, SyncError> {
    match serde_json::from_slice::<RegistryCompat>(bytes).map_err(|e| json_err(path, e))? {
        RegistryCompat::Structured(file) => Ok(RegistryFile {
            updated_at: file.updated_at.unwrap_or_else(Utc::now),
            images: file.images,
        }),
        RegistryCompat::Legacy(images) => Ok(RegistryFile {
            updated_at: Utc::now(),
            images,
        }),
    }
}

/// Load the registry. A missing file means no content has been stored yet.
pub fn load<S: ObjectStore + ?Sized>(
    store: &S,
    layout: &Layout,
) -> Result<Versioned<RegistryFile>, SyncError> {
    let path = layout.registry_path();
    match store.read(&path)? {
        Versioned::Absent => Ok(Versioned::Absent),
        Versioned::Found { value, token } => Ok(Versioned::Found {
            value: parse(&value, &path)?,
            token,
        }),
    }
}

/// Persist `images`, conditioned on `token` (create when `None`).
pub fn save<S: ObjectStore + ?Sized>(
    store: &S,
    layout: &Layout,
    images: &DedupRegistry,
    token: Option<&ChangeToken>,
) -> Result<ChangeToken, SyncError> {
    let path = layout.registry_path();
    let file = RegistryFile {
        updated_at: Utc::now(),
        images: images.clone(),
    };
    let mut json = serde_json::to_string_pretty(&file).map_err(|e| json_err(&path, e))?;
    json.push('\n');
    let token = store.put(&path, json.as_bytes(), token, "Update image hash registry")?;
    tracing::info!("saved dedup registry ({} entries)", images.len());
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(s: &str) -> Fingerprint {
        Fingerprint::from(s)
    }

    fn name(s: &str) -> StoredName {
        StoredName::from(s)
    }

    #[test]
    fn insert_overwrite_keeps_position() {
        let mut r = DedupRegistry::new();
        assert!(r.insert(fp("b"), name("image00001.jpg")).is_none());
        r.insert(fp("a"), name("image00002.jpg"));
        let prev = r.insert(fp("b"), name("image00003.jpg"));
        assert_eq!(prev, Some(name("image00001.jpg")));
        let keys: Vec<_> = r.iter().map(|(k, _)| k.0.as_str()).collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(r.get(&fp("b")), Some(&name("image00003.jpg")));
    }

    #[test]
    fn serialization_preserves_insertion_order() {
        let mut r = DedupRegistry::new();
        r.insert(fp("zz"), name("image00001.jpg"));
        r.insert(fp("aa"), name("image00002.jpg"));
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"zz":"image00001.jpg","aa":"image00002.jpg"}"#);
    }

    #[test]
    fn retain_rebuilds_index() {
        let mut r = DedupRegistry::new();
        r.insert(fp("a"), name("1.jpg"));
        r.insert(fp("b"), name("2.jpg"));
        r.insert(fp("c"), name("3.jpg"));
        assert_eq!(r.retain(|_, n| n.0 != "2.jpg"), 1);
        assert!(!r.contains(&fp("b")));
        assert_eq!(r.get(&fp("c")), Some(&name("3.jpg")));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn parse_structured_document_keeps_order() {
        let doc = br#"{
            "updated_at": "2024-05-01T10:00:00Z",
            "images": {"ff": "image00001.jpg", "00": "image00002.jpg"}
        }"#;
        let file = parse(doc, "p").unwrap();
        let keys: Vec<_> = file.images.iter().map(|(k, _)| k.0.clone()).collect();
        assert_eq!(keys, ["ff", "00"]);
        assert_eq!(file.updated_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn parse_legacy_flat_map_migrates_to_structured_file() {
        let doc = br#"{"deadbeef": "image00001.jpg", "cafebabe": "image00002.jpg"}"#;
        let before = Utc::now();
        let file = parse(doc, "p").unwrap();
        let after = Utc::now();
        assert_eq!(file.images.get(&fp("deadbeef")), Some(&name("image00001.jpg")));
        assert_eq!(file.images.len(), 2);
        assert!(file.updated_at >= before && file.updated_at <= after);
    }

    #[test]
    fn parse_empty_legacy_map() {
        assert!(parse(b"{}", "p").unwrap().images.is_empty());
    }

    #[test]
    fn parse_structured_without_updated_at_sets_timestamp() {
        let file = parse(br#"{"images": {"a": "image00001.jpg"}}"#, "p").unwrap();
        assert_eq!(file.images.len(), 1);
    }

    #[test]
    fn parse_rejects_non_map_documents() {
        let err = parse(b"[1,2,3]", ".state/image_hashes.json").unwrap_err();
        assert!(matches!(err, SyncError::Json { .. }), "got: {err}");
        assert!(err.to_string().contains("image_hashes.json"));
    }
}
