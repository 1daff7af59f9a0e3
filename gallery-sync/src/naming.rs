//! Collision-free image names: `<prefix><index:05>.<ext>`.
//!
//! Indices form one namespace across extensions, so `image00002.png` blocks
//! index 2 for `.jpg` too. Allocation always takes the lowest free index, so
//! a deleted image leaves a gap that the next upload fills.

use std::collections::BTreeSet;

use gallery_core::StoredName;

#[derive(Debug, Clone)]
pub struct NameAllocator {
    prefix: String,
    used: BTreeSet<u64>,
}

impl NameAllocator {
    /// Seed the allocator from the names currently in the image directory.
    /// Names outside the `<prefix><digits>.<ext>` convention are ignored.
    pub fn new<'a>(prefix: impl Into<String>, existing: impl IntoIterator<Item = &'a str>) -> Self {
        let prefix = prefix.into();
        let used = existing
            .into_iter()
            .filter_map(|name| parse_index(&prefix, name))
            .collect();
        Self { prefix, used }
    }

    /// Reserve and return the lowest free name. The index counts as used from
    /// this point on, whether or not the caller manages to write the blob.
    pub fn allocate(&mut self, ext: &str) -> StoredName {
        let mut index = 1;
        while self.used.contains(&index) {
            index += 1;
        }
        self.used.insert(index);
        StoredName(format!("{}{index:05}.{ext}", self.prefix))
    }
}

/// Index encoded in `name`, if it follows the `<prefix><digits>.<ext>`
/// convention.
pub fn parse_index(prefix: &str, name: &str) -> Option<u64> {
    let rest = name.strip_prefix(prefix)?;
    let (digits, ext) = rest.split_once('.')?;
    if digits.is_empty() || ext.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
