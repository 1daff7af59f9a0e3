//! Manifest builder: the `manifest.js` listing read by the front end.
//!
//! Accepted images only, filename only, natural order descending so the
//! newest indices come first. The text is a pure function of the listing.

use gallery_core::{natural_cmp_total, Layout, ObjectStore};
use gallery_renderer::ManifestRenderer;

use crate::error::SyncError;
use crate::reconciler::{BlobOutcome, DeleteOutcome, RunSummary};

/// Outcome of writing the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestOutcome {
    Written { entries: usize },
    /// Content already matches the listing; no write.
    Unchanged { entries: usize },
    /// `--dry-run`: the manifest would have been rewritten.
    WouldWrite { entries: usize },
}

impl ManifestOutcome {
    pub fn entries(&self) -> usize {
        match self {
            ManifestOutcome::Written { entries }
            | ManifestOutcome::Unchanged { entries }
            | ManifestOutcome::WouldWrite { entries } => *entries,
        }
    }
}

/// Image changes a dry run planned but did not make. Folded into the listing
/// so the reported manifest matches what a real run would write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChanges {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl PendingChanges {
    /// The `WouldAdd` / `WouldDelete` outcomes of `run`; empty for real runs.
    pub fn from_run(run: &RunSummary) -> Self {
        let added = run
            .blobs
            .iter()
            .filter_map(|blob| match blob {
                BlobOutcome::WouldAdd { name, .. } => Some(name.0.clone()),
                _ => None,
            })
            .collect();
        let removed = run
            .deletions
            .iter()
            .filter_map(|deletion| match deletion {
                DeleteOutcome::WouldDelete { name } => Some(name.clone()),
                DeleteOutcome::Deleted { .. } => None,
            })
            .collect();
        Self { added, removed }
    }

    fn apply(&self, mut names: Vec<String>) -> Vec<String> {
        names.retain(|name| !self.removed.contains(name));
        for name in &self.added {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// Accepted names from `names`, natural order descending.
pub fn order_entries<'a>(names: impl IntoIterator<Item = &'a str>, layout: &Layout) -> Vec<String> {
    let mut entries: Vec<String> = names
        .into_iter()
        .filter(|name| layout.accepts(name))
        .map(str::to_string)
        .collect();
    entries.sort_by(|a, b| natural_cmp_total(b, a));
    entries
}

/// Render the manifest text for a set of stored names.
pub fn build_manifest<'a>(
    renderer: &ManifestRenderer,
    names: impl IntoIterator<Item = &'a str>,
    layout: &Layout,
) -> Result<String, SyncError> {
    Ok(renderer.render(&order_entries(names, layout))?)
}

/// Regenerate the manifest from the store's image directory and write it if
/// it changed, conditioned on the token read just before.
pub fn write_manifest<S: ObjectStore + ?Sized>(
    store: &S,
    layout: &Layout,
    dry_run: bool,
) -> Result<ManifestOutcome, SyncError> {
    write_manifest_with(store, layout, dry_run, &PendingChanges::default())
}

/// [`write_manifest`] over the listing with `pending` applied.
pub fn write_manifest_with<S: ObjectStore + ?Sized>(
    store: &S,
    layout: &Layout,
    dry_run: bool,
    pending: &PendingChanges,
) -> Result<ManifestOutcome, SyncError> {
    let renderer = ManifestRenderer::new()?;
    let listing = store.list(&layout.image_dir)?;
    let names = pending.apply(listing.into_iter().map(|e| e.name).collect());
    let entries = order_entries(names.iter().map(String::as_str), layout);
    let text = renderer.render(&entries)?;
    let count = entries.len();

    let current = store.read(&layout.manifest_path)?;
    if current.value().map(Vec::as_slice) == Some(text.as_bytes()) {
        tracing::debug!("unchanged: {}", layout.manifest_path);
        return Ok(ManifestOutcome::Unchanged { entries: count });
    }

    if dry_run {
        tracing::info!("[dry-run] would write: {}", layout.manifest_path);
        return Ok(ManifestOutcome::WouldWrite { entries: count });
    }

    store.put(
        &layout.manifest_path,
        text.as_bytes(),
        current.token(),
        "Update manifest",
    )?;
    tracing::info!("wrote: {} ({count} images)", layout.manifest_path);
    Ok(ManifestOutcome::Written { entries: count })
}
