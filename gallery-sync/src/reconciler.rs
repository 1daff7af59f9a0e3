//! Store reconciler: copies new feed attachments into the store.
//!
//! ## Run protocol
//!
//! 1. Load the cursor and the dedup registry (absent ⇒ start / empty).
//! 2. Poll the feed past the cursor. Nothing new ⇒ go to 6.
//! 3. List the image directory once to seed name allocation.
//! 4. Per item, per attachment: fetch → fingerprint → skip if registered,
//!    else allocate a name, create the blob, register it. The cursor moves to
//!    an item only once all of its attachments are stored.
//! 5. Optionally prune orphans: stored images whose content is neither in
//!    this run's batch nor in the registry.
//! 6. Save registry and cursor, each only if it changed.
//!
//! A failure in 4 or 5 aborts the run. Progress that is already safe (the
//! registry, the cursor at the last complete item) is still saved before the
//! error is returned.

use std::collections::HashSet;

use gallery_core::config::PHOTO_EXTENSION;
use gallery_core::types::join_path;
use gallery_core::{
    fingerprint, ChangeToken, FeedItem, FeedSource, Fingerprint, Layout, ObjectStore, StoreEntry,
    StoredName, Versioned,
};

use crate::cursor;
use crate::error::SyncError;
use crate::naming::NameAllocator;
use crate::registry::{self, DedupRegistry};

// ---------------------------------------------------------------------------
// Options and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Delete stored images no longer known upstream. Irreversible.
    pub prune_orphans: bool,
    /// Compute everything, mutate nothing.
    pub dry_run: bool,
}

/// What happened to one attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobOutcome {
    /// Stored under a newly allocated name.
    Added { name: StoredName, cursor_id: u64 },
    /// `--dry-run`: would have been stored under `name`.
    WouldAdd { name: StoredName, cursor_id: u64 },
    /// Content already stored as `name`.
    Duplicate { name: StoredName, cursor_id: u64 },
}

/// What happened to one orphaned image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted { name: String },
    WouldDelete { name: String },
}

/// Summary of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cursor_before: Option<u64>,
    pub cursor_after: Option<u64>,
    pub items_seen: usize,
    pub blobs: Vec<BlobOutcome>,
    pub deletions: Vec<DeleteOutcome>,
    /// Registry entries dropped because their image is gone from the store.
    pub forgotten: usize,
    pub registry_saved: bool,
    pub cursor_saved: bool,
}

impl RunSummary {
    pub fn added(&self) -> usize {
        self.blobs
            .iter()
            .filter(|b| matches!(b, BlobOutcome::Added { .. } | BlobOutcome::WouldAdd { .. }))
            .count()
    }

    pub fn duplicates(&self) -> usize {
        self.blobs
            .iter()
            .filter(|b| matches!(b, BlobOutcome::Duplicate { .. }))
            .count()
    }

    pub fn deleted(&self) -> usize {
        self.deletions.len()
    }

    /// True when the run changed nothing in the store.
    pub fn is_noop(&self) -> bool {
        self.added() == 0 && self.deletions.is_empty() && !self.registry_saved && !self.cursor_saved
    }
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

struct RunState {
    cursor_loaded: Option<u64>,
    cursor: Option<u64>,
    cursor_token: Option<ChangeToken>,
    registry: DedupRegistry,
    registry_token: Option<ChangeToken>,
    registry_dirty: bool,
    /// Fingerprints seen in this run's batch.
    live: HashSet<Fingerprint>,
    /// Whether any blob was created, making the first listing stale.
    wrote: bool,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct Reconciler<'a, F: ?Sized, S: ?Sized> {
    feed: &'a F,
    store: &'a S,
    layout: &'a Layout,
}

impl<'a, F, S> Reconciler<'a, F, S>
where
    F: FeedSource + ?Sized,
    S: ObjectStore + ?Sized,
{
    pub fn new(feed: &'a F, store: &'a S, layout: &'a Layout) -> Self {
        Self {
            feed,
            store,
            layout,
        }
    }

    pub fn run(&self, opts: ReconcileOptions) -> Result<RunSummary, SyncError> {
        // Step 1: load persisted state.
        let cursor_doc = cursor::load(self.store, self.layout)?;
        let registry_doc = registry::load(self.store, self.layout)?;
        let cursor_loaded = cursor_doc.value().copied();
        let (registry, registry_token) = match registry_doc {
            Versioned::Found { value, token } => (value.images, Some(token)),
            Versioned::Absent => (DedupRegistry::new(), None),
        };
        let mut state = RunState {
            cursor_loaded,
            cursor: cursor_loaded,
            cursor_token: cursor_doc.token().cloned(),
            registry,
            registry_token,
            registry_dirty: false,
            live: HashSet::new(),
            wrote: false,
        };
        let mut summary = RunSummary {
            cursor_before: cursor_loaded,
            ..RunSummary::default()
        };

        // Step 2: poll.
        let items = self.feed.poll(state.cursor)?;
        summary.items_seen = items.len();
        if items.is_empty() {
            tracing::info!("feed has nothing new");
        } else if let Err(err) = self.reconcile_batch(&items, &mut state, &mut summary, opts) {
            if !opts.dry_run {
                self.persist_after_failure(&mut state, &mut summary);
            }
            return Err(err);
        }

        // Step 6: persist what changed.
        if !opts.dry_run {
            self.persist(&mut state, &mut summary)?;
        }
        summary.cursor_after = state.cursor;
        Ok(summary)
    }

    fn reconcile_batch(
        &self,
        items: &[FeedItem],
        state: &mut RunState,
        summary: &mut RunSummary,
        opts: ReconcileOptions,
    ) -> Result<(), SyncError> {
        // Step 3: one listing seeds the allocator.
        let listing = self.store.list(&self.layout.image_dir)?;
        let mut names = NameAllocator::new(
            self.layout.name_prefix.as_str(),
            listing.iter().map(|e| e.name.as_str()),
        );

        // Step 4: ingest in feed order.
        for item in items {
            self.ingest_item(item, state, &mut names, summary, opts)?;
            // Every attachment of `item` is stored; commit the position.
            if state.cursor.map_or(true, |c| item.cursor_id > c) {
                state.cursor = Some(item.cursor_id);
            }
            summary.cursor_after = state.cursor;
        }

        // Step 5: orphans.
        if opts.prune_orphans {
            let listing = if state.wrote {
                self.store.list(&self.layout.image_dir)?
            } else {
                listing
            };
            self.prune(&listing, state, summary, opts)?;
        }
        Ok(())
    }

    fn ingest_item(
        &self,
        item: &FeedItem,
        state: &mut RunState,
        names: &mut NameAllocator,
        summary: &mut RunSummary,
        opts: ReconcileOptions,
    ) -> Result<(), SyncError> {
        for attachment in &item.attachments {
            let bytes = self.feed.fetch(attachment)?;
            let fp = fingerprint(&bytes);
            state.live.insert(fp.clone());

            if let Some(existing) = state.registry.get(&fp) {
                tracing::debug!("{} duplicates {existing}; skipping", attachment.remote_id);
                summary.blobs.push(BlobOutcome::Duplicate {
                    name: existing.clone(),
                    cursor_id: item.cursor_id,
                });
                continue;
            }

            let ext = attachment
                .extension()
                .filter(|ext| self.layout.accepts_extension(ext))
                .unwrap_or_else(|| PHOTO_EXTENSION.to_string());
            let name = names.allocate(&ext);
            let path = join_path(&self.layout.image_dir, &name.0);

            if opts.dry_run {
                tracing::info!("[dry-run] would add: {path}");
                summary.blobs.push(BlobOutcome::WouldAdd {
                    name: name.clone(),
                    cursor_id: item.cursor_id,
                });
            } else {
                self.store.create(&path, &bytes, &format!("Add {name}"))?;
                state.wrote = true;
                tracing::info!("added: {path}");
                summary.blobs.push(BlobOutcome::Added {
                    name: name.clone(),
                    cursor_id: item.cursor_id,
                });
            }

            state.registry.insert(fp, name);
            state.registry_dirty = true;
        }
        Ok(())
    }

    fn prune(
        &self,
        listing: &[StoreEntry],
        state: &mut RunState,
        summary: &mut RunSummary,
        opts: ReconcileOptions,
    ) -> Result<(), SyncError> {
        // Images added by this run count as present even when the listing
        // predates them (dry runs never write them).
        let mut remaining: HashSet<String> = summary
            .blobs
            .iter()
            .filter_map(|b| match b {
                BlobOutcome::Added { name, .. } | BlobOutcome::WouldAdd { name, .. } => {
                    Some(name.0.clone())
                }
                BlobOutcome::Duplicate { .. } => None,
            })
            .collect();

        for entry in listing {
            if !self.layout.accepts(&entry.name) {
                continue;
            }
            // Read immediately before deleting so the token is fresh.
            let (bytes, token) = match self.store.read(&entry.path)? {
                Versioned::Found { value, token } => (value, token),
                Versioned::Absent => continue,
            };

            let fp = fingerprint(&bytes);
            if state.live.contains(&fp) || state.registry.contains(&fp) {
                remaining.insert(entry.name.clone());
                continue;
            }

            if opts.dry_run {
                tracing::info!("[dry-run] would delete orphan: {}", entry.path);
                summary.deletions.push(DeleteOutcome::WouldDelete {
                    name: entry.name.clone(),
                });
            } else {
                self.store
                    .delete(&entry.path, &token, &format!("Remove {}", entry.name))?;
                tracing::info!("deleted orphan: {}", entry.path);
                summary.deletions.push(DeleteOutcome::Deleted {
                    name: entry.name.clone(),
                });
            }
        }

        // Entries pointing at images that no longer exist would block that
        // content from ever being stored again.
        let forgotten = state.registry.retain(|_, name| remaining.contains(&name.0));
        if forgotten > 0 {
            tracing::info!("dropped {forgotten} registry entries for missing images");
            state.registry_dirty = true;
            summary.forgotten = forgotten;
        }
        Ok(())
    }

    fn persist(&self, state: &mut RunState, summary: &mut RunSummary) -> Result<(), SyncError> {
        // Registry before cursor: if the cursor write is lost, the next run
        // re-polls the same items and the registry dedups them.
        if state.registry_dirty {
            let token = registry::save(
                self.store,
                self.layout,
                &state.registry,
                state.registry_token.as_ref(),
            )?;
            state.registry_token = Some(token);
            state.registry_dirty = false;
            summary.registry_saved = true;
        }
        if let Some(value) = state.cursor {
            if state.cursor != state.cursor_loaded {
                let token = cursor::save(self.store, self.layout, value, state.cursor_token.as_ref())?;
                state.cursor_token = Some(token);
                state.cursor_loaded = state.cursor;
                summary.cursor_saved = true;
            }
        }
        Ok(())
    }

    fn persist_after_failure(&self, state: &mut RunState, summary: &mut RunSummary) {
        if let Err(err) = self.persist(state, summary) {
            tracing::warn!("could not save partial progress: {err}");
        }
        summary.cursor_after = state.cursor;
    }
}
