//! Shared sync pipeline entrypoint: reconcile, then refresh the manifest.

use gallery_core::{FeedSource, Layout, ObjectStore};

use crate::manifest::{self, ManifestOutcome, PendingChanges};
use crate::reconciler::{ReconcileOptions, Reconciler, RunSummary};
use crate::SyncError;

/// Everything one `gallery sync` did.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub run: RunSummary,
    pub manifest: ManifestOutcome,
}

/// Run the full pipeline against `store`.
///
/// The manifest is regenerated on every run, so it also picks up images that
/// reached the store by other means; an unchanged manifest is not rewritten.
/// Under `dry_run` the manifest reflects the planned additions and deletions.
pub fn run<F, S>(
    feed: &F,
    store: &S,
    layout: &Layout,
    opts: ReconcileOptions,
) -> Result<SyncReport, SyncError>
where
    F: FeedSource + ?Sized,
    S: ObjectStore + ?Sized,
{
    let run = Reconciler::new(feed, store, layout).run(opts)?;
    let pending = PendingChanges::from_run(&run);
    let manifest = manifest::write_manifest_with(store, layout, opts.dry_run, &pending)?;
    Ok(SyncReport { run, manifest })
}
