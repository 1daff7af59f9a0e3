//! `gallery sync`: ingest new feed attachments and refresh the manifest.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use gallery_feed::TelegramFeed;
use gallery_sync::{
    pipeline, BlobOutcome, DeleteOutcome, ManifestOutcome, ReconcileOptions, SyncReport,
};

use super::{dry_run_prefix, load_config};

/// Arguments for `gallery sync`.
#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Config file (default: ~/.gallery/config.yaml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Delete stored images whose content is no longer known upstream.
    #[arg(long)]
    pub prune: bool,

    /// Show what would change without writing to the store.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config(self.config.as_deref())?;
        let feed = TelegramFeed::from_config(&config.feed).context("could not set up the feed")?;
        let store =
            gallery_store::from_config(&config.store).context("could not set up the store")?;
        let opts = ReconcileOptions {
            prune_orphans: self.prune || config.prune_orphans,
            dry_run: self.dry_run,
        };

        let report = pipeline::run(&feed, store.as_ref(), &config.layout, opts).map_err(|e| {
            let hint = if e.is_retryable() {
                "sync failed (transient; safe to rerun)"
            } else if e.is_conflict() {
                "sync failed: the store changed underneath this run"
            } else {
                "sync failed"
            };
            anyhow::Error::new(e).context(hint)
        })?;

        print_report(&report, self.dry_run);
        Ok(())
    }
}

fn print_report(report: &SyncReport, dry_run: bool) {
    let prefix = dry_run_prefix(dry_run);
    let run = &report.run;
    let cursor = match (run.cursor_before, run.cursor_after) {
        (Some(a), Some(b)) if a != b => format!("cursor {a} → {b}"),
        (None, Some(b)) => format!("cursor → {b}"),
        (_, Some(b)) => format!("cursor {b}"),
        (_, None) => "no cursor yet".to_string(),
    };

    if run.items_seen == 0 {
        println!("{prefix}{} nothing new ({cursor})", "✓".green().bold());
    } else {
        println!(
            "{prefix}{} {} message(s): {} added, {} duplicate, {} deleted ({cursor})",
            "✓".green().bold(),
            run.items_seen,
            run.added(),
            run.duplicates(),
            run.deleted(),
        );
    }

    for blob in &run.blobs {
        match blob {
            BlobOutcome::Added { name, cursor_id } => println!("  ✎  {name}  (#{cursor_id})"),
            BlobOutcome::WouldAdd { name, cursor_id } => println!("  ~  {name}  (#{cursor_id})"),
            BlobOutcome::Duplicate { name, cursor_id } => {
                println!("  ·  {name}  (#{cursor_id}, duplicate)")
            }
        }
    }
    for deletion in &run.deletions {
        match deletion {
            DeleteOutcome::Deleted { name } => println!("  {}  {name}", "✗".red()),
            DeleteOutcome::WouldDelete { name } => println!("  ~  {name}  (would delete)"),
        }
    }
    if run.forgotten > 0 {
        println!("  ·  {} stale registry entries dropped", run.forgotten);
    }

    print_manifest(&report.manifest, dry_run);
}

pub(crate) fn print_manifest(outcome: &ManifestOutcome, dry_run: bool) {
    let prefix = dry_run_prefix(dry_run);
    match outcome {
        ManifestOutcome::Written { entries } => {
            println!("{prefix}{} manifest updated ({entries} images)", "✓".green().bold())
        }
        ManifestOutcome::WouldWrite { entries } => {
            println!("{prefix}~ manifest would be updated ({entries} images)")
        }
        ManifestOutcome::Unchanged { entries } => {
            println!("{prefix}· manifest unchanged ({entries} images)")
        }
    }
}
