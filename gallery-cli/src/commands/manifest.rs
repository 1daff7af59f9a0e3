//! `gallery manifest`: regenerate `manifest.js` without polling the feed.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use gallery_core::{Layout, ObjectStore};
use gallery_store::LocalStore;
use gallery_sync::manifest;

use super::{load_config, sync::print_manifest};

/// Arguments for `gallery manifest`.
#[derive(Args, Debug, Default)]
pub struct ManifestArgs {
    /// Config file (default: ~/.gallery/config.yaml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Use a local site checkout instead of the configured store. Its layout
    /// comes from `--config` when given, otherwise the defaults.
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Report whether the manifest would change without writing it.
    #[arg(long)]
    pub dry_run: bool,
}

impl ManifestArgs {
    pub fn run(self) -> Result<()> {
        let outcome = match &self.dir {
            Some(dir) => {
                let layout = match &self.config {
                    Some(path) => load_config(Some(path.as_path()))?.layout,
                    None => Layout::default(),
                };
                let images = dir.join(&layout.image_dir);
                if !images.is_dir() {
                    bail!("image directory '{}' not found", images.display());
                }
                write(&LocalStore::new(dir), &layout, self.dry_run)?
            }
            None => {
                let config = load_config(self.config.as_deref())?;
                let store = gallery_store::from_config(&config.store)
                    .context("could not set up the store")?;
                write(store.as_ref(), &config.layout, self.dry_run)?
            }
        };
        print_manifest(&outcome, self.dry_run);
        Ok(())
    }
}

fn write<S: ObjectStore + ?Sized>(
    store: &S,
    layout: &Layout,
    dry_run: bool,
) -> Result<manifest::ManifestOutcome> {
    manifest::write_manifest(store, layout, dry_run)
        .with_context(|| format!("could not regenerate {}", layout.manifest_path))
}
