pub mod manifest;
pub mod sync;

use std::path::Path;

use anyhow::{Context, Result};
use gallery_core::{config, Config};

/// Load `path`, or `~/.gallery/config.yaml` when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let loaded = match path {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    let config = loaded.context("could not load gallery configuration")?;
    tracing::debug!("configuration loaded");
    Ok(config)
}

/// `"[dry-run] "` when nothing is being written.
pub fn dry_run_prefix(dry_run: bool) -> &'static str {
    if dry_run {
        "[dry-run] "
    } else {
        ""
    }
}
