//! Gallery: mirror photos posted to a Telegram chat into a static-site
//! image store.
//!
//! # Usage
//!
//! ```text
//! gallery [sync] [--config <path>] [--prune] [--dry-run]
//! gallery manifest [--config <path>] [--dir <path>] [--dry-run]
//! ```
//!
//! Configuration lives in `~/.gallery/config.yaml` unless `--config` is
//! given. Log verbosity follows `RUST_LOG` (default `info`).

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{manifest::ManifestArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "gallery",
    version,
    about = "Copy new Telegram photos into a gallery store and refresh its manifest",
    long_about = None,
)]
struct Cli {
    /// Defaults to `sync`.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest new feed attachments, then regenerate the manifest.
    Sync(SyncArgs),

    /// Regenerate the manifest from the current image listing only.
    Manifest(ManifestArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Sync(args)) => args.run(),
        Some(Commands::Manifest(args)) => args.run(),
        None => SyncArgs::default().run(),
    }
}

/// Route library `log` records and our own events to stderr.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
