//! # gallery-sync
//!
//! Feed-to-store reconciliation and manifest emission.
//!
//! Call [`pipeline::run`] to ingest new feed attachments into a store and
//! refresh its manifest, or [`manifest::write_manifest`] to only regenerate
//! the manifest.

pub mod cursor;
pub mod error;
pub mod manifest;
pub mod naming;
pub mod pipeline;
pub mod reconciler;
pub mod registry;

pub use error::SyncError;
pub use manifest::ManifestOutcome;
pub use pipeline::SyncReport;
pub use reconciler::{BlobOutcome, DeleteOutcome, ReconcileOptions, Reconciler, RunSummary};
pub use registry::DedupRegistry;
