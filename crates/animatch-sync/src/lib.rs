//! # animatch-sync
//!
//! Orchestration on top of the store and embedding crates:
//! - [`fetch`]: image retrieval (HTTP with cache, or local path)
//! - [`pipeline`]: the concurrent extract, duplicate-gate, reconcile, and
//!   persist run, plus metadata-only export
//! - [`creation`]: batch insertion of new character pairs
//! - [`stats`]: snapshot analysis
//!
//! The `animatch` binary wires these to a CLI.

#![deny(unsafe_code)]

pub mod creation;
pub mod errors;
pub mod fetch;
pub mod pipeline;
pub mod stats;

pub use creation::{CreatedCharacter, create_batch, read_batch};
pub use errors::{Result, SyncError};
pub use fetch::{ImageFetcher, ImageLoader};
pub use pipeline::{
    DuplicateReport, PipelineConfig, RunSummary, SkipStage, SkippedCharacter, SyncOptions,
    SyncPipeline, export,
};
pub use stats::{SnapshotStats, analyze};
