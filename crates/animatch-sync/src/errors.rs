//! Error types for the sync pipeline.
//!
//! Per-character failures (fetch, decode, extraction, timeout) are turned
//! into skip entries by the pipeline; only store and settings failures
//! abort a run.

use animatch_embeddings::EmbeddingError;
use animatch_settings::SettingsError;
use animatch_store::StoreError;
use thiserror::Error;

/// Errors that can occur while syncing.
#[derive(Debug, Error)]
pub enum SyncError {
    /// HTTP transport error (connect, timeout, body read).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The image server answered with a non-success status.
    #[error("{reference}: HTTP {status}")]
    Status {
        /// Image reference that was requested.
        reference: String,
        /// Response status code.
        status: u16,
    },

    /// Local file or cache error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Fetched bytes are not a decodable image.
    #[error("image decode error: {0}")]
    Decode(#[from] image::ImageError),

    /// Vector extraction failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Relational source, reconciliation, or snapshot I/O failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Settings could not be loaded.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// A blocking worker panicked or was cancelled.
    #[error("worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    /// The previous snapshot's vectors come from other model settings and
    /// cannot be carried without re-extraction.
    #[error("snapshot was built with {previous}, settings name {current}; run sync to re-extract")]
    ModelChanged {
        /// Model, tag and dimension of the previous snapshot.
        previous: String,
        /// Model, tag and dimension from settings.
        current: String,
    },

    /// Fetch plus extraction exceeded the per-task bound.
    #[error("timed out after {ms} ms")]
    Timeout {
        /// The bound that was exceeded.
        ms: u64,
    },
}

/// Convenience type alias for sync results.
pub type Result<T> = std::result::Result<T, SyncError>;
