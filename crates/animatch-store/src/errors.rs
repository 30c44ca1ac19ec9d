//! Error types for the store subsystem.
//!
//! [`StoreError`] covers the relational source, reconciliation, and the
//! snapshot codec. Per-character conditions (unmatched, skipped) are not
//! errors; they are reported in [`crate::ReconcileReport`].

use animatch_core::CoreError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The character database rejected a statement.
    #[error("character database: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Snapshot or JSON column text could not be (de)serialized.
    #[error("json: {0}")]
    Serde(#[from] serde_json::Error),

    /// Filesystem error reading or writing a snapshot.
    #[error("snapshot file: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot or record violates a structural invariant.
    #[error("invalid snapshot: {0}")]
    Core(#[from] CoreError),

    /// The schema could not be brought up to date.
    #[error("schema upgrade: {message}")]
    Migration {
        /// Level and cause.
        message: String,
    },

    /// Reconciliation produced no records at all.
    #[error("no character could be matched to a semantic embedding ({unmatched} unmatched)")]
    NothingMatched {
        /// Characters in the relational source without a vector.
        unmatched: usize,
    },

    /// A character-creation request is incomplete.
    #[error("invalid character request: {0}")]
    InvalidRequest(String),
}

/// Store result.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
