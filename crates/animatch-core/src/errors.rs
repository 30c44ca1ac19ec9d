//! Core validation errors.

use thiserror::Error;

/// Errors raised when a record or snapshot violates a structural invariant.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An embedding has the wrong number of components.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    Dimension {
        /// Dimension declared by the snapshot or model.
        expected: usize,
        /// Dimension actually found.
        actual: usize,
    },

    /// An embedding is not unit length within tolerance.
    #[error("embedding is not unit length (norm {norm:.6})")]
    NotUnitNorm {
        /// Observed L2 norm.
        norm: f64,
    },

    /// A snapshot's declared count disagrees with its record array.
    #[error("snapshot declares {declared} records but contains {actual}")]
    CountMismatch {
        /// Value of `record_count`.
        declared: usize,
        /// Length of `records`.
        actual: usize,
    },

    /// Any other invariant violation.
    #[error("validation failed: {0}")]
    Validation(String),
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
