//! Failures while loading encoders or turning an image into vectors.
//!
//! A failed semantic extraction skips one character; a failed facial
//! extraction only means the facial vector is absent. Neither stops a batch.

use animatch_core::EmbeddingKind;
use thiserror::Error;

/// Errors from extraction and model loading.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// An encoder could not be loaded or downloaded.
    #[error("cannot load encoder: {0}")]
    ModelInit(String),

    /// The encoder ran but produced no usable output.
    #[error("encoder run failed: {0}")]
    Inference(String),

    /// Image could not be decoded or transformed.
    #[error("image decode/transform: {0}")]
    Image(#[from] image::ImageError),

    /// Image has no pixels to crop or resize.
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },

    /// Encoder output length differs from the configured dimension.
    #[error("{kind} encoder returned {actual} components, expected {expected}")]
    Dimension {
        /// Which encoder.
        kind: EmbeddingKind,
        /// Configured dimension.
        expected: usize,
        /// Observed length.
        actual: usize,
    },

    /// Encoder output has zero or non-finite norm and cannot be normalized.
    #[error("{kind} embedding has a degenerate norm")]
    DegenerateNorm {
        /// Which encoder.
        kind: EmbeddingKind,
    },

    /// Model settings point at nothing usable.
    #[error("model settings: {0}")]
    Config(String),
}

/// Extraction result.
pub type Result<T, E = EmbeddingError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let cases = [
            (
                EmbeddingError::ModelInit("ort failed".into()),
                "cannot load encoder: ort failed",
            ),
            (
                EmbeddingError::Inference("bad shape".into()),
                "encoder run failed: bad shape",
            ),
            (
                EmbeddingError::EmptyImage {
                    width: 0,
                    height: 10,
                },
                "image has no pixels (0x10)",
            ),
            (
                EmbeddingError::Dimension {
                    kind: EmbeddingKind::Facial,
                    expected: 512,
                    actual: 128,
                },
                "facial encoder returned 128 components, expected 512",
            ),
            (
                EmbeddingError::DegenerateNorm {
                    kind: EmbeddingKind::Semantic,
                },
                "semantic embedding has a degenerate norm",
            ),
            (
                EmbeddingError::Config("missing model".into()),
                "model settings: missing model",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(format!("{err}"), expected);
        }
    }

    #[test]
    fn crosses_threads() {
        fn crosses<T: Send + Sync + 'static>() {}
        crosses::<EmbeddingError>();
    }
}
