//! Image encoder trait and mock implementation.

use std::sync::atomic::{AtomicBool, Ordering};

use animatch_core::EmbeddingKind;
use image::RgbImage;
use sha2::{Digest, Sha256};

use crate::errors::{EmbeddingError, Result};

/// A loaded model that turns a decoded image into a raw vector.
///
/// Implementations are loaded once per run and shared read-only across
/// concurrent extraction calls. Output is not yet normalized or rounded.
pub trait ImageEncoder: Send + Sync {
    /// Which vector this encoder produces.
    fn kind(&self) -> EmbeddingKind;

    /// Output vector length.
    fn dimensions(&self) -> usize;

    /// Preprocess and run inference on one image.
    fn encode(&self, image: &RgbImage) -> Result<Vec<f32>>;
}

/// Mock encoder for tests and offline runs.
///
/// Generates deterministic vectors by hashing the pixel buffer with SHA-256,
/// using the hash bytes as seeds for the vector components. Identical images
/// therefore produce identical vectors.
pub struct MockImageEncoder {
    kind: EmbeddingKind,
    dims: usize,
    failing: AtomicBool,
}

impl MockImageEncoder {
    /// Create a mock encoder of the given kind and dimensions.
    pub fn new(kind: EmbeddingKind, dims: usize) -> Self {
        Self {
            kind,
            dims,
            failing: AtomicBool::new(false),
        }
    }

    /// Make subsequent `encode` calls fail with an inference error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn hash_to_vector(&self, image: &RgbImage) -> Vec<f32> {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.as_str().as_bytes());
        hasher.update(image.width().to_le_bytes());
        hasher.update(image.height().to_le_bytes());
        hasher.update(image.as_raw());
        let hash = hasher.finalize();

        (0..self.dims)
            .map(|i| {
                let byte = hash[i % hash.len()];
                let salt = (i / hash.len()) as u8;
                // Map byte to [-1, 1] range
                (f32::from(byte.wrapping_add(salt.wrapping_mul(37))) / 127.5) - 1.0
            })
            .collect()
    }
}

impl ImageEncoder for MockImageEncoder {
    fn kind(&self) -> EmbeddingKind {
        self.kind
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn encode(&self, image: &RgbImage) -> Result<Vec<f32>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Inference(format!(
                "mock {} encoder set to fail",
                self.kind
            )));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(EmbeddingError::EmptyImage {
                width: image.width(),
                height: image.height(),
            });
        }
        Ok(self.hash_to_vector(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn img(rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(8, 8, Rgb(rgb))
    }

    #[test]
    fn mock_returns_correct_dims() {
        let enc = MockImageEncoder::new(EmbeddingKind::Semantic, 512);
        assert_eq!(enc.encode(&img([1, 2, 3])).unwrap().len(), 512);
        assert_eq!(enc.dimensions(), 512);
        assert_eq!(enc.kind(), EmbeddingKind::Semantic);
    }

    #[test]
    fn mock_deterministic_same_input() {
        let enc = MockImageEncoder::new(EmbeddingKind::Semantic, 64);
        assert_eq!(enc.encode(&img([9, 9, 9])).unwrap(), enc.encode(&img([9, 9, 9])).unwrap());
    }

    #[test]
    fn mock_different_inputs_different_outputs() {
        let enc = MockImageEncoder::new(EmbeddingKind::Semantic, 64);
        assert_ne!(enc.encode(&img([1, 1, 1])).unwrap(), enc.encode(&img([2, 2, 2])).unwrap());
    }

    #[test]
    fn mock_kinds_differ_for_same_image() {
        let semantic = MockImageEncoder::new(EmbeddingKind::Semantic, 64);
        let facial = MockImageEncoder::new(EmbeddingKind::Facial, 64);
        assert_ne!(semantic.encode(&img([5, 5, 5])).unwrap(), facial.encode(&img([5, 5, 5])).unwrap());
    }

    #[test]
    fn mock_failing_returns_error() {
        let enc = MockImageEncoder::new(EmbeddingKind::Facial, 64);
        enc.set_failing(true);
        assert!(matches!(enc.encode(&img([0, 0, 0])), Err(EmbeddingError::Inference(_))));
        enc.set_failing(false);
        assert!(enc.encode(&img([0, 0, 0])).is_ok());
    }

    #[test]
    fn mock_rejects_empty_image() {
        let enc = MockImageEncoder::new(EmbeddingKind::Facial, 64);
        assert!(matches!(
            enc.encode(&RgbImage::new(0, 0)),
            Err(EmbeddingError::EmptyImage { .. })
        ));
    }
}
