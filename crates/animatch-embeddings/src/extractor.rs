//! Vector extraction: raw encoder output to persisted embeddings.

use std::sync::Arc;

use animatch_core::{Embedding, EmbeddingKind};
use image::RgbImage;
use tracing::{debug, warn};

use crate::config::ExtractorConfig;
use crate::encoder::ImageEncoder;
use crate::errors::{EmbeddingError, Result};
use crate::normalize::finalize;

/// Both vectors derived from one image.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractedVectors {
    /// Mandatory semantic vector.
    pub semantic: Embedding,
    /// Facial vector, `None` when the face network produced nothing usable.
    pub facial: Option<Embedding>,
}

/// Runs the encoders and finalizes their output.
///
/// The semantic encoder is required. The facial encoder is optional and
/// best-effort: any failure yields an absent facial vector, never an error.
#[derive(Clone)]
pub struct VectorExtractor {
    semantic: Arc<dyn ImageEncoder>,
    facial: Option<Arc<dyn ImageEncoder>>,
    config: ExtractorConfig,
}

impl std::fmt::Debug for VectorExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorExtractor")
            .field("has_facial", &self.facial.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl VectorExtractor {
    /// Build an extractor from loaded encoders.
    ///
    /// A semantic encoder whose output length differs from
    /// `config.dimensions` is an error. A mismatched facial encoder is
    /// dropped and facial vectors stay absent.
    pub fn new(
        semantic: Arc<dyn ImageEncoder>,
        facial: Option<Arc<dyn ImageEncoder>>,
        config: ExtractorConfig,
    ) -> Result<Self> {
        if semantic.dimensions() != config.dimensions {
            return Err(EmbeddingError::Dimension {
                kind: semantic.kind(),
                expected: config.dimensions,
                actual: semantic.dimensions(),
            });
        }
        let facial = facial.filter(|encoder| {
            let fits = encoder.dimensions() == config.dimensions;
            if !fits {
                warn!(
                    expected = config.dimensions,
                    actual = encoder.dimensions(),
                    "facial encoder dimension mismatch, facial vectors disabled"
                );
            }
            fits
        });
        Ok(Self {
            semantic,
            facial,
            config,
        })
    }

    /// Whether a facial encoder is loaded.
    pub fn has_facial(&self) -> bool {
        self.facial.is_some()
    }

    fn run(&self, encoder: &dyn ImageEncoder, image: &RgbImage) -> Result<Embedding> {
        let kind = encoder.kind();
        let raw = encoder.encode(image)?;
        if raw.len() != self.config.dimensions {
            return Err(EmbeddingError::Dimension {
                kind,
                expected: self.config.dimensions,
                actual: raw.len(),
            });
        }
        finalize(&raw, kind, self.config.precision)
    }

    /// Semantic vector for `image`. Failure is fatal to the character.
    pub fn semantic(&self, image: &RgbImage) -> Result<Embedding> {
        self.run(self.semantic.as_ref(), image)
    }

    /// Facial vector for `image`, or `None` when unavailable.
    pub fn facial(&self, image: &RgbImage) -> Option<Embedding> {
        let encoder = self.facial.as_deref()?;
        match self.run(encoder, image) {
            Ok(embedding) => Some(embedding),
            Err(error) => {
                warn!(%error, "facial embedding unavailable");
                None
            }
        }
    }

    /// Vector of the requested kind, or `None` ("no result").
    pub fn extract_kind(&self, image: &RgbImage, kind: EmbeddingKind) -> Option<Embedding> {
        match kind {
            EmbeddingKind::Semantic => self
                .semantic(image)
                .inspect_err(|error| warn!(%error, "semantic embedding failed"))
                .ok(),
            EmbeddingKind::Facial => self.facial(image),
        }
    }

    /// Both vectors for `image`.
    pub fn extract(&self, image: &RgbImage) -> Result<ExtractedVectors> {
        let semantic = self.semantic(image)?;
        let facial = self.facial(image);
        debug!(
            width = image.width(),
            height = image.height(),
            facial = facial.is_some(),
            "extracted vectors"
        );
        Ok(ExtractedVectors { semantic, facial })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::MockImageEncoder;
    use assert_matches::assert_matches;
    use image::Rgb;

    fn config(dims: usize) -> ExtractorConfig {
        ExtractorConfig {
            dimensions: dims,
            ..ExtractorConfig::default()
        }
    }

    fn image() -> RgbImage {
        RgbImage::from_pixel(16, 12, Rgb([40, 80, 120]))
    }

    #[test]
    fn extract_produces_unit_vectors() {
        let semantic = Arc::new(MockImageEncoder::new(EmbeddingKind::Semantic, 64));
        let facial = Arc::new(MockImageEncoder::new(EmbeddingKind::Facial, 64));
        let extractor = VectorExtractor::new(semantic, Some(facial), config(64)).unwrap();

        let v = extractor.extract(&image()).unwrap();
        assert_eq!(v.semantic.len(), 64);
        assert!(v.semantic.validate(64).is_ok());
        let facial = v.facial.unwrap();
        assert!(facial.validate(64).is_ok());
        assert_ne!(facial, v.semantic);
    }

    #[test]
    fn facial_failure_degrades_to_absent() {
        let semantic = Arc::new(MockImageEncoder::new(EmbeddingKind::Semantic, 32));
        let facial = Arc::new(MockImageEncoder::new(EmbeddingKind::Facial, 32));
        facial.set_failing(true);
        let extractor = VectorExtractor::new(semantic, Some(facial), config(32)).unwrap();

        let v = extractor.extract(&image()).unwrap();
        assert!(v.facial.is_none());
        assert!(extractor.extract_kind(&image(), EmbeddingKind::Facial).is_none());
    }

    #[test]
    fn missing_facial_encoder_is_absent() {
        let semantic = Arc::new(MockImageEncoder::new(EmbeddingKind::Semantic, 32));
        let extractor = VectorExtractor::new(semantic, None, config(32)).unwrap();
        assert!(!extractor.has_facial());
        assert!(extractor.extract(&image()).unwrap().facial.is_none());
    }

    #[test]
    fn semantic_failure_is_an_error() {
        let semantic = Arc::new(MockImageEncoder::new(EmbeddingKind::Semantic, 32));
        semantic.set_failing(true);
        let extractor = VectorExtractor::new(semantic, None, config(32)).unwrap();
        assert_matches!(extractor.extract(&image()), Err(EmbeddingError::Inference(_)));
        assert!(extractor.extract_kind(&image(), EmbeddingKind::Semantic).is_none());
    }

    #[test]
    fn semantic_dimension_mismatch_rejected() {
        let semantic = Arc::new(MockImageEncoder::new(EmbeddingKind::Semantic, 16));
        assert_matches!(
            VectorExtractor::new(semantic, None, config(32)),
            Err(EmbeddingError::Dimension {
                kind: EmbeddingKind::Semantic,
                expected: 32,
                actual: 16,
            })
        );
    }

    #[test]
    fn mismatched_facial_encoder_is_dropped() {
        let semantic = Arc::new(MockImageEncoder::new(EmbeddingKind::Semantic, 32));
        let facial = Arc::new(MockImageEncoder::new(EmbeddingKind::Facial, 128));
        let extractor = VectorExtractor::new(semantic, Some(facial), config(32)).unwrap();
        assert!(!extractor.has_facial());
        assert!(extractor.extract(&image()).unwrap().facial.is_none());
    }

    #[test]
    fn components_are_rounded() {
        let semantic = Arc::new(MockImageEncoder::new(EmbeddingKind::Semantic, 32));
        let extractor = VectorExtractor::new(semantic, None, config(32)).unwrap();
        let v = extractor.semantic(&image()).unwrap();
        for x in v.as_slice() {
            assert_eq!(animatch_core::round_component(*x, 6), *x);
        }
    }
}
