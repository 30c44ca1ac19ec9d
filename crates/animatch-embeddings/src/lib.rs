//! # animatch-embeddings
//!
//! Turns character images into persisted embeddings and checks new
//! embeddings against the existing population:
//! - [`preprocess`]: crop/resize/standardize into `NCHW` tensors
//! - [`ImageEncoder`]: model seam; ONNX sessions behind the `ort` feature,
//!   a deterministic SHA-256 mock otherwise
//! - [`VectorExtractor`]: L2 normalization and fixed-precision rounding,
//!   facial vectors best-effort
//! - [`DuplicateDetector`]: exclusive cosine-threshold search

#![deny(unsafe_code)]

pub mod config;
pub mod duplicates;
pub mod encoder;
pub mod errors;
pub mod extractor;
pub mod normalize;
#[cfg(feature = "ort")]
pub mod ort_service;
pub mod preprocess;

pub use config::ExtractorConfig;
pub use duplicates::{DuplicateCandidate, DuplicateDetector, DuplicatePair, PopulationEntry};
pub use encoder::{ImageEncoder, MockImageEncoder};
pub use errors::{EmbeddingError, Result};
pub use extractor::{ExtractedVectors, VectorExtractor};
