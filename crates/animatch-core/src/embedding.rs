//! Fixed-length embedding vectors.
//!
//! An [`Embedding`] is stored exactly as it is persisted: components already
//! L2-normalized and rounded to a fixed number of decimal places. Rounding is
//! idempotent, so re-serializing a loaded vector never drifts.

use serde::{Deserialize, Serialize};

use crate::constants::UNIT_NORM_TOLERANCE;
use crate::errors::{CoreError, Result};

/// The two independent vectors derived from a character image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingKind {
    /// General visual likeness (image encoder).
    Semantic,
    /// Face-specific likeness (face-recognition network).
    Facial,
}

impl EmbeddingKind {
    /// Lowercase label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Facial => "facial",
        }
    }
}

impl std::fmt::Display for EmbeddingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round a single component to `precision` decimal places.
///
/// The arithmetic runs in `f64` so that rounding an already-rounded value
/// returns the identical `f32`.
pub fn round_component(x: f32, precision: u32) -> f32 {
    let scale = 10f64.powi(precision as i32);
    ((f64::from(x) * scale).round() / scale) as f32
}

/// A persisted embedding vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Wrap components as-is. Callers are expected to have normalized and
    /// rounded them already; use [`Embedding::validate`] to check.
    pub fn from_components(components: Vec<f32>) -> Self {
        Self(components)
    }

    /// Borrow the components.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Consume into the component vector.
    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector has no components.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// L2 norm accumulated in `f64`.
    pub fn norm(&self) -> f64 {
        self.0
            .iter()
            .map(|x| f64::from(*x) * f64::from(*x))
            .sum::<f64>()
            .sqrt()
    }

    /// Check dimensionality and unit length.
    pub fn validate(&self, dimension: usize) -> Result<()> {
        if self.len() != dimension {
            return Err(CoreError::Dimension {
                expected: dimension,
                actual: self.len(),
            });
        }
        let norm = self.norm();
        if !norm.is_finite() || (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
            return Err(CoreError::NotUnitNorm { norm });
        }
        Ok(())
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}
