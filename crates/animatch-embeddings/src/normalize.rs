//! Finalizing raw encoder output and comparing embeddings.

use animatch_core::{Embedding, EmbeddingKind, round_component};

use crate::errors::{EmbeddingError, Result};

/// Cosine similarity accumulated in `f64`.
///
/// Both inputs are renormalized, so slightly non-unit vectors (after
/// rounding) still compare correctly. The result is exactly symmetric.
/// Returns 0.0 when either vector has zero norm.
///
/// # Panics
///
/// Panics if the vectors have different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    assert_eq!(a.len(), b.len(), "vectors must have equal dimensions");
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Round a score to `precision` decimal places.
pub fn round_score(score: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    (score * scale).round() / scale
}

/// Turn raw encoder output into a persisted embedding: L2-normalize, then
/// round every component to `precision` decimals.
///
/// Zero, `NaN`, and infinite norms are rejected rather than normalized.
pub fn finalize(raw: &[f32], kind: EmbeddingKind, precision: u32) -> Result<Embedding> {
    let norm = raw
        .iter()
        .map(|x| f64::from(*x) * f64::from(*x))
        .sum::<f64>()
        .sqrt();
    if !norm.is_finite() || norm == 0.0 {
        return Err(EmbeddingError::DegenerateNorm { kind });
    }
    let components = raw
        .iter()
        .map(|x| round_component((f64::from(*x) / norm) as f32, precision))
        .collect();
    Ok(Embedding::from_components(components))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn cosine_identical_is_one() {
        let v = vec![0.6, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cosine_orthogonal_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn cosine_tolerates_non_unit_input() {
        let a = [2.0, 0.0];
        let b = [0.99, 0.141];
        let expected = 0.99 / (0.99f64.powi(2) + 0.141f64.powi(2)).sqrt();
        assert!((cosine_similarity(&a, &b) - expected).abs() < 1e-6);
    }

    #[test]
    fn round_score_four_places() {
        assert_eq!(round_score(0.987_654, 4), 0.9877);
        assert_eq!(round_score(1.0, 4), 1.0);
    }

    #[test]
    fn finalize_normalizes_and_rounds() {
        let e = finalize(&[3.0, 4.0], EmbeddingKind::Semantic, 6).unwrap();
        assert_eq!(e.as_slice(), &[0.6, 0.8]);

        let e = finalize(&[1.0, 1.0, 1.0], EmbeddingKind::Semantic, 6).unwrap();
        assert_eq!(e.as_slice()[0], 0.57735);
        assert!((e.norm() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn finalize_rejects_degenerate() {
        assert_matches!(
            finalize(&[0.0, 0.0], EmbeddingKind::Facial, 6),
            Err(EmbeddingError::DegenerateNorm {
                kind: EmbeddingKind::Facial
            })
        );
        assert_matches!(
            finalize(&[f32::NAN, 1.0], EmbeddingKind::Semantic, 6),
            Err(EmbeddingError::DegenerateNorm { .. })
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn finalize_produces_unit(v in proptest::collection::vec(-100.0f32..100.0, 8..512)) {
                prop_assume!(v.iter().any(|x| x.abs() > 1e-3));
                let e = finalize(&v, EmbeddingKind::Semantic, 6).unwrap();
                prop_assert!((e.norm() - 1.0).abs() < 1e-4);
            }

            #[test]
            fn finalize_is_stable_on_rounded_input(v in proptest::collection::vec(-100.0f32..100.0, 8..64)) {
                prop_assume!(v.iter().any(|x| x.abs() > 1e-3));
                let once = finalize(&v, EmbeddingKind::Semantic, 6).unwrap();
                for x in once.as_slice() {
                    prop_assert_eq!(round_component(*x, 6), *x);
                }
            }

            #[test]
            fn cosine_is_exactly_symmetric(
                a in proptest::collection::vec(-1.0f32..1.0, 16),
                b in proptest::collection::vec(-1.0f32..1.0, 16),
            ) {
                prop_assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
            }

            #[test]
            fn cosine_self_is_one(v in proptest::collection::vec(-1.0f32..1.0, 16)) {
                prop_assume!(v.iter().any(|x| x.abs() > 1e-3));
                prop_assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
            }
        }
    }
}
