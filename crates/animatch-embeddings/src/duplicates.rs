//! Near-duplicate detection over semantic embeddings.
//!
//! Reports are advisory: the caller decides what to do with candidates.

use animatch_core::Embedding;
use animatch_core::constants::{DUPLICATE_THRESHOLD, SIMILARITY_PRECISION};
use animatch_settings::DuplicateSettings;
use serde::Serialize;

use crate::normalize::{cosine_similarity, round_score};

/// One member of the comparison population.
#[derive(Clone, Copy, Debug)]
pub struct PopulationEntry<'a> {
    /// Owning character identifier.
    pub id: i64,
    /// Owning character display name.
    pub name: &'a str,
    /// Its semantic embedding.
    pub embedding: &'a Embedding,
}

/// An existing character too similar to the candidate.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DuplicateCandidate {
    /// Existing character identifier.
    pub id: i64,
    /// Existing character display name.
    pub name: String,
    /// Cosine similarity, rounded.
    pub similarity: f64,
}

/// A pair of population members above the threshold.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DuplicatePair {
    /// First member (lower population index).
    pub first: DuplicateCandidate,
    /// Second member.
    pub second: DuplicateCandidate,
    /// Cosine similarity, rounded.
    pub similarity: f64,
}

/// Threshold-based cosine similarity checker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DuplicateDetector {
    threshold: f64,
    precision: u32,
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(DUPLICATE_THRESHOLD, SIMILARITY_PRECISION)
    }
}

impl DuplicateDetector {
    /// Detector with an exclusive `threshold` reporting scores to `precision`.
    pub fn new(threshold: f64, precision: u32) -> Self {
        Self {
            threshold,
            precision,
        }
    }

    /// Create from settings.
    pub fn from_settings(s: &DuplicateSettings) -> Self {
        Self::new(s.threshold, s.score_precision)
    }

    /// Configured threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether `similarity` counts as a duplicate (strictly greater).
    pub fn exceeds(&self, similarity: f64) -> bool {
        similarity > self.threshold
    }

    /// All population entries whose similarity to `candidate` exceeds the
    /// threshold, most similar first, ties broken by ascending id.
    ///
    /// Entries whose dimension differs from the candidate are skipped.
    pub fn find<'a>(
        &self,
        candidate: &Embedding,
        population: impl IntoIterator<Item = PopulationEntry<'a>>,
    ) -> Vec<DuplicateCandidate> {
        let mut found: Vec<DuplicateCandidate> = population
            .into_iter()
            .filter(|entry| entry.embedding.len() == candidate.len())
            .filter_map(|entry| {
                let similarity = cosine_similarity(candidate.as_slice(), entry.embedding.as_slice());
                self.exceeds(similarity).then(|| DuplicateCandidate {
                    id: entry.id,
                    name: entry.name.to_string(),
                    similarity: round_score(similarity, self.precision),
                })
            })
            .collect();
        sort_candidates(&mut found);
        found
    }

    /// Every pair within `population` above the threshold.
    pub fn find_cross_matches(&self, population: &[PopulationEntry<'_>]) -> Vec<DuplicatePair> {
        let mut pairs = Vec::new();
        for (i, a) in population.iter().enumerate() {
            for b in &population[i + 1..] {
                if a.embedding.len() != b.embedding.len() {
                    continue;
                }
                let similarity = cosine_similarity(a.embedding.as_slice(), b.embedding.as_slice());
                if self.exceeds(similarity) {
                    let rounded = round_score(similarity, self.precision);
                    pairs.push(DuplicatePair {
                        first: DuplicateCandidate {
                            id: a.id,
                            name: a.name.to_string(),
                            similarity: rounded,
                        },
                        second: DuplicateCandidate {
                            id: b.id,
                            name: b.name.to_string(),
                            similarity: rounded,
                        },
                        similarity: rounded,
                    });
                }
            }
        }
        pairs.sort_by(|x, y| {
            y.similarity
                .total_cmp(&x.similarity)
                .then(x.first.id.cmp(&y.first.id))
                .then(x.second.id.cmp(&y.second.id))
        });
        pairs
    }
}

fn sort_candidates(candidates: &mut [DuplicateCandidate]) {
    candidates.sort_by(|a, b| b.similarity.total_cmp(&a.similarity).then(a.id.cmp(&b.id)));
}
