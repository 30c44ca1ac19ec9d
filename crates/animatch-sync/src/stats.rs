//! Snapshot analysis: vector norms, facial coverage, and how close the
//! semantic vectors sit to each other.

use animatch_core::{CharacterRecord, Embedding, Snapshot};
use animatch_embeddings::normalize::{cosine_similarity, round_score};
use animatch_embeddings::{DuplicateDetector, DuplicatePair, PopulationEntry};
use serde::Serialize;

/// Min, max, and mean of a set of values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NormStats {
    /// Smallest norm.
    pub min: f64,
    /// Largest norm.
    pub max: f64,
    /// Mean norm.
    pub mean: f64,
}

/// Distribution of pairwise similarities.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SimilarityDistribution {
    /// Pairs measured.
    pub pairs: usize,
    /// Lowest similarity.
    pub min: f64,
    /// Highest similarity.
    pub max: f64,
    /// Mean similarity.
    pub mean: f64,
    /// Median similarity.
    pub median: f64,
}

/// One pair of records and their semantic similarity.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimilarPair {
    /// Lower-indexed record's partner id.
    pub first_id: i64,
    /// Its canonical name.
    pub first_name: String,
    /// Other record's partner id.
    pub second_id: i64,
    /// Its canonical name.
    pub second_name: String,
    /// Rounded cosine similarity.
    pub similarity: f64,
}

/// Full report for `animatch stats`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SnapshotStats {
    /// Records in the snapshot.
    pub records: usize,
    /// Shared embedding dimension.
    pub dimension: usize,
    /// Records carrying a facial vector.
    pub with_facial: usize,
    /// Semantic vector norms.
    pub semantic_norms: Option<NormStats>,
    /// Facial vector norms.
    pub facial_norms: Option<NormStats>,
    /// Pairwise semantic similarity, when there are at least two records.
    pub similarity: Option<SimilarityDistribution>,
    /// The most similar pairs, highest first.
    pub top_pairs: Vec<SimilarPair>,
    /// Every pair above the duplicate threshold.
    pub cross_matches: Vec<DuplicatePair>,
}

impl SnapshotStats {
    /// Fraction of records with a facial vector.
    pub fn facial_coverage(&self) -> f64 {
        if self.records == 0 {
            0.0
        } else {
            self.with_facial as f64 / self.records as f64
        }
    }
}

fn norm_stats<'a>(vectors: impl Iterator<Item = &'a Embedding>) -> Option<NormStats> {
    let norms: Vec<f64> = vectors.map(Embedding::norm).collect();
    if norms.is_empty() {
        return None;
    }
    Some(NormStats {
        min: norms.iter().copied().fold(f64::INFINITY, f64::min),
        max: norms.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean: norms.iter().sum::<f64>() / norms.len() as f64,
    })
}

fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Analyze `snapshot`, listing the `top` most similar pairs.
pub fn analyze(snapshot: &Snapshot, detector: &DuplicateDetector, precision: u32, top: usize) -> SnapshotStats {
    let records = snapshot.records();

    let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
    for (i, a) in records.iter().enumerate() {
        for (j, b) in records.iter().enumerate().skip(i + 1) {
            if a.semantic_embedding.len() == b.semantic_embedding.len() {
                let sim = cosine_similarity(a.semantic_embedding.as_slice(), b.semantic_embedding.as_slice());
                pairs.push((i, j, sim));
            }
        }
    }

    let similarity = (!pairs.is_empty()).then(|| {
        let mut values: Vec<f64> = pairs.iter().map(|(_, _, s)| *s).collect();
        values.sort_by(f64::total_cmp);
        SimilarityDistribution {
            pairs: values.len(),
            min: round_score(values[0], precision),
            max: round_score(values[values.len() - 1], precision),
            mean: round_score(values.iter().sum::<f64>() / values.len() as f64, precision),
            median: round_score(median(&values), precision),
        }
    });

    pairs.sort_by(|x, y| y.2.total_cmp(&x.2).then(x.0.cmp(&y.0)).then(x.1.cmp(&y.1)));
    let top_pairs = pairs
        .iter()
        .take(top)
        .map(|&(i, j, sim)| SimilarPair {
            first_id: records[i].key(),
            first_name: records[i].key_name().to_string(),
            second_id: records[j].key(),
            second_name: records[j].key_name().to_string(),
            similarity: round_score(sim, precision),
        })
        .collect();

    let population: Vec<PopulationEntry<'_>> = records
        .iter()
        .map(|r| PopulationEntry {
            id: r.key(),
            name: r.key_name(),
            embedding: &r.semantic_embedding,
        })
        .collect();

    SnapshotStats {
        records: records.len(),
        dimension: snapshot.embedding_dimension(),
        with_facial: records.iter().filter(|r| r.facial_embedding.is_some()).count(),
        semantic_norms: norm_stats(records.iter().map(|r| &r.semantic_embedding)),
        facial_norms: norm_stats(records.iter().filter_map(|r| r.facial_embedding.as_ref())),
        similarity,
        top_pairs,
        cross_matches: detector.find_cross_matches(&population),
    }
}

fn write_norms(f: &mut std::fmt::Formatter<'_>, label: &str, norms: Option<&NormStats>) -> std::fmt::Result {
    match norms {
        Some(n) => writeln!(f, "{label} norms: min={:.6} max={:.6} mean={:.6}", n.min, n.max, n.mean),
        None => writeln!(f, "{label} norms: none"),
    }
}

impl std::fmt::Display for SnapshotStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "records={} dimension={}", self.records, self.dimension)?;
        writeln!(
            f,
            "facial coverage: {}/{} ({:.1}%)",
            self.with_facial,
            self.records,
            self.facial_coverage() * 100.0
        )?;
        write_norms(f, "semantic", self.semantic_norms.as_ref())?;
        write_norms(f, "facial", self.facial_norms.as_ref())?;
        if let Some(d) = &self.similarity {
            writeln!(
                f,
                "similarity over {} pairs: min={:.4} max={:.4} mean={:.4} median={:.4}",
                d.pairs, d.min, d.max, d.mean, d.median
            )?;
        }
        if !self.top_pairs.is_empty() {
            writeln!(f, "most similar:")?;
            for p in &self.top_pairs {
                writeln!(
                    f,
                    "  {:.4}  #{} {} / #{} {}",
                    p.similarity, p.first_id, p.first_name, p.second_id, p.second_name
                )?;
            }
        }
        write!(f, "cross matches above threshold: {}", self.cross_matches.len())?;
        for m in &self.cross_matches {
            write!(
                f,
                "\n  {:.4}  #{} {} / #{} {}",
                m.similarity, m.first.id, m.first.name, m.second.id, m.second.name
            )?;
        }
        Ok(())
    }
}

/// Records without a facial vector, for coverage follow-up.
pub fn missing_facial(snapshot: &Snapshot) -> Vec<&CharacterRecord> {
    snapshot
        .records()
        .iter()
        .filter(|r| r.facial_embedding.is_none())
        .collect()
}
