//! Store reconciliation: relational metadata + vectors into the next snapshot.
//!
//! Metadata always comes from the relational source. Vectors come from this
//! run's extractions when present, otherwise from the previous snapshot,
//! matched by partner identifier and then, for records whose identifier
//! vanished from the source, by unique canonical partner name.
//!
//! The primary image reference on a record is the one its vectors were
//! derived from. Carried-forward vectors keep the previous record's
//! reference, so a changed image whose extraction failed is planned again
//! on the next run.

use std::collections::HashMap;

use animatch_core::{CharacterRecord, Embedding, Snapshot, SnapshotHeader};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::{Result, StoreError};
use crate::source::SourceCharacter;

/// How a source character was tied to a previous record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchKind {
    /// Same partner identifier.
    Identifier,
    /// Identifier changed; canonical partner name matched.
    Name,
}

/// Lookup of previous records for the current source.
pub struct PreviousIndex<'a> {
    by_id: HashMap<i64, &'a CharacterRecord>,
    by_name: HashMap<&'a str, &'a CharacterRecord>,
}

impl<'a> PreviousIndex<'a> {
    /// Index `previous` against the characters in `source`.
    ///
    /// Name fallback only considers previous records whose identifier is
    /// absent from the source, and only names that are unique on both sides.
    pub fn new(previous: Option<&'a Snapshot>, source: &[SourceCharacter]) -> Self {
        let records = previous.map(Snapshot::records).unwrap_or_default();
        let by_id: HashMap<i64, &CharacterRecord> = records.iter().map(|r| (r.key(), r)).collect();

        let source_ids: std::collections::HashSet<i64> = source.iter().map(SourceCharacter::key).collect();
        let mut unresolved_names: HashMap<&str, usize> = HashMap::new();
        for c in source.iter().filter(|c| !by_id.contains_key(&c.key())) {
            *unresolved_names.entry(c.key_name()).or_default() += 1;
        }

        let mut orphan_names: HashMap<&'a str, Vec<&'a CharacterRecord>> = HashMap::new();
        for r in records.iter().filter(|r| !source_ids.contains(&r.key())) {
            orphan_names.entry(r.key_name()).or_default().push(r);
        }
        let by_name = orphan_names
            .into_iter()
            .filter_map(|(name, candidates)| {
                let unique = candidates.len() == 1 && unresolved_names.get(name) == Some(&1);
                if !unique && unresolved_names.contains_key(name) {
                    warn!(name, "ambiguous name fallback, not matching");
                }
                unique.then(|| (name, candidates[0]))
            })
            .collect();

        Self { by_id, by_name }
    }

    /// Previous record for `character`, if any.
    pub fn resolve(&self, character: &SourceCharacter) -> Option<(&'a CharacterRecord, MatchKind)> {
        if let Some(record) = self.by_id.get(&character.key()) {
            return Some((record, MatchKind::Identifier));
        }
        self.by_name
            .get(character.key_name())
            .map(|record| (*record, MatchKind::Name))
    }
}

/// Vectors computed in this run for one character.
#[derive(Clone, Debug, PartialEq)]
pub struct ComputedVectors {
    /// Fresh semantic vector.
    pub semantic: Embedding,
    /// Fresh facial vector, if any.
    pub facial: Option<Embedding>,
}

/// A source character left out of the snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnmatchedCharacter {
    /// Partner identifier.
    pub id: i64,
    /// Canonical partner name.
    pub name: String,
}

/// Per-run reconciliation counts.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// Characters in the relational source.
    pub source_count: usize,
    /// Records written.
    pub matched: usize,
    /// Records using vectors computed this run.
    pub refreshed: usize,
    /// Records whose vectors came from the previous snapshot.
    pub carried_forward: usize,
    /// Of `carried_forward`, how many were found by name.
    pub matched_by_name: usize,
    /// Characters with no resolvable semantic vector.
    pub unmatched: Vec<UnmatchedCharacter>,
}

/// Output of [`reconcile`].
#[derive(Clone, Debug)]
pub struct Reconciliation {
    /// The next snapshot, in source order.
    pub snapshot: Snapshot,
    /// What happened.
    pub report: ReconcileReport,
}

fn has_dimension(embedding: &Embedding, dimension: usize, id: i64, origin: &str) -> bool {
    let ok = embedding.len() == dimension;
    if !ok {
        warn!(
            character_id = id,
            origin,
            expected = dimension,
            actual = embedding.len(),
            "vector has wrong dimension, ignoring"
        );
    }
    ok
}

/// Merge `source` metadata with `computed` and `previous` vectors.
///
/// Fails with [`StoreError::NothingMatched`] if no character resolves to a
/// semantic vector.
pub fn reconcile(
    header: SnapshotHeader,
    source: Vec<SourceCharacter>,
    previous: Option<&Snapshot>,
    computed: &HashMap<i64, ComputedVectors>,
) -> Result<Reconciliation> {
    let dimension = header.embedding_dimension;
    let index = PreviousIndex::new(previous, &source);
    let mut report = ReconcileReport {
        source_count: source.len(),
        ..ReconcileReport::default()
    };
    let mut records = Vec::with_capacity(source.len());

    for character in source {
        let id = character.key();
        let fresh = computed
            .get(&id)
            .filter(|v| has_dimension(&v.semantic, dimension, id, "computed"));

        let vectors = if let Some(fresh) = fresh {
            report.refreshed += 1;
            let facial = fresh
                .facial
                .clone()
                .filter(|f| has_dimension(f, dimension, id, "computed"));
            Some((fresh.semantic.clone(), facial, character.primary.image.clone()))
        } else if let Some((prior, kind)) = index
            .resolve(&character)
            .filter(|(r, _)| has_dimension(&r.semantic_embedding, dimension, id, "previous"))
        {
            report.carried_forward += 1;
            if kind == MatchKind::Name {
                report.matched_by_name += 1;
                debug!(
                    character_id = id,
                    previous_id = prior.key(),
                    name = character.key_name(),
                    "matched previous record by name"
                );
            }
            let facial = prior
                .facial_embedding
                .clone()
                .filter(|f| has_dimension(f, dimension, id, "previous"));
            if prior.primary.image != character.primary.image {
                debug!(
                    character_id = id,
                    previous = ?prior.primary.image,
                    current = ?character.primary.image,
                    "image changed without new vectors, keeping the reference they came from"
                );
            }
            Some((prior.semantic_embedding.clone(), facial, prior.primary.image.clone()))
        } else {
            None
        };

        match vectors {
            Some((semantic, facial, derived_from)) => {
                let mut record = character.into_record(semantic, facial);
                record.primary.image = derived_from;
                records.push(record);
            }
            None => {
                warn!(
                    character_id = id,
                    name = character.key_name(),
                    "no semantic embedding, excluded from snapshot"
                );
                report.unmatched.push(UnmatchedCharacter {
                    id,
                    name: character.key_name().to_string(),
                });
            }
        }
    }

    report.matched = records.len();
    info!(
        matched = report.matched,
        unmatched = report.unmatched.len(),
        refreshed = report.refreshed,
        carried_forward = report.carried_forward,
        matched_by_name = report.matched_by_name,
        "reconciliation complete"
    );
    if report.matched == 0 {
        return Err(StoreError::NothingMatched {
            unmatched: report.unmatched.len(),
        });
    }

    Ok(Reconciliation {
        snapshot: Snapshot::new(header, records),
        report,
    })
}
