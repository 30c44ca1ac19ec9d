//! The persisted record set.
//!
//! `record_count` is never set by hand: [`Snapshot::new`] derives it and
//! deserialization rejects documents where it disagrees with `records`.

use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, Result};
use crate::record::CharacterRecord;

/// Model metadata written at the top of every snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    /// Semantic model identifier (e.g. `ViT-B-32`).
    pub model_identifier: String,
    /// Pretrained weights tag (e.g. `openai`).
    pub pretrained_tag: String,
    /// Component count shared by both embedding kinds.
    pub embedding_dimension: usize,
}

/// A full snapshot of matchable records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSnapshot")]
pub struct Snapshot {
    model_identifier: String,
    pretrained_tag: String,
    embedding_dimension: usize,
    record_count: usize,
    records: Vec<CharacterRecord>,
}

/// Wire shape before invariant checks.
#[derive(Deserialize)]
struct RawSnapshot {
    model_identifier: String,
    pretrained_tag: String,
    embedding_dimension: usize,
    record_count: usize,
    records: Vec<CharacterRecord>,
}

impl TryFrom<RawSnapshot> for Snapshot {
    type Error = CoreError;

    fn try_from(raw: RawSnapshot) -> Result<Self> {
        if raw.record_count != raw.records.len() {
            return Err(CoreError::CountMismatch {
                declared: raw.record_count,
                actual: raw.records.len(),
            });
        }
        for record in &raw.records {
            check_dimension(record, raw.embedding_dimension)?;
        }
        Ok(Self {
            model_identifier: raw.model_identifier,
            pretrained_tag: raw.pretrained_tag,
            embedding_dimension: raw.embedding_dimension,
            record_count: raw.record_count,
            records: raw.records,
        })
    }
}

fn check_dimension(record: &CharacterRecord, expected: usize) -> Result<()> {
    let vectors = std::iter::once(&record.semantic_embedding).chain(record.facial_embedding.iter());
    for v in vectors {
        if v.len() != expected {
            return Err(CoreError::Dimension {
                expected,
                actual: v.len(),
            });
        }
    }
    Ok(())
}

impl Snapshot {
    /// Build a snapshot; the declared count is derived from `records`.
    pub fn new(header: SnapshotHeader, records: Vec<CharacterRecord>) -> Self {
        Self {
            model_identifier: header.model_identifier,
            pretrained_tag: header.pretrained_tag,
            embedding_dimension: header.embedding_dimension,
            record_count: records.len(),
            records,
        }
    }

    /// A snapshot with no records.
    pub fn empty(header: SnapshotHeader) -> Self {
        Self::new(header, Vec::new())
    }

    /// Copy of the model metadata.
    pub fn header(&self) -> SnapshotHeader {
        SnapshotHeader {
            model_identifier: self.model_identifier.clone(),
            pretrained_tag: self.pretrained_tag.clone(),
            embedding_dimension: self.embedding_dimension,
        }
    }

    /// Semantic model identifier.
    pub fn model_identifier(&self) -> &str {
        &self.model_identifier
    }

    /// Shared embedding dimension.
    pub fn embedding_dimension(&self) -> usize {
        self.embedding_dimension
    }

    /// Declared record count (always equal to `records().len()`).
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Records in persisted order.
    pub fn records(&self) -> &[CharacterRecord] {
        &self.records
    }

    /// Consume into the record list.
    pub fn into_records(self) -> Vec<CharacterRecord> {
        self.records
    }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record keyed by partner identifier.
    pub fn find(&self, key: i64) -> Option<&CharacterRecord> {
        self.records.iter().find(|r| r.key() == key)
    }

    /// Check every vector for dimension and unit length.
    pub fn validate_vectors(&self) -> Result<()> {
        for record in &self.records {
            record.semantic_embedding.validate(self.embedding_dimension)?;
            if let Some(facial) = &record.facial_embedding {
                facial.validate(self.embedding_dimension)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedding;
    use crate::localized::Localized;
    use crate::record::{PartnerCharacter, PrimaryCharacter, WorkInfo};
    use assert_matches::assert_matches;

    fn header(dim: usize) -> SnapshotHeader {
        SnapshotHeader {
            model_identifier: "ViT-B-32".into(),
            pretrained_tag: "openai".into(),
            embedding_dimension: dim,
        }
    }

    fn record(id: i64, v: Vec<f32>) -> CharacterRecord {
        CharacterRecord {
            work: WorkInfo {
                id: 1,
                title: Localized::new("w".into()),
                genres: Localized::default(),
                orientation: None,
                tier: 2,
            },
            primary: PrimaryCharacter {
                id: id - 1,
                name: Localized::new(format!("p{id}")),
                image: None,
            },
            partner: PartnerCharacter {
                id,
                name: Localized::new(format!("h{id}")),
                tags: Localized::default(),
                traits: Localized::default(),
                appeal: Localized::default(),
                quote: Localized::default(),
                color: String::new(),
                emoji: String::new(),
                image: None,
            },
            semantic_embedding: Embedding::from_components(v),
            facial_embedding: None,
        }
    }

    #[test]
    fn new_derives_count() {
        let s = Snapshot::new(header(2), vec![record(2, vec![1.0, 0.0]), record(4, vec![0.0, 1.0])]);
        assert_eq!(s.record_count(), 2);
        assert_eq!(s.records().len(), 2);
        assert!(s.find(4).is_some());
        assert!(s.find(5).is_none());
    }

    #[test]
    fn top_level_field_order() {
        let s = Snapshot::empty(header(512));
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(
            json,
            r#"{"model_identifier":"ViT-B-32","pretrained_tag":"openai","embedding_dimension":512,"record_count":0,"records":[]}"#
        );
    }

    #[test]
    fn deserialize_rejects_count_mismatch() {
        let json = r#"{"model_identifier":"m","pretrained_tag":"p","embedding_dimension":2,"record_count":3,"records":[]}"#;
        let err = serde_json::from_str::<Snapshot>(json).unwrap_err();
        assert!(err.to_string().contains("declares 3 records"));
    }

    #[test]
    fn deserialize_rejects_wrong_dimension() {
        let s = Snapshot::new(header(2), vec![record(2, vec![1.0, 0.0, 0.0])]);
        let json = serde_json::to_string(&s).unwrap();
        let err = serde_json::from_str::<Snapshot>(&json).unwrap_err();
        assert!(err.to_string().contains("dimension mismatch"));
    }

    #[test]
    fn roundtrip_preserves_records() {
        let s = Snapshot::new(header(2), vec![record(2, vec![0.6, 0.8])]);
        let json = serde_json::to_string(&s).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn validate_vectors_flags_non_unit() {
        let s = Snapshot::new(header(2), vec![record(2, vec![0.5, 0.5])]);
        assert_matches!(s.validate_vectors(), Err(CoreError::NotUnitNorm { .. }));
    }
}
