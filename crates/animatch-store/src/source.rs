//! The relational source of truth, seen through a read-only interface.
//!
//! The reconciler only ever needs [`CharacterSource::fetch_all_characters`];
//! which engine sits behind it is the caller's choice.

use animatch_core::constants::{DEFAULT_PARTNER_COLOR, DEFAULT_PARTNER_EMOJI, DEFAULT_TIER};
use animatch_core::{
    CharacterRecord, Embedding, Localized, Orientation, PartnerCharacter, PrimaryCharacter,
    WorkInfo,
};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, StoreError};

/// Marker substrings for audience-viewpoint primaries, which have no
/// character image of their own and are never embedded.
const AUDIENCE_VIEWPOINT_MARKERS: &[&str] = &["관객", "시점"];

/// One matchable pair as stored relationally: metadata only, no vectors.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceCharacter {
    /// Work both characters belong to.
    pub work: WorkInfo,
    /// Role A.
    pub primary: PrimaryCharacter,
    /// Role B.
    pub partner: PartnerCharacter,
}

impl SourceCharacter {
    /// Identifier the pair is keyed by (the partner's).
    pub fn key(&self) -> i64 {
        self.partner.id
    }

    /// Canonical partner name, used for fallback matching.
    pub fn key_name(&self) -> &str {
        &self.partner.name.canonical
    }

    /// Whether the primary is an audience stand-in rather than a character.
    pub fn is_audience_viewpoint(&self) -> bool {
        let name = &self.primary.name.canonical;
        AUDIENCE_VIEWPOINT_MARKERS.iter().any(|m| name.contains(m))
    }

    /// Attach vectors, producing a persisted record.
    pub fn into_record(
        self,
        semantic_embedding: Embedding,
        facial_embedding: Option<Embedding>,
    ) -> CharacterRecord {
        CharacterRecord {
            work: self.work,
            primary: self.primary,
            partner: self.partner,
            semantic_embedding,
            facial_embedding,
        }
    }
}

/// Read-only query surface over the relational store.
pub trait CharacterSource: Send + Sync {
    /// Every partner joined with its primary and work, ordered by partner id.
    fn fetch_all_characters(&self) -> Result<Vec<SourceCharacter>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Creation requests
// ─────────────────────────────────────────────────────────────────────────────

/// Work fields of a creation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewWork {
    /// Localized title.
    pub title: Localized<String>,
    /// Localized genre tags.
    #[serde(default)]
    pub genres: Localized<Vec<String>>,
    /// Audience orientation.
    #[serde(default)]
    pub orientation: Option<Orientation>,
    /// Popularity tier (1–3, default 2).
    #[serde(default = "default_tier")]
    pub tier: u8,
}

/// Role A fields of a creation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewPrimary {
    /// Localized display name.
    pub name: Localized<String>,
    /// Image the vectors are derived from.
    #[serde(default)]
    pub image: Option<String>,
}

/// Role B fields of a creation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewPartner {
    /// Localized display name.
    pub name: Localized<String>,
    /// Display image.
    #[serde(default)]
    pub image: Option<String>,
    /// Short labels.
    #[serde(default)]
    pub tags: Localized<Vec<String>>,
    /// Trait list.
    #[serde(default)]
    pub traits: Localized<Vec<String>>,
    /// Appeal text.
    #[serde(default)]
    pub appeal: Localized<String>,
    /// Quotation.
    #[serde(default)]
    pub quote: Localized<String>,
    /// Color token (defaults when absent).
    #[serde(default)]
    pub color: Option<String>,
    /// Emoji token (defaults when absent).
    #[serde(default)]
    pub emoji: Option<String>,
}

/// A request to create one work with its primary and partner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewCharacter {
    /// The work.
    pub work: NewWork,
    /// Role A.
    pub primary: NewPrimary,
    /// Role B.
    pub partner: NewPartner,
}

fn default_tier() -> u8 {
    DEFAULT_TIER
}

impl NewCharacter {
    /// Reject requests missing required text.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("work title", &self.work.title.canonical),
            ("primary name", &self.primary.name.canonical),
            ("partner name", &self.partner.name.canonical),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(StoreError::InvalidRequest(format!("{field} is empty")));
            }
        }
        if !(1..=3).contains(&self.work.tier) {
            return Err(StoreError::InvalidRequest(format!(
                "tier {} outside 1..=3",
                self.work.tier
            )));
        }
        Ok(())
    }

    /// Partner color, falling back to the default gradient.
    pub fn color(&self) -> &str {
        self.partner
            .color
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_PARTNER_COLOR)
    }

    /// Partner emoji, falling back to the default.
    pub fn emoji(&self) -> &str {
        self.partner
            .emoji
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_PARTNER_EMOJI)
    }

    /// Parse a batch file body: a JSON array, or a single object.
    pub fn parse_batch(json: &str) -> Result<Vec<Self>> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let requests = if value.is_array() {
            serde_json::from_value(value)?
        } else {
            vec![serde_json::from_value(value)?]
        };
        Ok(requests)
    }
}

/// Identifiers assigned (or, in a dry run, predicted) for a new pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CreatedIds {
    /// New work id.
    pub work_id: i64,
    /// New primary character id.
    pub primary_id: i64,
    /// New partner character id (the record key).
    pub partner_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const BATCH: &str = r#"[{
        "work": {"title": {"canonical": "최애의 아이", "translations": {"en": "Oshi no Ko"}}, "orientation": "male", "tier": 3},
        "primary": {"name": {"canonical": "호시노 아쿠아마린"}, "image": "https://img.example/aqua.jpg"},
        "partner": {"name": {"canonical": "쿠로카와 아카네"}, "tags": {"canonical": ["연기파"]}, "emoji": "🎭"}
    }]"#;

    #[test]
    fn parse_batch_array() {
        let batch = NewCharacter::parse_batch(BATCH).unwrap();
        assert_eq!(batch.len(), 1);
        let req = &batch[0];
        assert_eq!(req.work.title.get("en"), "Oshi no Ko");
        assert_eq!(req.work.orientation, Some(Orientation::Male));
        assert_eq!(req.emoji(), "🎭");
        assert_eq!(req.color(), DEFAULT_PARTNER_COLOR);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn parse_batch_single_object() {
        let single = BATCH.trim().trim_start_matches('[').trim_end_matches(']');
        let batch = NewCharacter::parse_batch(single).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].work.tier, 3);
    }

    #[test]
    fn defaults_applied() {
        let json = r#"{"work": {"title": {"canonical": "w"}}, "primary": {"name": {"canonical": "a"}}, "partner": {"name": {"canonical": "b"}}}"#;
        let batch = NewCharacter::parse_batch(json).unwrap();
        assert_eq!(batch[0].work.tier, 2);
        assert_eq!(batch[0].emoji(), "💫");
        assert!(batch[0].primary.image.is_none());
    }

    #[test]
    fn validate_rejects_empty_name() {
        let mut req = NewCharacter::parse_batch(BATCH).unwrap().remove(0);
        req.partner.name.canonical = "  ".into();
        assert_matches!(req.validate(), Err(StoreError::InvalidRequest(msg)) if msg.contains("partner name"));
    }

    #[test]
    fn validate_rejects_bad_tier() {
        let mut req = NewCharacter::parse_batch(BATCH).unwrap().remove(0);
        req.work.tier = 5;
        assert!(req.validate().is_err());
    }

    #[test]
    fn audience_viewpoint_detection() {
        let req = NewCharacter::parse_batch(BATCH).unwrap().remove(0);
        let mut character = SourceCharacter {
            work: WorkInfo {
                id: 1,
                title: req.work.title,
                genres: Localized::default(),
                orientation: None,
                tier: 2,
            },
            primary: PrimaryCharacter {
                id: 1,
                name: Localized::new("관객 시점".to_string()),
                image: None,
            },
            partner: PartnerCharacter {
                id: 2,
                name: req.partner.name,
                tags: Localized::default(),
                traits: Localized::default(),
                appeal: Localized::default(),
                quote: Localized::default(),
                color: String::new(),
                emoji: String::new(),
                image: None,
            },
        };
        assert!(character.is_audience_viewpoint());
        character.primary.name = Localized::new("아쿠아".to_string());
        assert!(!character.is_audience_viewpoint());
        assert_eq!(character.key(), 2);
    }
}
