//! Character records, the unit of the snapshot.
//!
//! A record pairs a primary character (role A, whose image is embedded) with
//! its partner (role B, who owns the descriptive metadata). The vectors are
//! attributed to the partner: matching a user against a record's embedding
//! yields the partner as the result.

use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;
use crate::localized::Localized;

/// Audience orientation of a work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Male-oriented work.
    Male,
    /// Female-oriented work.
    Female,
}

impl Orientation {
    /// Parse the relational column value. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            _ => None,
        }
    }

    /// Column value for this orientation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

/// Work metadata carried on every record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkInfo {
    /// Stable work identifier.
    pub id: i64,
    /// Localized work title.
    pub title: Localized<String>,
    /// Localized genre tags.
    pub genres: Localized<Vec<String>>,
    /// Audience orientation, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    /// Popularity tier (1–3).
    pub tier: u8,
}

/// Role A: identity, names, and the image the vectors are derived from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrimaryCharacter {
    /// Stable character identifier.
    pub id: i64,
    /// Localized display name.
    pub name: Localized<String>,
    /// Source image reference (URL or local path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Role B: the matchable character and all of its descriptive metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartnerCharacter {
    /// Stable character identifier.
    pub id: i64,
    /// Localized display name.
    pub name: Localized<String>,
    /// Short labels, ordered.
    pub tags: Localized<Vec<String>>,
    /// Free-text trait list, ordered.
    pub traits: Localized<Vec<String>>,
    /// Short appeal description.
    pub appeal: Localized<String>,
    /// Short quotation.
    pub quote: Localized<String>,
    /// Color token.
    pub color: String,
    /// Emoji token.
    pub emoji: String,
    /// Partner image reference (display only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// One persisted record: metadata plus vectors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    /// Work both characters belong to.
    pub work: WorkInfo,
    /// Role A.
    pub primary: PrimaryCharacter,
    /// Role B.
    pub partner: PartnerCharacter,
    /// Mandatory semantic vector.
    pub semantic_embedding: Embedding,
    /// Facial vector, present only when a face was embedded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facial_embedding: Option<Embedding>,
}

impl CharacterRecord {
    /// Identifier the record is keyed by (the partner's).
    pub fn key(&self) -> i64 {
        self.partner.id
    }

    /// Canonical display name used for fallback matching.
    pub fn key_name(&self) -> &str {
        &self.partner.name.canonical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CharacterRecord {
        CharacterRecord {
            work: WorkInfo {
                id: 1,
                title: Localized::new("최애의 아이".into()).with_translation("en", "Oshi no Ko".into()),
                genres: Localized::new(vec!["드라마".into()]),
                orientation: Some(Orientation::Male),
                tier: 3,
            },
            primary: PrimaryCharacter {
                id: 10,
                name: Localized::new("아쿠아".into()),
                image: Some("https://img.example/10.jpg".into()),
            },
            partner: PartnerCharacter {
                id: 11,
                name: Localized::new("아카네".into()),
                tags: Localized::new(vec!["연기파".into()]),
                traits: Localized::default(),
                appeal: Localized::new("완벽한 연기력".into()),
                quote: Localized::default(),
                color: "#ff6b6b".into(),
                emoji: "🎭".into(),
                image: None,
            },
            semantic_embedding: Embedding::from_components(vec![1.0, 0.0]),
            facial_embedding: None,
        }
    }

    #[test]
    fn orientation_parse() {
        assert_eq!(Orientation::parse("male"), Some(Orientation::Male));
        assert_eq!(Orientation::parse(" Female "), Some(Orientation::Female));
        assert_eq!(Orientation::parse("both"), None);
    }

    #[test]
    fn key_is_partner_id() {
        let r = sample();
        assert_eq!(r.key(), 11);
        assert_eq!(r.key_name(), "아카네");
    }

    #[test]
    fn facial_embedding_omitted_when_absent() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.get("facial_embedding").is_none());
        assert!(value["partner"].get("image").is_none());
        assert_eq!(value["work"]["orientation"], "male");
    }

    #[test]
    fn record_roundtrip() {
        let r = sample();
        let json = serde_json::to_string(&r).unwrap();
        let back: CharacterRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
