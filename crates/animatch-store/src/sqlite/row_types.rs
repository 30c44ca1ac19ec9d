//! Raw database row structs for `rusqlite` row mapping.
//!
//! JSON list columns stay as text here; decoding happens when rows are
//! assembled into [`crate::SourceCharacter`]s.

/// Row in `works`.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkRow {
    /// Primary key.
    pub id: i64,
    /// Canonical title.
    pub title: String,
    /// JSON array of genre labels.
    pub genres: String,
    /// `male`, `female`, or `NULL`.
    pub orientation: Option<String>,
    /// Popularity tier.
    pub tier: Option<i64>,
}

/// Row in `work_translations`.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkTranslationRow {
    /// Owning work.
    pub work_id: i64,
    /// Language code.
    pub lang: String,
    /// Translated title.
    pub title: Option<String>,
    /// JSON array of translated genre labels.
    pub genres: Option<String>,
}

/// Row in `characters`.
#[derive(Clone, Debug, PartialEq)]
pub struct CharacterRow {
    /// Primary key.
    pub id: i64,
    /// Owning work.
    pub work_id: i64,
    /// `primary` or `partner`.
    pub role: String,
    /// Canonical display name.
    pub name: String,
    /// Image URL or local path.
    pub image_ref: Option<String>,
    /// Linked character of the other role.
    pub partner_id: Option<i64>,
    /// JSON array of tags.
    pub tags: String,
    /// JSON array of traits.
    pub traits: String,
    /// Appeal text.
    pub appeal: String,
    /// Quotation.
    pub quote: String,
    /// Color token.
    pub color: Option<String>,
    /// Emoji token.
    pub emoji: Option<String>,
}

/// Row in `character_translations`.
#[derive(Clone, Debug, PartialEq)]
pub struct CharacterTranslationRow {
    /// Owning character.
    pub character_id: i64,
    /// Language code.
    pub lang: String,
    /// Translated name.
    pub name: Option<String>,
    /// JSON array of translated tags.
    pub tags: Option<String>,
    /// JSON array of translated traits.
    pub traits: Option<String>,
    /// Translated appeal text.
    pub appeal: Option<String>,
    /// Translated quotation.
    pub quote: Option<String>,
}
