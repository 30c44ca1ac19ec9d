//! [`CharacterSource`] backed by the `SQLite` schema, plus the character
//! creation transaction.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use animatch_core::constants::{DEFAULT_PARTNER_COLOR, DEFAULT_PARTNER_EMOJI, DEFAULT_TIER};
use animatch_core::{Localized, Orientation, PartnerCharacter, PrimaryCharacter, WorkInfo};
use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::source::{CharacterSource, CreatedIds, NewCharacter, SourceCharacter};
use crate::sqlite::connection::{self, ConnectionConfig};
use crate::sqlite::migrations::run_migrations;
use crate::sqlite::repositories::character::CharacterInsert;
use crate::sqlite::repositories::{CharacterRepo, WorkRepo};
use crate::sqlite::row_types::{CharacterRow, CharacterTranslationRow, WorkRow, WorkTranslationRow};

const ROLE_PRIMARY: &str = "primary";
const ROLE_PARTNER: &str = "partner";

/// Relational source over a single `SQLite` connection.
pub struct SqliteCharacterSource {
    conn: Mutex<Connection>,
}

impl SqliteCharacterSource {
    /// Open a database file, applying pending migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = connection::open_file(path, &ConnectionConfig::default())?;
        Self::from_connection(conn)
    }

    /// Open an empty in-memory database with the schema applied.
    pub fn open_in_memory() -> Result<Self> {
        let conn = connection::open_in_memory(&ConnectionConfig::default())?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let _ = run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Identifiers the next [`create_character_pair`](Self::create_character_pair)
    /// would assign. Nothing is written.
    pub fn predict_ids(&self) -> Result<CreatedIds> {
        let conn = self.conn.lock();
        let max_work = WorkRepo::max_id(&conn)?;
        let max_character = CharacterRepo::max_id(&conn)?;
        Ok(CreatedIds {
            work_id: max_work + 1,
            primary_id: max_character + 1,
            partner_id: max_character + 2,
        })
    }

    /// Insert a work, its primary, and its partner, linked both ways, in one
    /// transaction.
    pub fn create_character_pair(&self, request: &NewCharacter) -> Result<CreatedIds> {
        request.validate()?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let work = &request.work;
        let work_id = WorkRepo::insert(
            &tx,
            &work.title.canonical,
            &to_json_list(&work.genres.canonical)?,
            work.orientation.map(Orientation::as_str),
            work.tier,
        )?;
        let work_langs: BTreeSet<&str> =
            work.title.languages().chain(work.genres.languages()).collect();
        for lang in work_langs {
            let genres = work.genres.translations.get(lang).map(|g| to_json_list(g)).transpose()?;
            WorkRepo::upsert_translation(
                &tx,
                work_id,
                lang,
                work.title.translations.get(lang).map(String::as_str),
                genres.as_deref(),
            )?;
        }

        let primary = &request.primary;
        let primary_id = CharacterRepo::insert(
            &tx,
            &CharacterInsert {
                work_id,
                role: ROLE_PRIMARY,
                name: &primary.name.canonical,
                image_ref: primary.image.as_deref(),
                tags: "[]",
                traits: "[]",
                ..CharacterInsert::default()
            },
        )?;
        for (lang, name) in &primary.name.translations {
            CharacterRepo::upsert_translation(
                &tx,
                &CharacterTranslationRow {
                    character_id: primary_id,
                    lang: lang.clone(),
                    name: Some(name.clone()),
                    tags: None,
                    traits: None,
                    appeal: None,
                    quote: None,
                },
            )?;
        }

        let partner = &request.partner;
        let tags = to_json_list(&partner.tags.canonical)?;
        let traits = to_json_list(&partner.traits.canonical)?;
        let partner_id = CharacterRepo::insert(
            &tx,
            &CharacterInsert {
                work_id,
                role: ROLE_PARTNER,
                name: &partner.name.canonical,
                image_ref: partner.image.as_deref(),
                partner_id: Some(primary_id),
                tags: &tags,
                traits: &traits,
                appeal: &partner.appeal.canonical,
                quote: &partner.quote.canonical,
                color: Some(request.color()),
                emoji: Some(request.emoji()),
            },
        )?;
        let partner_langs: BTreeSet<&str> = partner
            .name
            .languages()
            .chain(partner.tags.languages())
            .chain(partner.traits.languages())
            .chain(partner.appeal.languages())
            .chain(partner.quote.languages())
            .collect();
        for lang in partner_langs {
            CharacterRepo::upsert_translation(
                &tx,
                &CharacterTranslationRow {
                    character_id: partner_id,
                    lang: lang.to_string(),
                    name: partner.name.translations.get(lang).cloned(),
                    tags: partner.tags.translations.get(lang).map(|t| to_json_list(t)).transpose()?,
                    traits: partner.traits.translations.get(lang).map(|t| to_json_list(t)).transpose()?,
                    appeal: partner.appeal.translations.get(lang).cloned(),
                    quote: partner.quote.translations.get(lang).cloned(),
                },
            )?;
        }

        let _ = CharacterRepo::set_partner(&tx, primary_id, partner_id)?;
        tx.commit()?;

        let ids = CreatedIds {
            work_id,
            primary_id,
            partner_id,
        };
        info!(
            work_id,
            primary_id,
            partner_id,
            name = %partner.name.canonical,
            "created character pair"
        );
        Ok(ids)
    }
}

impl CharacterSource for SqliteCharacterSource {
    fn fetch_all_characters(&self) -> Result<Vec<SourceCharacter>> {
        let conn = self.conn.lock();
        let works = WorkRepo::list(&conn)?;
        let work_translations = WorkRepo::list_translations(&conn)?;
        let characters = CharacterRepo::list(&conn)?;
        let character_translations = CharacterRepo::list_translations(&conn)?;
        drop(conn);

        let works: HashMap<i64, WorkInfo> = {
            let mut by_work: HashMap<i64, Vec<WorkTranslationRow>> = HashMap::new();
            for t in work_translations {
                by_work.entry(t.work_id).or_default().push(t);
            }
            works
                .into_iter()
                .map(|w| {
                    let translations = by_work.remove(&w.id).unwrap_or_default();
                    (w.id, assemble_work(w, translations))
                })
                .collect()
        };

        let mut translations: HashMap<i64, Vec<CharacterTranslationRow>> = HashMap::new();
        for t in character_translations {
            translations.entry(t.character_id).or_default().push(t);
        }
        let by_id: HashMap<i64, &CharacterRow> = characters.iter().map(|c| (c.id, c)).collect();
        let primary_for_partner: HashMap<i64, &CharacterRow> = characters
            .iter()
            .filter(|c| c.role == ROLE_PRIMARY)
            .filter_map(|c| c.partner_id.map(|p| (p, c)))
            .collect();

        let mut out = Vec::new();
        for partner in characters.iter().filter(|c| c.role == ROLE_PARTNER) {
            let primary = partner
                .partner_id
                .and_then(|id| by_id.get(&id).copied())
                .filter(|c| c.role == ROLE_PRIMARY)
                .or_else(|| primary_for_partner.get(&partner.id).copied());
            let Some(primary) = primary else {
                warn!(character_id = partner.id, name = %partner.name, "partner has no linked primary, skipping");
                continue;
            };
            let Some(work) = works.get(&partner.work_id) else {
                warn!(character_id = partner.id, work_id = partner.work_id, "partner references missing work, skipping");
                continue;
            };
            out.push(SourceCharacter {
                work: work.clone(),
                primary: assemble_primary(primary, translations.get(&primary.id)),
                partner: assemble_partner(partner, translations.get(&partner.id)),
            });
        }
        debug!(characters = out.len(), "fetched relational characters");
        Ok(out)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row assembly
// ─────────────────────────────────────────────────────────────────────────────

/// Decode a JSON string list. Malformed or non-list content yields an empty
/// list and a warning; the record is still exported.
pub fn parse_json_list(raw: &str, column: &str, owner_id: i64) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(list) => list,
        Err(error) => {
            warn!(owner_id, column, %error, "malformed JSON list, using empty list");
            Vec::new()
        }
    }
}

fn to_json_list(items: &[String]) -> Result<String> {
    Ok(serde_json::to_string(items)?)
}

fn non_empty(value: Option<&str>, fallback: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn assemble_work(row: WorkRow, translations: Vec<WorkTranslationRow>) -> WorkInfo {
    let mut title = Localized::new(row.title);
    let mut genres = Localized::new(parse_json_list(&row.genres, "genres", row.id));
    for t in translations {
        if let Some(value) = t.title {
            let _ = title.translations.insert(t.lang.clone(), value);
        }
        if let Some(raw) = t.genres {
            let _ = genres
                .translations
                .insert(t.lang, parse_json_list(&raw, "genres", row.id));
        }
    }
    WorkInfo {
        id: row.id,
        title,
        genres,
        orientation: row.orientation.as_deref().and_then(Orientation::parse),
        tier: row
            .tier
            .and_then(|t| u8::try_from(t).ok())
            .unwrap_or(DEFAULT_TIER),
    }
}

fn assemble_primary(row: &CharacterRow, translations: Option<&Vec<CharacterTranslationRow>>) -> PrimaryCharacter {
    let mut name = Localized::new(row.name.clone());
    for t in translations.into_iter().flatten() {
        if let Some(value) = &t.name {
            let _ = name.translations.insert(t.lang.clone(), value.clone());
        }
    }
    PrimaryCharacter {
        id: row.id,
        name,
        image: row.image_ref.clone().filter(|r| !r.trim().is_empty()),
    }
}

fn assemble_partner(row: &CharacterRow, translations: Option<&Vec<CharacterTranslationRow>>) -> PartnerCharacter {
    let mut name = Localized::new(row.name.clone());
    let mut tags = Localized::new(parse_json_list(&row.tags, "tags", row.id));
    let mut traits = Localized::new(parse_json_list(&row.traits, "traits", row.id));
    let mut appeal = Localized::new(row.appeal.clone());
    let mut quote = Localized::new(row.quote.clone());
    for t in translations.into_iter().flatten() {
        let lang = &t.lang;
        if let Some(v) = &t.name {
            let _ = name.translations.insert(lang.clone(), v.clone());
        }
        if let Some(raw) = &t.tags {
            let _ = tags.translations.insert(lang.clone(), parse_json_list(raw, "tags", row.id));
        }
        if let Some(raw) = &t.traits {
            let _ = traits.translations.insert(lang.clone(), parse_json_list(raw, "traits", row.id));
        }
        if let Some(v) = &t.appeal {
            let _ = appeal.translations.insert(lang.clone(), v.clone());
        }
        if let Some(v) = &t.quote {
            let _ = quote.translations.insert(lang.clone(), v.clone());
        }
    }
    PartnerCharacter {
        id: row.id,
        name,
        tags,
        traits,
        appeal,
        quote,
        color: non_empty(row.color.as_deref(), DEFAULT_PARTNER_COLOR),
        emoji: non_empty(row.emoji.as_deref(), DEFAULT_PARTNER_EMOJI),
        image: row.image_ref.clone().filter(|r| !r.trim().is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(title: &str, primary: &str, partner: &str) -> NewCharacter {
        let json = format!(
            r#"{{
                "work": {{"title": {{"canonical": "{title}", "translations": {{"en": "{title} EN"}}}},
                          "genres": {{"canonical": ["드라마"], "translations": {{"en": ["Drama"]}}}},
                          "orientation": "female", "tier": 1}},
                "primary": {{"name": {{"canonical": "{primary}", "translations": {{"ja": "{primary} JA"}}}},
                             "image": "https://img.example/{primary}.jpg"}},
                "partner": {{"name": {{"canonical": "{partner}", "translations": {{"en": "{partner} EN"}}}},
                             "tags": {{"canonical": ["a", "b"], "translations": {{"en": ["A", "B"]}}}},
                             "appeal": {{"canonical": "매력"}},
                             "quote": {{"canonical": "대사", "translations": {{"zh-TW": "台詞"}}}}}}
            }}"#
        );
        NewCharacter::parse_batch(&json).unwrap().remove(0)
    }

    #[test]
    fn create_then_fetch() {
        let source = SqliteCharacterSource::open_in_memory().unwrap();
        let ids = source.create_character_pair(&request("작품", "주인공", "상대")).unwrap();
        assert_eq!(
            ids,
            CreatedIds {
                work_id: 1,
                primary_id: 1,
                partner_id: 2
            }
        );

        let all = source.fetch_all_characters().unwrap();
        assert_eq!(all.len(), 1);
        let c = &all[0];
        assert_eq!(c.key(), 2);
        assert_eq!(c.primary.id, 1);
        assert_eq!(c.primary.name.get("ja"), "주인공 JA");
        assert_eq!(c.primary.image.as_deref(), Some("https://img.example/주인공.jpg"));
        assert_eq!(c.work.title.get("en"), "작품 EN");
        assert_eq!(c.work.genres.get("en"), &vec!["Drama".to_string()]);
        assert_eq!(c.work.orientation, Some(Orientation::Female));
        assert_eq!(c.work.tier, 1);
        assert_eq!(c.partner.tags.canonical, vec!["a", "b"]);
        assert_eq!(c.partner.tags.get("en"), &vec!["A".to_string(), "B".to_string()]);
        assert_eq!(c.partner.quote.get("zh-TW"), "台詞");
        assert_eq!(c.partner.appeal.canonical, "매력");
        assert_eq!(c.partner.color, DEFAULT_PARTNER_COLOR);
        assert_eq!(c.partner.emoji, DEFAULT_PARTNER_EMOJI);
        assert!(c.partner.image.is_none());
    }

    #[test]
    fn predict_matches_actual_ids() {
        let source = SqliteCharacterSource::open_in_memory().unwrap();
        let _ = source.create_character_pair(&request("w1", "p1", "h1")).unwrap();
        let predicted = source.predict_ids().unwrap();
        let actual = source.create_character_pair(&request("w2", "p2", "h2")).unwrap();
        assert_eq!(predicted, actual);
    }

    #[test]
    fn predict_does_not_write() {
        let source = SqliteCharacterSource::open_in_memory().unwrap();
        let _ = source.predict_ids().unwrap();
        assert!(source.fetch_all_characters().unwrap().is_empty());
    }

    #[test]
    fn fetch_orders_by_partner_id() {
        let source = SqliteCharacterSource::open_in_memory().unwrap();
        for i in 0..3 {
            let _ = source
                .create_character_pair(&request(&format!("w{i}"), &format!("p{i}"), &format!("h{i}")))
                .unwrap();
        }
        let keys: Vec<i64> = source.fetch_all_characters().unwrap().iter().map(SourceCharacter::key).collect();
        assert_eq!(keys, vec![2, 4, 6]);
    }

    #[test]
    fn invalid_request_writes_nothing() {
        let source = SqliteCharacterSource::open_in_memory().unwrap();
        let mut bad = request("w", "p", "h");
        bad.partner.name.canonical = String::new();
        assert!(source.create_character_pair(&bad).is_err());
        assert_eq!(source.predict_ids().unwrap().work_id, 1);
    }

    #[test]
    fn malformed_json_list_degrades_to_empty() {
        assert!(parse_json_list("not json", "tags", 1).is_empty());
        assert!(parse_json_list("", "tags", 1).is_empty());
        assert!(parse_json_list(r#"{"a": 1}"#, "tags", 1).is_empty());
        assert_eq!(parse_json_list(r#"["x"]"#, "tags", 1), vec!["x"]);
    }

    #[test]
    fn malformed_row_still_fetched() {
        let source = SqliteCharacterSource::open_in_memory().unwrap();
        let ids = source.create_character_pair(&request("w", "p", "h")).unwrap();
        {
            let conn = source.conn.lock();
            let _ = conn
                .execute(
                    "UPDATE characters SET tags = '[broken', color = '' WHERE id = ?1",
                    [ids.partner_id],
                )
                .unwrap();
        }
        let all = source.fetch_all_characters().unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].partner.tags.canonical.is_empty());
        assert_eq!(all[0].partner.color, DEFAULT_PARTNER_COLOR);
    }

    #[test]
    fn partner_without_primary_skipped() {
        let source = SqliteCharacterSource::open_in_memory().unwrap();
        {
            let conn = source.conn.lock();
            let work_id = WorkRepo::insert(&conn, "w", "[]", None, 2).unwrap();
            let _ = CharacterRepo::insert(
                &conn,
                &CharacterInsert {
                    work_id,
                    role: ROLE_PARTNER,
                    name: "lonely",
                    tags: "[]",
                    traits: "[]",
                    ..CharacterInsert::default()
                },
            )
            .unwrap();
        }
        assert!(source.fetch_all_characters().unwrap().is_empty());
    }
}
