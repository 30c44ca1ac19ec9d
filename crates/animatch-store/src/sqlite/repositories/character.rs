//! Character repository: the `characters` and `character_translations` tables.

use rusqlite::{Connection, params};

use crate::errors::Result;
use crate::sqlite::row_types::{CharacterRow, CharacterTranslationRow};

/// Column values for a new character row.
#[derive(Clone, Debug, Default)]
pub struct CharacterInsert<'a> {
    /// Owning work.
    pub work_id: i64,
    /// `primary` or `partner`.
    pub role: &'a str,
    /// Canonical display name.
    pub name: &'a str,
    /// Image URL or local path.
    pub image_ref: Option<&'a str>,
    /// Linked character of the other role, if already known.
    pub partner_id: Option<i64>,
    /// JSON array of tags.
    pub tags: &'a str,
    /// JSON array of traits.
    pub traits: &'a str,
    /// Appeal text.
    pub appeal: &'a str,
    /// Quotation.
    pub quote: &'a str,
    /// Color token.
    pub color: Option<&'a str>,
    /// Emoji token.
    pub emoji: Option<&'a str>,
}

/// Character repository, stateless.
pub struct CharacterRepo;

impl CharacterRepo {
    /// Insert a character. Returns its id.
    pub fn insert(conn: &Connection, c: &CharacterInsert<'_>) -> Result<i64> {
        let _ = conn.execute(
            "INSERT INTO characters (work_id, role, name, image_ref, partner_id,
                 tags, traits, appeal, quote, color, emoji)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                c.work_id,
                c.role,
                c.name,
                c.image_ref,
                c.partner_id,
                c.tags,
                c.traits,
                c.appeal,
                c.quote,
                c.color,
                c.emoji
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Point `id` at its counterpart. Returns whether a row was updated.
    pub fn set_partner(conn: &Connection, id: i64, partner_id: i64) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE characters SET partner_id = ?1 WHERE id = ?2",
            params![partner_id, id],
        )?;
        Ok(changed > 0)
    }

    /// Insert or replace one language's translation.
    pub fn upsert_translation(conn: &Connection, row: &CharacterTranslationRow) -> Result<()> {
        let _ = conn.execute(
            "INSERT OR REPLACE INTO character_translations
                 (character_id, lang, name, tags, traits, appeal, quote)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                row.character_id,
                row.lang,
                row.name,
                row.tags,
                row.traits,
                row.appeal,
                row.quote
            ],
        )?;
        Ok(())
    }

    /// All characters ordered by id.
    pub fn list(conn: &Connection) -> Result<Vec<CharacterRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, work_id, role, name, image_ref, partner_id,
                    tags, traits, appeal, quote, color, emoji
             FROM characters ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All character translations ordered by character then language.
    pub fn list_translations(conn: &Connection) -> Result<Vec<CharacterTranslationRow>> {
        let mut stmt = conn.prepare(
            "SELECT character_id, lang, name, tags, traits, appeal, quote
             FROM character_translations ORDER BY character_id, lang",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CharacterTranslationRow {
                    character_id: row.get(0)?,
                    lang: row.get(1)?,
                    name: row.get(2)?,
                    tags: row.get(3)?,
                    traits: row.get(4)?,
                    appeal: row.get(5)?,
                    quote: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Highest character id, or 0 when empty.
    pub fn max_id(conn: &Connection) -> Result<i64> {
        Ok(conn.query_row("SELECT COALESCE(MAX(id), 0) FROM characters", [], |row| {
            row.get(0)
        })?)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CharacterRow> {
        Ok(CharacterRow {
            id: row.get(0)?,
            work_id: row.get(1)?,
            role: row.get(2)?,
            name: row.get(3)?,
            image_ref: row.get(4)?,
            partner_id: row.get(5)?,
            tags: row.get(6)?,
            traits: row.get(7)?,
            appeal: row.get(8)?,
            quote: row.get(9)?,
            color: row.get(10)?,
            emoji: row.get(11)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::connection::{ConnectionConfig, open_in_memory};
    use crate::sqlite::migrations::run_migrations;
    use crate::sqlite::repositories::WorkRepo;

    fn setup() -> (Connection, i64) {
        let conn = open_in_memory(&ConnectionConfig::default()).unwrap();
        let _ = run_migrations(&conn).unwrap();
        let work_id = WorkRepo::insert(&conn, "w", "[]", None, 2).unwrap();
        (conn, work_id)
    }

    #[test]
    fn insert_pair_and_link() {
        let (conn, work_id) = setup();
        let a = CharacterRepo::insert(
            &conn,
            &CharacterInsert {
                work_id,
                role: "primary",
                name: "A",
                image_ref: Some("a.png"),
                tags: "[]",
                traits: "[]",
                ..CharacterInsert::default()
            },
        )
        .unwrap();
        let b = CharacterRepo::insert(
            &conn,
            &CharacterInsert {
                work_id,
                role: "partner",
                name: "B",
                partner_id: Some(a),
                tags: r#"["x"]"#,
                traits: "[]",
                ..CharacterInsert::default()
            },
        )
        .unwrap();
        assert!(CharacterRepo::set_partner(&conn, a, b).unwrap());

        let rows = CharacterRepo::list(&conn).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].partner_id, Some(b));
        assert_eq!(rows[1].partner_id, Some(a));
        assert_eq!(rows[1].tags, r#"["x"]"#);
        assert_eq!(rows[1].appeal, "");
        assert_eq!(CharacterRepo::max_id(&conn).unwrap(), b);
    }

    #[test]
    fn foreign_key_enforced() {
        let (conn, _) = setup();
        let result = CharacterRepo::insert(
            &conn,
            &CharacterInsert {
                work_id: 999,
                role: "primary",
                name: "orphan",
                tags: "[]",
                traits: "[]",
                ..CharacterInsert::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn translations_roundtrip() {
        let (conn, work_id) = setup();
        let id = CharacterRepo::insert(
            &conn,
            &CharacterInsert {
                work_id,
                role: "partner",
                name: "아카네",
                tags: "[]",
                traits: "[]",
                ..CharacterInsert::default()
            },
        )
        .unwrap();
        let row = CharacterTranslationRow {
            character_id: id,
            lang: "en".into(),
            name: Some("Akane".into()),
            tags: None,
            traits: None,
            appeal: Some("Acting".into()),
            quote: None,
        };
        CharacterRepo::upsert_translation(&conn, &row).unwrap();
        assert_eq!(CharacterRepo::list_translations(&conn).unwrap(), vec![row]);
    }
}
