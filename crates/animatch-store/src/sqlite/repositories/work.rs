//! Work repository: the `works` and `work_translations` tables.

use rusqlite::{Connection, params};

use crate::errors::Result;
use crate::sqlite::row_types::{WorkRow, WorkTranslationRow};

/// Work repository, stateless.
pub struct WorkRepo;

impl WorkRepo {
    /// Insert a work. Returns its id.
    pub fn insert(
        conn: &Connection,
        title: &str,
        genres_json: &str,
        orientation: Option<&str>,
        tier: u8,
    ) -> Result<i64> {
        let _ = conn.execute(
            "INSERT INTO works (title, genres, orientation, tier) VALUES (?1, ?2, ?3, ?4)",
            params![title, genres_json, orientation, tier],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert or replace one language's translation.
    pub fn upsert_translation(
        conn: &Connection,
        work_id: i64,
        lang: &str,
        title: Option<&str>,
        genres_json: Option<&str>,
    ) -> Result<()> {
        let _ = conn.execute(
            "INSERT OR REPLACE INTO work_translations (work_id, lang, title, genres)
             VALUES (?1, ?2, ?3, ?4)",
            params![work_id, lang, title, genres_json],
        )?;
        Ok(())
    }

    /// All works ordered by id.
    pub fn list(conn: &Connection) -> Result<Vec<WorkRow>> {
        let mut stmt =
            conn.prepare("SELECT id, title, genres, orientation, tier FROM works ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(WorkRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    genres: row.get(2)?,
                    orientation: row.get(3)?,
                    tier: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All work translations ordered by work then language.
    pub fn list_translations(conn: &Connection) -> Result<Vec<WorkTranslationRow>> {
        let mut stmt = conn.prepare(
            "SELECT work_id, lang, title, genres FROM work_translations ORDER BY work_id, lang",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(WorkTranslationRow {
                    work_id: row.get(0)?,
                    lang: row.get(1)?,
                    title: row.get(2)?,
                    genres: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Highest work id, or 0 when empty.
    pub fn max_id(conn: &Connection) -> Result<i64> {
        Ok(conn.query_row("SELECT COALESCE(MAX(id), 0) FROM works", [], |row| row.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::connection::{ConnectionConfig, open_in_memory};
    use crate::sqlite::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = open_in_memory(&ConnectionConfig::default()).unwrap();
        let _ = run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn insert_and_list() {
        let conn = setup();
        assert_eq!(WorkRepo::max_id(&conn).unwrap(), 0);
        let id = WorkRepo::insert(&conn, "최애의 아이", r#"["드라마"]"#, Some("male"), 3).unwrap();
        let rows = WorkRepo::list(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].orientation.as_deref(), Some("male"));
        assert_eq!(rows[0].tier, Some(3));
        assert_eq!(WorkRepo::max_id(&conn).unwrap(), id);
    }

    #[test]
    fn translation_upsert_replaces() {
        let conn = setup();
        let id = WorkRepo::insert(&conn, "w", "[]", None, 2).unwrap();
        WorkRepo::upsert_translation(&conn, id, "en", Some("Old"), None).unwrap();
        WorkRepo::upsert_translation(&conn, id, "en", Some("New"), Some(r#"["Drama"]"#)).unwrap();
        let rows = WorkRepo::list_translations(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title.as_deref(), Some("New"));
        assert_eq!(rows[0].genres.as_deref(), Some(r#"["Drama"]"#));
    }
}
