//! Schema upgrades for the character database.
//!
//! The applied level lives in `PRAGMA user_version`. Each step's SQL is
//! compiled into the binary and runs in one transaction together with the
//! version bump, so a failed step leaves the previous level intact.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::errors::{Result, StoreError};

/// Ordered schema steps. Level N is reached by running `STEPS[N - 1]`.
const STEPS: &[(&str, &str)] = &[(
    "works, characters and their translations",
    include_str!("v001_schema.sql"),
)];

fn migration_error(level: u32, what: &str, e: &rusqlite::Error) -> StoreError {
    StoreError::Migration {
        message: format!("level {level}: {what}: {e}"),
    }
}

/// Bring `conn` up to [`latest_version`]. Returns how many steps ran.
pub fn run_migrations(conn: &Connection) -> Result<u32> {
    let from = current_version(conn)?;
    let target = latest_version();
    if from >= target {
        debug!(level = from, "schema up to date");
        return Ok(0);
    }

    for (level, (summary, sql)) in (1..).zip(STEPS).skip(from as usize) {
        info!(level, summary = *summary, "upgrading schema");
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| migration_error(level, "begin", &e))?;
        tx.execute_batch(sql)
            .map_err(|e| migration_error(level, summary, &e))?;
        tx.pragma_update(None, "user_version", level)
            .map_err(|e| migration_error(level, "record level", &e))?;
        tx.commit()
            .map_err(|e| migration_error(level, "commit", &e))?;
    }
    Ok(target - from)
}

/// Schema level stored in the database file; 0 for a fresh file.
pub fn current_version(conn: &Connection) -> Result<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| StoreError::Migration {
            message: format!("cannot read user_version: {e}"),
        })
}

/// Highest level this build knows how to create.
pub fn latest_version() -> u32 {
    STEPS.len() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migrated() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(run_migrations(&conn).unwrap(), latest_version());
        conn
    }

    #[test]
    fn fresh_file_reaches_latest_level() {
        let conn = migrated();
        assert_eq!(current_version(&conn).unwrap(), latest_version());
        assert_eq!(run_migrations(&conn).unwrap(), 0);
    }

    #[test]
    fn creates_character_tables() {
        let conn = migrated();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        for table in ["character_translations", "characters", "work_translations", "works"] {
            assert!(names.iter().any(|n| n == table), "{table} missing from {names:?}");
        }
    }

    #[test]
    fn unknown_role_is_refused() {
        let conn = migrated();
        let _ = conn
            .execute("INSERT INTO works (title) VALUES ('Frieren')", [])
            .unwrap();
        let err = conn
            .execute(
                "INSERT INTO characters (work_id, role, name) VALUES (1, 'narrator', 'Himmel')",
                [],
            )
            .unwrap_err();
        assert!(err.to_string().contains("CHECK"));
    }
}
