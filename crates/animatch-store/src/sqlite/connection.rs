//! `SQLite` connections with foreign keys enabled.
//!
//! The pipeline is a single process doing short reads plus one creation
//! transaction per new character, so a single connection behind a mutex is
//! enough; no pool is used.

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use crate::errors::Result;

/// Connection tuning.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Busy timeout in milliseconds (default: 30000).
    pub busy_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 30_000,
        }
    }
}

fn apply_pragmas(conn: &Connection, config: &ConnectionConfig) -> Result<()> {
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

/// Open (creating if needed) a file-backed database in WAL mode.
pub fn open_file(path: &Path, config: &ConnectionConfig) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    apply_pragmas(&conn, config)?;
    conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
    Ok(conn)
}

/// Open an in-memory database (for testing and dry runs).
pub fn open_in_memory(config: &ConnectionConfig) -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    apply_pragmas(&conn, config)?;
    Ok(conn)
}
