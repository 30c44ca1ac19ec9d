//! File locations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the relational source, snapshot, and image cache live.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PathSettings {
    /// `SQLite` database holding the relational metadata.
    pub database: String,
    /// Canonical snapshot path. The compressed twin is `<snapshot>.gz`.
    pub snapshot: String,
    /// Directory for downloaded source images. Disabled when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_cache: Option<String>,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            database: "db/animatch.db".to_string(),
            snapshot: "public/embeddings.json".to_string(),
            image_cache: Some("ml/images/primary".to_string()),
        }
    }
}

impl PathSettings {
    /// Path of the compressed snapshot twin.
    pub fn compressed_snapshot(&self) -> PathBuf {
        PathBuf::from(format!("{}.gz", self.snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressed_snapshot_appends_gz() {
        let paths = PathSettings::default();
        assert_eq!(
            paths.compressed_snapshot(),
            PathBuf::from("public/embeddings.json.gz")
        );
    }
}
