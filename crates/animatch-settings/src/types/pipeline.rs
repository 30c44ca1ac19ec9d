//! Extraction, duplicate detection, and logging settings.

use animatch_core::constants::{DUPLICATE_THRESHOLD, EMBEDDING_PRECISION, SIMILARITY_PRECISION};
use serde::{Deserialize, Serialize};

/// Image fetch and vector extraction.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractionSettings {
    /// Decimal places kept per embedding component.
    pub precision: u32,
    /// Characters processed concurrently.
    pub concurrency: usize,
    /// Timeout for a single image download (one attempt, no retry).
    pub fetch_timeout_ms: u64,
    /// Wall-clock bound on fetch + extraction for one character.
    pub task_timeout_ms: u64,
    /// User agent sent with image downloads.
    pub user_agent: String,
    /// Square input resolution of the visual encoder.
    pub semantic_input_size: u32,
    /// Square input resolution of the face network.
    pub facial_input_size: u32,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            precision: EMBEDDING_PRECISION,
            concurrency: 4,
            fetch_timeout_ms: 15_000,
            task_timeout_ms: 60_000,
            user_agent: "AniMatch/1.0 (Character Embedding Generator)".to_string(),
            semantic_input_size: 224,
            facial_input_size: 112,
        }
    }
}

/// Duplicate detection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DuplicateSettings {
    /// Exclusive cosine similarity threshold.
    pub threshold: f64,
    /// Decimal places for reported scores.
    pub score_precision: u32,
}

impl Default for DuplicateSettings {
    fn default() -> Self {
        Self {
            threshold: DUPLICATE_THRESHOLD,
            score_precision: SIMILARITY_PRECISION,
        }
    }
}

/// Log output.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level (`RUST_LOG` still wins).
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
