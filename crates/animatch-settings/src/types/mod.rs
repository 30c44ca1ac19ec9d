//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and implement
//! [`Default`] with production values. Every section is `#[serde(default)]`
//! so partial JSON files are accepted.

mod models;
mod paths;
mod pipeline;

pub use models::*;
pub use paths::*;
pub use pipeline::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// # JSON Format
///
/// ```json
/// {
///   "paths": { "snapshot": "public/embeddings.json" },
///   "extraction": { "concurrency": 8 },
///   "duplicates": { "threshold": 0.97 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimatchSettings {
    /// File locations.
    pub paths: PathSettings,
    /// Model identity and ONNX files.
    pub models: ModelSettings,
    /// Fetch and extraction behavior.
    pub extraction: ExtractionSettings,
    /// Duplicate detection.
    pub duplicates: DuplicateSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl AnimatchSettings {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.models.embedding_dimension == 0 {
            return Err(SettingsError::invalid("embeddingDimension", "must be positive"));
        }
        if self.extraction.concurrency == 0 {
            return Err(SettingsError::invalid("concurrency", "must be at least 1"));
        }
        if self.extraction.precision > 9 {
            return Err(SettingsError::invalid(
                "precision",
                format!("{} exceeds 9 decimal places", self.extraction.precision),
            ));
        }
        if !(0.0..=1.0).contains(&self.duplicates.threshold) {
            return Err(SettingsError::invalid(
                "threshold",
                format!("{} outside [0, 1]", self.duplicates.threshold),
            ));
        }
        if self.extraction.semantic_input_size == 0 {
            return Err(SettingsError::invalid("semanticInputSize", "must be positive"));
        }
        if self.extraction.facial_input_size == 0 {
            return Err(SettingsError::invalid("facialInputSize", "must be positive"));
        }
        Ok(())
    }
}
