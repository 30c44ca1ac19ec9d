//! Model identity and ONNX file locations.

use animatch_core::constants::{
    DEFAULT_MODEL_IDENTIFIER, DEFAULT_PRETRAINED_TAG, EMBEDDING_DIMENSION,
};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Encoder models used for extraction.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelSettings {
    /// Semantic model identifier recorded in the snapshot.
    pub model_identifier: String,
    /// Pretrained weights tag recorded in the snapshot.
    pub pretrained_tag: String,
    /// Output dimension of both encoders.
    pub embedding_dimension: usize,
    /// ONNX file for the visual encoder.
    pub semantic_model: String,
    /// ONNX file for the face-recognition network. Facial vectors are
    /// skipped when `None` or when the file is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facial_model: Option<String>,
    /// Hugging Face repository to fetch missing model files from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hf_repo: Option<String>,
    /// Where downloaded model files are kept. `~/` expands to `$HOME`.
    pub cache_dir: String,
    /// Intra-op threads per inference session.
    pub intra_threads: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_identifier: DEFAULT_MODEL_IDENTIFIER.to_string(),
            pretrained_tag: DEFAULT_PRETRAINED_TAG.to_string(),
            embedding_dimension: EMBEDDING_DIMENSION,
            semantic_model: "ml/models/clip_vision.onnx".to_string(),
            facial_model: Some("ml/models/mobilefacenet.onnx".to_string()),
            hf_repo: None,
            cache_dir: "~/.animatch/models".to_string(),
            intra_threads: 2,
        }
    }
}

impl ModelSettings {
    /// [`Self::cache_dir`] with a leading `~/` replaced by `$HOME`.
    pub fn model_cache_dir(&self) -> PathBuf {
        match (self.cache_dir.strip_prefix("~/"), std::env::var_os("HOME")) {
            (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
            _ => PathBuf::from(&self.cache_dir),
        }
    }
}
