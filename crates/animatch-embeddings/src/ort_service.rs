//! ONNX Runtime image encoders (feature-gated behind `ort`).
//!
//! Model files are read from the configured local paths. When a file is
//! missing and `models.hfRepo` is set, it is downloaded via `hf-hub` into
//! the model cache first.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use animatch_core::EmbeddingKind;
use animatch_settings::{AnimatchSettings, ModelSettings};
use image::RgbImage;
use tracing::{debug, info, warn};

use crate::config::ExtractorConfig;
use crate::encoder::ImageEncoder;
use crate::errors::{EmbeddingError, Result};
use crate::extractor::VectorExtractor;
use crate::preprocess::{InputTensor, facial_input, semantic_input};

/// An image encoder backed by an ONNX Runtime session.
///
/// The session is created once and guarded by a mutex because `run` needs
/// mutable access; model weights are never modified.
pub struct OnnxImageEncoder {
    kind: EmbeddingKind,
    dims: usize,
    input_size: u32,
    session: parking_lot::Mutex<ort::session::Session>,
}

impl OnnxImageEncoder {
    /// Load a model file into a new session.
    pub fn load(
        path: &Path,
        kind: EmbeddingKind,
        dims: usize,
        input_size: u32,
        intra_threads: usize,
    ) -> Result<Self> {
        info!(model = %path.display(), %kind, "loading ONNX model");
        let session = ort::session::Session::builder()
            .map_err(|e| EmbeddingError::ModelInit(format!("session builder: {e}")))?
            .with_intra_threads(intra_threads)
            .map_err(|e| EmbeddingError::ModelInit(format!("thread config: {e}")))?
            .with_log_level(ort::logging::LogLevel::Warning)
            .map_err(|e| EmbeddingError::ModelInit(format!("log level: {e}")))?
            .commit_from_file(path)
            .map_err(|e| EmbeddingError::ModelInit(format!("model load: {e}")))?;
        Ok(Self {
            kind,
            dims,
            input_size,
            session: parking_lot::Mutex::new(session),
        })
    }

    fn preprocess(&self, image: &RgbImage) -> Result<InputTensor> {
        match self.kind {
            EmbeddingKind::Semantic => semantic_input(image, self.input_size),
            EmbeddingKind::Facial => facial_input(image, self.input_size),
        }
    }
}

impl ImageEncoder for OnnxImageEncoder {
    fn kind(&self) -> EmbeddingKind {
        self.kind
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn encode(&self, image: &RgbImage) -> Result<Vec<f32>> {
        let input = self.preprocess(image)?;
        let shape: Vec<i64> = input.shape.iter().map(|d| *d as i64).collect();
        let tensor = ort::value::Tensor::from_array((shape, input.data))
            .map_err(|e| EmbeddingError::Inference(format!("input tensor: {e}")))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| EmbeddingError::Inference(format!("inference: {e}")))?;

        // Output shape: [1, dims]
        let (output_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbeddingError::Inference(format!("extract tensor: {e}")))?;
        if output_shape.first().copied() != Some(1) {
            return Err(EmbeddingError::Inference(format!(
                "unexpected output shape: {output_shape:?}"
            )));
        }
        Ok(data.to_vec())
    }
}

/// Locate a model file, downloading it when missing and a repo is configured.
///
/// Returns `Ok(None)` when the file is absent and cannot be fetched.
pub fn resolve_model(file: &str, models: &ModelSettings) -> Result<Option<PathBuf>> {
    let local = PathBuf::from(file);
    if local.exists() {
        return Ok(Some(local));
    }
    let Some(repo) = &models.hf_repo else {
        return Ok(None);
    };
    let file_name = local
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| EmbeddingError::Config(format!("invalid model path: {file}")))?;

    let cache_dir = models.model_cache_dir();
    debug!(cache_dir = %cache_dir.display(), %repo, file_name, "downloading model via hf-hub");
    let api = hf_hub::api::sync::ApiBuilder::new()
        .with_cache_dir(cache_dir)
        .build()
        .map_err(|e| EmbeddingError::ModelInit(format!("hf-hub api: {e}")))?;
    let path = api
        .model(repo.clone())
        .get(file_name)
        .map_err(|e| EmbeddingError::ModelInit(format!("model download ({file_name}): {e}")))?;
    info!(model = %path.display(), "model file ready");
    Ok(Some(path))
}

/// Load both encoders described by `settings`.
///
/// The semantic model is required. The facial model is skipped (with a
/// warning) when unset, missing, or failing to load.
pub fn load_extractor(settings: &AnimatchSettings) -> Result<VectorExtractor> {
    let models = &settings.models;
    let config = ExtractorConfig::from_settings(settings);

    let semantic_path = resolve_model(&models.semantic_model, models)?.ok_or_else(|| {
        EmbeddingError::Config(format!("semantic model not found: {}", models.semantic_model))
    })?;
    let semantic = OnnxImageEncoder::load(
        &semantic_path,
        EmbeddingKind::Semantic,
        config.dimensions,
        config.semantic_input_size,
        models.intra_threads,
    )?;

    let facial = models
        .facial_model
        .as_deref()
        .and_then(|file| match resolve_model(file, models) {
            Ok(Some(path)) => Some(path),
            Ok(None) => {
                warn!(model = file, "facial model not found, facial vectors disabled");
                None
            }
            Err(error) => {
                warn!(model = file, %error, "facial model unavailable, facial vectors disabled");
                None
            }
        })
        .and_then(|path| {
            OnnxImageEncoder::load(
                &path,
                EmbeddingKind::Facial,
                config.dimensions,
                config.facial_input_size,
                models.intra_threads,
            )
            .inspect_err(|error| warn!(%error, "facial model failed to load"))
            .ok()
        })
        .map(|enc| Arc::new(enc) as Arc<dyn ImageEncoder>);

    VectorExtractor::new(Arc::new(semantic), facial, config)
}
