//! Image retrieval for extraction tasks.
//!
//! `http(s)://` references are downloaded with a single attempt under a
//! bounded timeout; anything else is read as a local path. With a cache
//! directory configured, downloads are kept as
//! `<primary_id>-<reference digest>.<ext>` and reused on later runs, so a
//! primary whose image reference changes is downloaded afresh.

use std::ffi::OsString;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use animatch_settings::AnimatchSettings;
use async_trait::async_trait;
use image::RgbImage;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::errors::{Result, SyncError};

const KNOWN_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];
const FALLBACK_EXTENSION: &str = "jpg";

/// Source of raw image bytes for a primary character.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    /// Bytes of the image behind `reference`.
    async fn load(&self, primary_id: i64, reference: &str) -> Result<Vec<u8>>;
}

/// Decode fetched bytes into an RGB bitmap.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

/// Whether `reference` is fetched over the network.
pub fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Extension used for the cached copy, taken from the reference path.
pub fn cache_extension(reference: &str) -> &str {
    let path = reference.split(['?', '#']).next().unwrap_or(reference);
    let ext = path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext);
    match ext {
        Some(ext) if KNOWN_EXTENSIONS.iter().any(|k| k.eq_ignore_ascii_case(ext)) => ext,
        _ => FALLBACK_EXTENSION,
    }
}

/// Cache file name for `reference`: primary id, first 8 bytes of the
/// reference's SHA-256 in hex, and the reference's extension.
pub fn cache_file_name(primary_id: i64, reference: &str) -> String {
    let digest = Sha256::digest(reference.as_bytes());
    let mut name = format!("{primary_id}-");
    for byte in &digest[..8] {
        let _ = write!(name, "{byte:02x}");
    }
    let _ = write!(name, ".{}", cache_extension(reference));
    name
}

/// HTTP + filesystem [`ImageLoader`].
pub struct ImageFetcher {
    client: reqwest::Client,
    cache_dir: Option<PathBuf>,
    timeout_ms: u64,
}

impl ImageFetcher {
    /// Build a fetcher with an explicit user agent and per-request timeout.
    pub fn new(user_agent: &str, timeout: Duration, cache_dir: Option<PathBuf>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            cache_dir,
            timeout_ms: timeout.as_millis() as u64,
        })
    }

    /// Build from the extraction and path settings.
    pub fn from_settings(settings: &AnimatchSettings) -> Result<Self> {
        Self::new(
            &settings.extraction.user_agent,
            Duration::from_millis(settings.extraction.fetch_timeout_ms),
            settings.paths.image_cache.as_ref().map(PathBuf::from),
        )
    }

    /// Location of the cached copy of `reference`, if caching is on.
    pub fn cache_path(&self, primary_id: i64, reference: &str) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(cache_file_name(primary_id, reference)))
    }

    async fn download(&self, reference: &str) -> Result<Vec<u8>> {
        let response = self.client.get(reference).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                reference: reference.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        debug!(reference, bytes = bytes.len(), timeout_ms = self.timeout_ms, "downloaded image");
        Ok(bytes.to_vec())
    }

    /// Write `bytes` beside `path` and rename into place, so a reader never
    /// sees a partial file under the cache name.
    async fn store_cached(path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut staging = OsString::from(path.as_os_str());
        staging.push(".part");
        let staging = PathBuf::from(staging);

        tokio::fs::write(&staging, bytes).await?;
        if let Err(error) = tokio::fs::rename(&staging, path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(error.into());
        }
        Ok(())
    }
}

#[async_trait]
impl ImageLoader for ImageFetcher {
    async fn load(&self, primary_id: i64, reference: &str) -> Result<Vec<u8>> {
        if !is_remote(reference) {
            return Ok(tokio::fs::read(reference).await?);
        }

        let cached = self.cache_path(primary_id, reference);
        if let Some(path) = &cached {
            if let Ok(bytes) = tokio::fs::read(path).await {
                debug!(primary_id, path = %path.display(), "using cached image");
                return Ok(bytes);
            }
        }

        let bytes = self.download(reference).await?;
        if let Some(path) = &cached {
            // A cache write failure only costs a re-download next run.
            if let Err(error) = Self::store_cached(path, &bytes).await {
                warn!(primary_id, path = %path.display(), %error, "failed to cache image");
            }
        }
        Ok(bytes)
    }
}
