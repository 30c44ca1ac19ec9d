//! Snapshot persistence: canonical compact JSON plus a gzip twin.
//!
//! The compressed artifact is the canonical bytes run through maximum gzip
//! compression with a zeroed header timestamp, so identical snapshots give
//! identical files. Both files are written to temporaries in the target
//! directory and renamed into place only after both are complete.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use animatch_core::Snapshot;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::errors::Result;

/// Canonical compact encoding (no whitespace, fixed field order).
pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(snapshot)?)
}

/// Decode canonical bytes, checking the declared count and dimensions.
pub fn decode(bytes: &[u8]) -> Result<Snapshot> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Gzip `bytes` at maximum compression.
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// Inflate a gzip stream.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let _ = GzDecoder::new(bytes).read_to_end(&mut out)?;
    Ok(out)
}

/// Path of the compressed twin: `<path>.gz`.
pub fn compressed_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".gz");
    PathBuf::from(name)
}

/// Sizes of a completed write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct WrittenSnapshot {
    /// Canonical file size in bytes.
    pub canonical_bytes: usize,
    /// Compressed file size in bytes.
    pub compressed_bytes: usize,
}

/// Read the previous snapshot, or `None` if the canonical file is absent.
pub fn read_snapshot(path: &Path) -> Result<Option<Snapshot>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no previous snapshot");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    let snapshot = decode(&bytes)?;
    debug!(path = %path.display(), records = snapshot.record_count(), "loaded previous snapshot");
    Ok(Some(snapshot))
}

fn stage(dir: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    Ok(file)
}

/// Write `snapshot` to `path` and `<path>.gz`, each replaced atomically.
///
/// Both payloads are fully staged before either rename happens, so a
/// failure while encoding or writing leaves the previous files untouched.
pub fn write_snapshot(snapshot: &Snapshot, path: &Path) -> Result<WrittenSnapshot> {
    let canonical = encode(snapshot)?;
    let compressed = compress(&canonical)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let staged_canonical = stage(&dir, &canonical)?;
    let staged_compressed = stage(&dir, &compressed)?;
    let _ = staged_canonical.persist(path).map_err(|e| e.error)?;
    let _ = staged_compressed
        .persist(compressed_path(path))
        .map_err(|e| e.error)?;

    let written = WrittenSnapshot {
        canonical_bytes: canonical.len(),
        compressed_bytes: compressed.len(),
    };
    info!(
        path = %path.display(),
        records = snapshot.record_count(),
        canonical_kb = written.canonical_bytes / 1024,
        compressed_kb = written.compressed_bytes / 1024,
        "snapshot written"
    );
    Ok(written)
}
