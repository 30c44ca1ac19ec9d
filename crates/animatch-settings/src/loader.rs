//! Where settings come from, in increasing precedence: compiled defaults,
//! the user's `settings.json` layered on top, then `ANIMATCH_*` variables.
//!
//! Layering works on the JSON tree. Nested objects combine key by key,
//! anything else in the file wins outright, and an explicit `null` in the
//! file leaves the default alone.

use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::AnimatchSettings;

/// `$HOME/.animatch/settings.json`, or under `/tmp` when `HOME` is unset.
pub fn settings_path() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("/tmp"), PathBuf::from)
        .join(".animatch")
        .join("settings.json")
}

/// [`load_settings_from_path`] on [`settings_path`].
pub fn load_settings() -> Result<AnimatchSettings> {
    load_settings_from_path(&settings_path())
}

/// Build settings from `path` plus the environment.
///
/// A missing file is not an error. Unreadable or malformed files are, and
/// so is any value [`AnimatchSettings::validate`] rejects after layering.
pub fn load_settings_from_path(path: &Path) -> Result<AnimatchSettings> {
    let parse_err = |source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let mut tree = serde_json::to_value(AnimatchSettings::default()).map_err(parse_err)?;
    match std::fs::read_to_string(path) {
        Ok(text) => {
            debug!(path = %path.display(), "layering settings file over defaults");
            let user: Value = serde_json::from_str(&text).map_err(parse_err)?;
            tree = deep_merge(tree, user);
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no settings file, defaults only");
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    }

    let mut settings: AnimatchSettings = serde_json::from_value(tree).map_err(parse_err)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Layer `overlay` onto `base` following the rules in the module docs.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut out), Value::Object(layer)) => {
            for (key, value) in layer.into_iter().filter(|(_, v)| !v.is_null()) {
                let combined = match out.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                let _ = out.insert(key, combined);
            }
            Value::Object(out)
        }
        (_, scalar_or_array) => scalar_or_array,
    }
}

/// Overwrite fields from `ANIMATCH_*` variables.
///
/// Numeric variables outside their accepted range are reported and skipped.
pub fn apply_env_overrides(settings: &mut AnimatchSettings) {
    let paths = &mut settings.paths;
    if let Some(v) = env_text("ANIMATCH_DATABASE") {
        paths.database = v;
    }
    if let Some(v) = env_text("ANIMATCH_SNAPSHOT") {
        paths.snapshot = v;
    }
    if let Some(v) = env_text("ANIMATCH_IMAGE_CACHE") {
        paths.image_cache = Some(v);
    }

    let models = &mut settings.models;
    if let Some(v) = env_text("ANIMATCH_SEMANTIC_MODEL") {
        models.semantic_model = v;
    }
    if let Some(v) = env_text("ANIMATCH_FACIAL_MODEL") {
        models.facial_model = Some(v);
    }

    let extraction = &mut settings.extraction;
    if let Some(v) = env_in_range("ANIMATCH_CONCURRENCY", &(1..=256)) {
        extraction.concurrency = v;
    }
    if let Some(v) = env_in_range("ANIMATCH_FETCH_TIMEOUT_MS", &(100..=600_000)) {
        extraction.fetch_timeout_ms = v;
    }

    if let Some(v) = env_in_range("ANIMATCH_DUPLICATE_THRESHOLD", &(0.0..=1.0)) {
        settings.duplicates.threshold = v;
    }
    if let Some(v) = env_text("ANIMATCH_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

/// Parse `raw` and keep it only when it falls inside `bounds`.
///
/// NaN never compares inside a range, so float inputs need no extra check.
pub fn parse_in_range<T>(raw: &str, bounds: &RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    raw.trim().parse().ok().filter(|n| bounds.contains(n))
}

fn env_text(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_in_range<T>(name: &str, bounds: &RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd + Display,
{
    let raw = std::env::var(name).ok()?;
    let parsed = parse_in_range(&raw, bounds);
    if parsed.is_none() {
        warn!(
            var = name,
            value = %raw,
            min = %bounds.start(),
            max = %bounds.end(),
            "ignoring out-of-range environment override"
        );
    }
    parsed
}
