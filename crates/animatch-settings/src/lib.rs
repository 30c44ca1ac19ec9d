//! # animatch-settings
//!
//! Configuration for the embedding pipeline, loaded from three layers
//! (in priority order):
//! 1. **Compiled defaults**: [`AnimatchSettings::default()`]
//! 2. **User file**: `~/.animatch/settings.json` or an explicit path
//!    (deep-merged over defaults)
//! 3. **Environment variables**: `ANIMATCH_*` overrides (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use animatch_settings::load_settings;
//!
//! let settings = load_settings().unwrap_or_default();
//! println!("snapshot: {}", settings.paths.snapshot);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
