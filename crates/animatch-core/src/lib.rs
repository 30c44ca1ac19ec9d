//! # animatch-core
//!
//! Foundation types shared by every AniMatch crate:
//! - [`CharacterRecord`]: one matchable pair (primary + partner) with its work
//!   metadata and precomputed vectors
//! - [`Embedding`]: a fixed-length, unit-norm vector rounded to a fixed precision
//! - [`Localized`]: a canonical value plus per-language translations
//! - [`Snapshot`]: the persisted record set whose declared count always
//!   matches its contents
//!
//! Also hosts the shared error type and the `tracing` subscriber setup.

#![deny(unsafe_code)]

pub mod constants;
pub mod embedding;
pub mod errors;
pub mod localized;
pub mod logging;
pub mod record;
pub mod snapshot;

pub use embedding::{Embedding, EmbeddingKind, round_component};
pub use errors::{CoreError, Result};
pub use localized::Localized;
pub use record::{CharacterRecord, Orientation, PartnerCharacter, PrimaryCharacter, WorkInfo};
pub use snapshot::{Snapshot, SnapshotHeader};
