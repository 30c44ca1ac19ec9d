//! # animatch-store
//!
//! The relational source of truth and the snapshot built from it:
//! - [`CharacterSource`]: read-only query surface, with a `SQLite` backend
//!   in [`sqlite`] that also owns character creation
//! - [`plan_extractions`]: which characters need vectors this run
//! - [`reconcile`]: merge fresh metadata with computed or carried vectors
//! - [`codec`]: canonical JSON plus gzip, written atomically

#![deny(unsafe_code)]

pub mod codec;
pub mod errors;
pub mod plan;
pub mod reconcile;
pub mod source;
pub mod sqlite;

#[cfg(test)]
mod test_support;

pub use codec::{WrittenSnapshot, compressed_path, read_snapshot, write_snapshot};
pub use errors::{Result, StoreError};
pub use plan::{ExtractionPlan, PlanReason, PlannedExtraction, Unextractable, plan_extractions};
pub use reconcile::{
    ComputedVectors, MatchKind, PreviousIndex, ReconcileReport, Reconciliation,
    UnmatchedCharacter, reconcile,
};
pub use source::{CharacterSource, CreatedIds, NewCharacter, NewPartner, NewPrimary, NewWork, SourceCharacter};
pub use sqlite::SqliteCharacterSource;
