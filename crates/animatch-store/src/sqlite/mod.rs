//! `SQLite` backend for the relational character source.
//!
//! - **[`connection`]**: connections with foreign keys (and WAL for files).
//! - **[`migrations`]**: version-tracked schema, embedded at compile time.
//! - **[`row_types`]**: raw row structs for `rusqlite` mapping.
//! - **[`repositories`]**: stateless repositories taking `&Connection`.
//! - **[`source`]**: [`SqliteCharacterSource`], assembling rows into
//!   [`crate::SourceCharacter`]s and owning the creation transaction.

pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod row_types;
pub mod source;

pub use connection::{ConnectionConfig, open_file, open_in_memory};
pub use migrations::{current_version, latest_version, run_migrations};
pub use source::SqliteCharacterSource;
