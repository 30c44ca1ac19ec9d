//! Batch character creation.
//!
//! Each request becomes one work, one primary, and one partner in the
//! relational store. A dry run validates everything and reports the ids the
//! inserts would receive without writing.

use std::path::Path;

use animatch_store::{CreatedIds, NewCharacter, SqliteCharacterSource};
use serde::Serialize;
use tracing::info;

use crate::errors::Result;

/// Ids for one request, real or predicted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CreatedCharacter {
    /// Canonical partner name from the request.
    pub name: String,
    /// Assigned (or predicted) identifiers.
    pub ids: CreatedIds,
}

/// Read a batch file: a JSON array of requests, or a single request.
pub fn read_batch(path: &Path) -> Result<Vec<NewCharacter>> {
    let body = std::fs::read_to_string(path)?;
    Ok(NewCharacter::parse_batch(&body)?)
}

/// Create every request, or with `dry_run` only predict their ids.
///
/// All requests are validated before the first insert, so a bad entry
/// anywhere in the batch leaves the store untouched.
pub fn create_batch(
    source: &SqliteCharacterSource,
    requests: &[NewCharacter],
    dry_run: bool,
) -> Result<Vec<CreatedCharacter>> {
    for request in requests {
        request.validate()?;
    }

    let mut created = Vec::with_capacity(requests.len());
    if dry_run {
        let base = source.predict_ids()?;
        for (i, request) in requests.iter().enumerate() {
            let step = i as i64;
            created.push(CreatedCharacter {
                name: request.partner.name.canonical.clone(),
                ids: CreatedIds {
                    work_id: base.work_id + step,
                    primary_id: base.primary_id + 2 * step,
                    partner_id: base.partner_id + 2 * step,
                },
            });
        }
        info!(count = created.len(), "dry run, nothing created");
        return Ok(created);
    }

    for request in requests {
        let ids = source.create_character_pair(request)?;
        created.push(CreatedCharacter {
            name: request.partner.name.canonical.clone(),
            ids,
        });
    }
    info!(count = created.len(), "batch created");
    Ok(created)
}
