//! Extraction planning: which characters need vectors this run.
//!
//! A character is planned when it has no resolvable previous semantic
//! vector, or when its primary image reference differs from the one the
//! previous vectors were derived from. Everything else carries forward,
//! which is what makes an interrupted run resumable.

use animatch_core::Snapshot;
use serde::Serialize;
use tracing::{debug, info};

use crate::reconcile::PreviousIndex;
use crate::source::SourceCharacter;

/// Why a character is being (re)extracted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanReason {
    /// No previous vector resolves.
    MissingVector,
    /// The primary image reference changed.
    ImageChanged,
    /// Re-extraction requested for every character.
    Forced,
    /// The previous snapshot was built with other model settings.
    ModelChanged,
}

/// Why a character needing vectors cannot be extracted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unextractable {
    /// The primary has no image reference.
    NoImage,
    /// The primary is an audience stand-in without a character image.
    AudienceViewpoint,
}

/// One extraction task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedExtraction {
    /// Partner identifier (the record key).
    pub partner_id: i64,
    /// Primary identifier (names the cached image).
    pub primary_id: i64,
    /// Canonical partner name, for logs and duplicate reports.
    pub name: String,
    /// Primary image reference.
    pub image: String,
    /// Why it was planned.
    pub reason: PlanReason,
}

/// Planned tasks plus characters that need vectors but cannot get them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractionPlan {
    /// Tasks in source order.
    pub tasks: Vec<PlannedExtraction>,
    /// `(partner_id, reason)` for characters that cannot be extracted.
    pub unextractable: Vec<(i64, Unextractable)>,
}

impl ExtractionPlan {
    /// Whether there is nothing to extract.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Select the characters in `source` that need extraction.
pub fn plan_extractions(
    source: &[SourceCharacter],
    previous: Option<&Snapshot>,
    force: bool,
) -> ExtractionPlan {
    let index = PreviousIndex::new(previous, source);
    let mut plan = ExtractionPlan::default();

    for character in source {
        let reason = if force {
            Some(PlanReason::Forced)
        } else {
            match index.resolve(character) {
                None => Some(PlanReason::MissingVector),
                Some((prior, _)) if prior.primary.image != character.primary.image => {
                    character.primary.image.is_some().then_some(PlanReason::ImageChanged)
                }
                Some(_) => None,
            }
        };
        let Some(reason) = reason else {
            continue;
        };

        if character.is_audience_viewpoint() {
            debug!(character_id = character.key(), "audience viewpoint primary, not extracted");
            plan.unextractable
                .push((character.key(), Unextractable::AudienceViewpoint));
            continue;
        }
        let Some(image) = character.primary.image.clone() else {
            debug!(character_id = character.key(), "primary has no image, not extracted");
            plan.unextractable.push((character.key(), Unextractable::NoImage));
            continue;
        };

        plan.tasks.push(PlannedExtraction {
            partner_id: character.key(),
            primary_id: character.primary.id,
            name: character.key_name().to_string(),
            image,
            reason,
        });
    }

    info!(
        planned = plan.tasks.len(),
        unextractable = plan.unextractable.len(),
        force,
        "extraction plan ready"
    );
    plan
}
