//! The sync run: plan, extract concurrently, gate on duplicates, reconcile,
//! persist.
//!
//! Workers only fetch and extract; every decision that depends on other
//! characters (duplicate checks, the computed-vector map, counters) happens
//! in one accumulation pass over the results, in source order.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use animatch_core::{Embedding, Snapshot, SnapshotHeader};
use animatch_embeddings::{
    DuplicateCandidate, DuplicateDetector, ExtractedVectors, PopulationEntry, VectorExtractor,
};
use animatch_settings::AnimatchSettings;
use animatch_store::{
    CharacterSource, ComputedVectors, PlanReason, PlannedExtraction, PreviousIndex,
    SourceCharacter, Unextractable, UnmatchedCharacter, WrittenSnapshot, plan_extractions,
    read_snapshot, reconcile, write_snapshot,
};
use futures::StreamExt;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::{Result, SyncError};
use crate::fetch::{ImageLoader, decode_rgb};

/// Run-wide parameters.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Model metadata written to the snapshot.
    pub header: SnapshotHeader,
    /// Canonical snapshot path; the compressed twin sits beside it.
    pub snapshot_path: PathBuf,
    /// Extraction tasks in flight at once.
    pub concurrency: usize,
    /// Wall-clock bound on one task's fetch plus extraction.
    pub task_timeout: Duration,
}

impl PipelineConfig {
    /// Derive from loaded settings.
    pub fn from_settings(settings: &AnimatchSettings) -> Self {
        Self {
            header: SnapshotHeader {
                model_identifier: settings.models.model_identifier.clone(),
                pretrained_tag: settings.models.pretrained_tag.clone(),
                embedding_dimension: settings.models.embedding_dimension,
            },
            snapshot_path: PathBuf::from(&settings.paths.snapshot),
            concurrency: settings.extraction.concurrency,
            task_timeout: Duration::from_millis(settings.extraction.task_timeout_ms),
        }
    }
}

/// Options for a single run.
#[derive(Clone, Debug, Default)]
pub struct SyncOptions {
    /// Re-extract every character, not only missing or changed ones.
    pub force: bool,
    /// Compute and report, but leave the snapshot files untouched.
    pub dry_run: bool,
    /// Restrict extraction to these partner ids. Reconciliation still
    /// covers the whole source.
    pub only: Option<HashSet<i64>>,
}

/// Stage at which a character's extraction was abandoned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipStage {
    /// Image could not be retrieved.
    Fetch,
    /// Image bytes could not be decoded.
    Decode,
    /// Semantic embedding failed.
    Extraction,
    /// The task exceeded its time bound.
    Timeout,
}

/// A planned character that produced no vectors this run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkippedCharacter {
    /// Partner identifier.
    pub id: i64,
    /// Canonical partner name.
    pub name: String,
    /// Where it failed.
    pub stage: SkipStage,
    /// Error text.
    pub reason: String,
}

/// Near-duplicates found for one freshly extracted character.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DuplicateReport {
    /// Partner identifier of the new vector's owner.
    pub id: i64,
    /// Canonical partner name.
    pub name: String,
    /// Existing characters above the threshold.
    pub candidates: Vec<DuplicateCandidate>,
}

/// End-of-run counts and per-character details.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunSummary {
    /// Characters in the relational source.
    pub source_count: usize,
    /// Extraction tasks planned.
    pub planned: usize,
    /// Tasks that produced vectors.
    pub processed: usize,
    /// Of `processed`, how many have a facial vector.
    pub with_facial: usize,
    /// Tasks that failed.
    pub skipped: Vec<SkippedCharacter>,
    /// Characters needing vectors that cannot be extracted.
    pub unextractable: Vec<(i64, Unextractable)>,
    /// Accepted vectors with near-duplicates.
    pub duplicates: Vec<DuplicateReport>,
    /// Records in the next snapshot.
    pub matched: usize,
    /// Records whose vectors carried forward.
    pub carried_forward: usize,
    /// Of `carried_forward`, how many were matched by name.
    pub matched_by_name: usize,
    /// Source characters excluded for lack of a semantic vector.
    pub unmatched: Vec<UnmatchedCharacter>,
    /// Sizes written, or `None` on a dry run.
    pub written: Option<WrittenSnapshot>,
}

impl RunSummary {
    /// Number of accepted vectors flagged as near-duplicates.
    pub fn duplicate_flagged(&self) -> usize {
        self.duplicates.len()
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "processed={} skipped={} duplicate_flagged={} matched={} unmatched={}",
            self.processed,
            self.skipped.len(),
            self.duplicate_flagged(),
            self.matched,
            self.unmatched.len()
        )?;
        writeln!(
            f,
            "source={} planned={} with_facial={} carried_forward={} matched_by_name={}",
            self.source_count, self.planned, self.with_facial, self.carried_forward, self.matched_by_name
        )?;
        for s in &self.skipped {
            writeln!(f, "  skipped   #{} {} ({:?}): {}", s.id, s.name, s.stage, s.reason)?;
        }
        for (id, why) in &self.unextractable {
            writeln!(f, "  no image  #{id} ({why:?})")?;
        }
        for d in &self.duplicates {
            for c in &d.candidates {
                writeln!(
                    f,
                    "  duplicate #{} {} ~ #{} {} ({:.4})",
                    d.id, d.name, c.id, c.name, c.similarity
                )?;
            }
        }
        for u in &self.unmatched {
            writeln!(f, "  unmatched #{} {}", u.id, u.name)?;
        }
        match self.written {
            Some(w) => write!(
                f,
                "snapshot written: {} bytes canonical, {} bytes compressed",
                w.canonical_bytes, w.compressed_bytes
            ),
            None => write!(f, "dry run: snapshot not written"),
        }
    }
}

/// Outcome of one worker task.
enum TaskOutcome {
    Computed(ExtractedVectors),
    Skipped(SkipStage, String),
}

/// Everything a sync run needs, loaded once and shared read-only.
pub struct SyncPipeline {
    source: Arc<dyn CharacterSource>,
    loader: Arc<dyn ImageLoader>,
    extractor: VectorExtractor,
    detector: DuplicateDetector,
    config: PipelineConfig,
}

impl SyncPipeline {
    /// Assemble a pipeline.
    pub fn new(
        source: Arc<dyn CharacterSource>,
        loader: Arc<dyn ImageLoader>,
        extractor: VectorExtractor,
        detector: DuplicateDetector,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            loader,
            extractor,
            detector,
            config,
        }
    }

    /// Run configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute one sync run.
    ///
    /// A previous snapshot built with other model settings gets every
    /// character re-extracted, and its vectors are left out of duplicate
    /// checks.
    pub async fn run(&self, options: &SyncOptions) -> Result<RunSummary> {
        let previous = read_snapshot(&self.config.snapshot_path)?;
        let characters = self.source.fetch_all_characters()?;

        let model_changed = previous
            .as_ref()
            .is_some_and(|p| header_differs(p, &self.config.header));
        let mut plan = plan_extractions(&characters, previous.as_ref(), options.force || model_changed);
        if model_changed && !options.force {
            for task in &mut plan.tasks {
                task.reason = PlanReason::ModelChanged;
            }
        }
        if let Some(only) = &options.only {
            plan.tasks.retain(|t| only.contains(&t.partner_id));
            plan.unextractable.retain(|(id, _)| only.contains(id));
        }

        let mut summary = RunSummary {
            source_count: characters.len(),
            planned: plan.tasks.len(),
            unextractable: plan.unextractable,
            ..RunSummary::default()
        };

        let computed = {
            let established = if model_changed {
                Vec::new()
            } else {
                established_population(previous.as_ref(), &characters)
            };
            let outcomes = self.extract_all(plan.tasks).await;
            self.accumulate(outcomes, &established, &mut summary)
        };

        finish(&self.config, characters, previous.as_ref(), &computed, options.dry_run, &mut summary)?;
        Ok(summary)
    }

    async fn extract_all(&self, tasks: Vec<PlannedExtraction>) -> Vec<(PlannedExtraction, TaskOutcome)> {
        let total = tasks.len();
        let concurrency = self.config.concurrency.max(1);
        info!(total, concurrency, facial = self.extractor.has_facial(), "extracting");

        let mut results: Vec<(usize, PlannedExtraction, TaskOutcome)> =
            futures::stream::iter(tasks.into_iter().enumerate())
                .map(|(index, task)| async move {
                    let outcome = self.extract_one(&task).await;
                    (index, task, outcome)
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;
        results.sort_by_key(|(index, _, _)| *index);
        results.into_iter().map(|(_, task, outcome)| (task, outcome)).collect()
    }

    async fn fetch_and_extract(
        &self,
        task: &PlannedExtraction,
    ) -> std::result::Result<ExtractedVectors, (SkipStage, SyncError)> {
        let bytes = self
            .loader
            .load(task.primary_id, &task.image)
            .await
            .map_err(|e| (SkipStage::Fetch, e))?;
        let extractor = self.extractor.clone();
        tokio::task::spawn_blocking(move || -> std::result::Result<ExtractedVectors, (SkipStage, SyncError)> {
            let image = decode_rgb(&bytes).map_err(|e| (SkipStage::Decode, e))?;
            extractor
                .extract(&image)
                .map_err(|e| (SkipStage::Extraction, SyncError::from(e)))
        })
        .await
        .map_err(|e| (SkipStage::Extraction, SyncError::from(e)))?
    }

    async fn extract_one(&self, task: &PlannedExtraction) -> TaskOutcome {
        let bound = self.config.task_timeout;
        let work = self.fetch_and_extract(task);

        let outcome = match tokio::time::timeout(bound, work).await {
            Ok(Ok(vectors)) => TaskOutcome::Computed(vectors),
            Ok(Err((stage, error))) => TaskOutcome::Skipped(stage, error.to_string()),
            Err(_) => TaskOutcome::Skipped(
                SkipStage::Timeout,
                SyncError::Timeout {
                    ms: bound.as_millis() as u64,
                }
                .to_string(),
            ),
        };
        match &outcome {
            TaskOutcome::Computed(v) => info!(
                character_id = task.partner_id,
                name = %task.name,
                facial = v.facial.is_some(),
                "extracted"
            ),
            TaskOutcome::Skipped(stage, reason) => warn!(
                character_id = task.partner_id,
                name = %task.name,
                ?stage,
                reason = %reason,
                "extraction skipped"
            ),
        }
        outcome
    }

    /// Duplicate-check each fresh vector in source order and collect the
    /// accepted ones.
    ///
    /// A candidate is compared with `established` (previous vectors of
    /// current characters) and with vectors accepted earlier in this run.
    /// Its own entry is excluded, and an established entry is superseded
    /// once its character has a fresh vector.
    fn accumulate(
        &self,
        outcomes: Vec<(PlannedExtraction, TaskOutcome)>,
        established: &[PopulationEntry<'_>],
        summary: &mut RunSummary,
    ) -> HashMap<i64, ComputedVectors> {
        let mut accepted: Vec<(i64, String, Embedding)> = Vec::new();
        let mut accepted_ids: HashSet<i64> = HashSet::new();
        let mut computed = HashMap::new();

        for (task, outcome) in outcomes {
            let vectors = match outcome {
                TaskOutcome::Computed(vectors) => vectors,
                TaskOutcome::Skipped(stage, reason) => {
                    summary.skipped.push(SkippedCharacter {
                        id: task.partner_id,
                        name: task.name,
                        stage,
                        reason,
                    });
                    continue;
                }
            };

            let candidates = {
                let prior = established
                    .iter()
                    .filter(|e| e.id != task.partner_id && !accepted_ids.contains(&e.id))
                    .copied();
                let fresh = accepted
                    .iter()
                    .filter(|(id, _, _)| *id != task.partner_id)
                    .map(|(id, name, embedding)| PopulationEntry {
                        id: *id,
                        name,
                        embedding,
                    });
                self.detector.find(&vectors.semantic, prior.chain(fresh))
            };
            if !candidates.is_empty() {
                warn!(
                    character_id = task.partner_id,
                    name = %task.name,
                    closest_id = candidates[0].id,
                    similarity = candidates[0].similarity,
                    count = candidates.len(),
                    "possible duplicate character"
                );
                summary.duplicates.push(DuplicateReport {
                    id: task.partner_id,
                    name: task.name.clone(),
                    candidates,
                });
            }

            summary.processed += 1;
            if vectors.facial.is_some() {
                summary.with_facial += 1;
            }
            let _ = accepted_ids.insert(task.partner_id);
            accepted.push((task.partner_id, task.name, vectors.semantic.clone()));
            let _ = computed.insert(
                task.partner_id,
                ComputedVectors {
                    semantic: vectors.semantic,
                    facial: vectors.facial,
                },
            );
        }
        computed
    }
}

/// Metadata-only run: refresh every record from the source, carrying all
/// vectors forward unchanged.
///
/// Refuses a previous snapshot built with other model settings, since its
/// vectors would be relabeled without being re-derived.
pub fn export(source: &dyn CharacterSource, config: &PipelineConfig, dry_run: bool) -> Result<RunSummary> {
    let previous = read_snapshot(&config.snapshot_path)?;
    if let Some(p) = previous.as_ref().filter(|p| header_differs(p, &config.header)) {
        return Err(SyncError::ModelChanged {
            previous: describe(&p.header()),
            current: describe(&config.header),
        });
    }
    let characters = source.fetch_all_characters()?;
    let mut summary = RunSummary {
        source_count: characters.len(),
        ..RunSummary::default()
    };
    finish(config, characters, previous.as_ref(), &HashMap::new(), dry_run, &mut summary)?;
    Ok(summary)
}

/// Previous semantic vectors of characters still in the source, keyed by
/// their current identifier and name. Orphaned records are left out.
fn established_population<'a>(
    previous: Option<&'a Snapshot>,
    characters: &'a [SourceCharacter],
) -> Vec<PopulationEntry<'a>> {
    let index = PreviousIndex::new(previous, characters);
    characters
        .iter()
        .filter_map(|character| {
            index.resolve(character).map(|(record, _)| PopulationEntry {
                id: character.key(),
                name: character.key_name(),
                embedding: &record.semantic_embedding,
            })
        })
        .collect()
}

fn header_differs(previous: &Snapshot, header: &SnapshotHeader) -> bool {
    let changed = previous.header() != *header;
    if changed {
        warn!(
            previous = %describe(&previous.header()),
            current = %describe(header),
            "previous snapshot was built with different model settings"
        );
    }
    changed
}

fn describe(header: &SnapshotHeader) -> String {
    format!(
        "{}/{} ({} dims)",
        header.model_identifier, header.pretrained_tag, header.embedding_dimension
    )
}

fn finish(
    config: &PipelineConfig,
    characters: Vec<SourceCharacter>,
    previous: Option<&Snapshot>,
    computed: &HashMap<i64, ComputedVectors>,
    dry_run: bool,
    summary: &mut RunSummary,
) -> Result<()> {
    let reconciliation = reconcile(config.header.clone(), characters, previous, computed)?;
    let report = reconciliation.report;
    summary.matched = report.matched;
    summary.carried_forward = report.carried_forward;
    summary.matched_by_name = report.matched_by_name;
    summary.unmatched = report.unmatched;

    if dry_run {
        info!(path = %config.snapshot_path.display(), "dry run, snapshot not written");
    } else {
        summary.written = Some(write_snapshot(&reconciliation.snapshot, &config.snapshot_path)?);
    }
    Ok(())
}
