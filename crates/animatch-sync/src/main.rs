//! `animatch`: keep the embedding snapshot in step with the character
//! database.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use animatch_embeddings::{DuplicateDetector, VectorExtractor};
use animatch_settings::{AnimatchSettings, load_settings, load_settings_from_path};
use animatch_store::{SqliteCharacterSource, read_snapshot};
use animatch_sync::{
    ImageFetcher, PipelineConfig, RunSummary, SyncOptions, SyncPipeline, analyze, create_batch,
    export, read_batch,
};
use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "animatch", version, about = "Character embedding snapshot maintenance")]
struct Cli {
    /// Settings file (defaults to ~/.animatch/settings.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overriding settings.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit JSON log lines and a JSON summary.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract missing or changed vectors and rewrite the snapshot.
    Sync {
        /// Re-extract every character.
        #[arg(long)]
        force: bool,
        /// Report without writing the snapshot.
        #[arg(long)]
        dry_run: bool,
    },
    /// Refresh metadata only; every vector carries forward.
    Export {
        /// Report without writing the snapshot.
        #[arg(long)]
        dry_run: bool,
    },
    /// Create characters from a batch file, then extract their vectors.
    Add {
        /// JSON array of creation requests (a single object also works).
        #[arg(long)]
        batch: PathBuf,
        /// Validate and predict ids without writing anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Analyze the current snapshot.
    Stats {
        /// Most similar pairs to list.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

#[cfg(feature = "ort")]
fn load_extractor(settings: &AnimatchSettings) -> anyhow::Result<VectorExtractor> {
    animatch_embeddings::ort_service::load_extractor(settings).context("loading embedding models")
}

#[cfg(not(feature = "ort"))]
fn load_extractor(_settings: &AnimatchSettings) -> anyhow::Result<VectorExtractor> {
    bail!("this build has no inference backend; rebuild with `--features ort`")
}

fn build_pipeline(settings: &AnimatchSettings, source: Arc<SqliteCharacterSource>) -> anyhow::Result<SyncPipeline> {
    let extractor = load_extractor(settings)?;
    let fetcher = ImageFetcher::from_settings(settings).context("building image fetcher")?;
    Ok(SyncPipeline::new(
        source,
        Arc::new(fetcher),
        extractor,
        DuplicateDetector::from_settings(&settings.duplicates),
        PipelineConfig::from_settings(settings),
    ))
}

fn open_source(settings: &AnimatchSettings) -> anyhow::Result<Arc<SqliteCharacterSource>> {
    let path = PathBuf::from(&settings.paths.database);
    let source = SqliteCharacterSource::open(&path)
        .with_context(|| format!("opening database {}", path.display()))?;
    Ok(Arc::new(source))
}

fn print_summary(summary: &RunSummary, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!("{summary}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => load_settings_from_path(path),
        None => load_settings(),
    }
    .context("loading settings")?;
    if let Some(level) = cli.log_level.clone() {
        settings.logging.level = level;
    }
    let json = cli.json_logs || settings.logging.json;
    animatch_core::logging::init_subscriber(&settings.logging.level, json);

    match cli.command {
        Command::Sync { force, dry_run } => {
            let source = open_source(&settings)?;
            let pipeline = build_pipeline(&settings, source)?;
            let options = SyncOptions {
                force,
                dry_run,
                only: None,
            };
            let summary = pipeline.run(&options).await?;
            print_summary(&summary, json)?;
        }
        Command::Export { dry_run } => {
            let source = open_source(&settings)?;
            let config = PipelineConfig::from_settings(&settings);
            let summary = export(&*source, &config, dry_run)?;
            print_summary(&summary, json)?;
        }
        Command::Add { batch, dry_run } => {
            let requests = read_batch(&batch).with_context(|| format!("reading {}", batch.display()))?;
            let source = open_source(&settings)?;
            // Models load before anything is inserted so a missing backend
            // fails the command without leaving half-added characters.
            let pipeline = if dry_run { None } else { Some(build_pipeline(&settings, source.clone())?) };
            let created = create_batch(&source, &requests, dry_run)?;
            for c in &created {
                println!(
                    "{}work={} primary={} partner={} {}",
                    if dry_run { "[dry run] " } else { "" },
                    c.ids.work_id,
                    c.ids.primary_id,
                    c.ids.partner_id,
                    c.name
                );
            }
            if let Some(pipeline) = pipeline {
                let options = SyncOptions {
                    force: false,
                    dry_run: false,
                    only: Some(created.iter().map(|c| c.ids.partner_id).collect::<HashSet<_>>()),
                };
                let summary = pipeline.run(&options).await?;
                print_summary(&summary, json)?;
            }
        }
        Command::Stats { top } => {
            let path = PathBuf::from(&settings.paths.snapshot);
            let Some(snapshot) = read_snapshot(&path)? else {
                bail!("no snapshot at {}", path.display());
            };
            let detector = DuplicateDetector::from_settings(&settings.duplicates);
            let stats = analyze(&snapshot, &detector, settings.duplicates.score_precision, top);
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{stats}");
                let missing = animatch_sync::stats::missing_facial(&snapshot);
                if !missing.is_empty() {
                    println!("without facial vector: {}", missing.len());
                    for r in missing {
                        println!("  #{} {}", r.key(), r.key_name());
                    }
                }
            }
        }
    }

    info!("done");
    Ok(())
}
