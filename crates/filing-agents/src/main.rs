//! Filing-analysis CLI.
//!
//! Ingests a filing document, loads it into the knowledge store, and runs
//! one coordinated question-answering session over it. Degrades rather
//! than dies: a missing store means no retrieval context, a failed
//! extraction falls back to previously parsed output when one exists.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use filing_agents::agents::factory::{self, ParticipantFactory};
use filing_agents::config::AppConfig;
use filing_agents::ingest::{CommandPartitioner, IngestPipeline, IngestedRecord};
use filing_agents::store::{into_shared, GraphStore, KnowledgeStore, SharedStore};
use roundtable::{
    CoordinatorConfig, CriterionSelector, RoundRobinSelector, SentinelTermination,
    SpeakerSelector, TurnCoordinator,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Document to analyze (overrides FILING_SOURCE_PATH)
    #[arg(long)]
    source_path: Option<PathBuf>,

    /// Re-run extraction even when parsed output already exists
    #[arg(long, default_value_t = false)]
    force_reingest: bool,

    /// Where to write normalized records (overrides FILING_OUTPUT_PATH)
    #[arg(long)]
    output_path: Option<PathBuf>,

    /// Directory for extracted images (overrides FILING_IMAGE_DIR)
    #[arg(long)]
    image_dir: Option<PathBuf>,

    /// Question that seeds the session
    #[arg(
        long,
        default_value = "What are the key financial highlights in this filing?"
    )]
    initial_message: String,

    /// Skip ingestion entirely; seeds an empty record set if none exists
    #[arg(long, default_value_t = false)]
    skip_ingestion: bool,

    /// Round cap for the session
    #[arg(long, default_value_t = 5)]
    max_rounds: u32,

    /// Replace the interactive entry participant with a budgeted
    /// automatic one
    #[arg(long, default_value_t = false)]
    auto_mode: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env()?;

    let source = args
        .source_path
        .unwrap_or_else(|| config.paths.source_path.clone());
    let output = args
        .output_path
        .unwrap_or_else(|| config.paths.output_path.clone());
    let image_dir = args
        .image_dir
        .unwrap_or_else(|| config.paths.image_dir.clone());

    let records = if args.skip_ingestion {
        info!("skipping ingestion as requested");
        if !output.is_file() {
            warn!(output = %output.display(), "no parsed output found; seeding empty record set");
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&output, "[]")?;
        }
        load_parsed(&output)?
    } else {
        let pipeline = IngestPipeline::new(Box::new(CommandPartitioner::from_env()));
        match pipeline.ingest(&source, &output, &image_dir, args.force_reingest) {
            Ok(records) => records,
            Err(e) if output.is_file() => {
                warn!(error = %e, "extraction failed; using existing parsed output");
                load_parsed(&output)?
            }
            Err(e) => {
                eprintln!("error: {e}");
                if let Some(hint) = e.remediation() {
                    eprintln!("{hint}");
                }
                std::process::exit(1);
            }
        }
    };
    info!(count = records.len(), "records ready");

    let store: Option<SharedStore> =
        match GraphStore::connect(&config.store, &config.llm.embedding_model).await {
            Ok(mut graph) => match graph.initialize(&records).await {
                Ok(()) => Some(into_shared(graph)),
                Err(e) => {
                    warn!(error = %e, "store initialization failed; continuing without retrieval");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "knowledge store unavailable; continuing without retrieval");
                None
            }
        };

    let cast = ParticipantFactory::new(config.llm.clone());
    let registry = cast.registry(store, args.auto_mode)?;

    // Auto-mode has nobody steering, so let the judge pick speakers;
    // interactive sessions stay on the fixed rotation.
    let selector: Box<dyn SpeakerSelector> = if args.auto_mode {
        Box::new(CriterionSelector::new(Arc::new(cast.judge()?)))
    } else {
        Box::new(RoundRobinSelector)
    };

    let coordinator = TurnCoordinator::new(
        registry,
        selector,
        Box::new(SentinelTermination::default()),
        CoordinatorConfig::new(factory::ENTRY, args.max_rounds),
    );

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut session = coordinator.start_session();
    let outcome = coordinator
        .run(&mut session, &args.initial_message, &cancel)
        .await?;

    println!();
    for message in session.transcript().messages() {
        println!("{}: {}", message.sender, message.content);
    }
    println!("\n{}", outcome.summary_line());

    Ok(())
}

/// Read previously parsed records back from disk.
fn load_parsed(output: &Path) -> Result<Vec<IngestedRecord>> {
    let contents = fs::read_to_string(output)
        .with_context(|| format!("reading parsed output {}", output.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parsing parsed output {}", output.display()))
}
