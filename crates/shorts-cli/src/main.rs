//! Operator CLI for the news shorts pipeline.

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shorts_metrics::MetricsStore;
use shorts_models::Stage;
use shorts_pipeline::{
    live_analytics, live_generator, AdaptationEngine, LiveStages, Orchestrator, PipelineConfig,
    RunTarget,
};
use shorts_store::{ArtifactStore, TemplateStore};

#[derive(Parser)]
#[command(name = "shorts", about = "Automated news shorts pipeline", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Discover a candidate and run the full chain through publishing
    Full,
    /// Discovery only: rank candidates and checkpoint the top one
    Collect,
    /// Transcribe a collected video (captions, translation, summary)
    Process { video_id: String },
    /// Generate the narration script for a transcribed video
    Generate { video_id: String },
    /// Render the vertical short for a scripted video
    Produce { video_id: String },
    /// Upload a rendered short and record its metadata
    Upload { video_id: String },
    /// Collect performance metrics and generate feedback (run >= 24h
    /// after publishing)
    Analyze { published_id: String },
    /// Fold accumulated feedback into the template set
    Adapt,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env();

    if let Err(e) = run(cli.command, config).await {
        error!("{e}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("shorts=info".parse().unwrap())
        .add_directive("sqlx=warn".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run(command: Command, config: PipelineConfig) -> anyhow::Result<()> {
    let metrics = MetricsStore::open(&config.db_path).await?;

    match command {
        Command::Full => {
            let outcome = orchestrator(&config, metrics)
                .run(RunTarget::DiscoverNew, Stage::Publishing)
                .await?;
            info!(
                video_id = %outcome.video_id,
                published_id = outcome.published_id.as_deref().unwrap_or("-"),
                "pipeline complete"
            );
        }
        Command::Collect => {
            let outcome = orchestrator(&config, metrics)
                .run(RunTarget::DiscoverNew, Stage::Discovery)
                .await?;
            info!(video_id = %outcome.video_id, "candidate collected");
        }
        Command::Process { video_id } => {
            run_through(&config, metrics, video_id, Stage::Transcription).await?;
        }
        Command::Generate { video_id } => {
            run_through(&config, metrics, video_id, Stage::Scripting).await?;
        }
        Command::Produce { video_id } => {
            let outcome = orchestrator(&config, metrics)
                .run(RunTarget::Existing(video_id), Stage::Rendering)
                .await?;
            if let Some(rendered) = outcome.rendered {
                info!(path = %rendered.file_path.display(), "short rendered");
            }
        }
        Command::Upload { video_id } => {
            let outcome = orchestrator(&config, metrics)
                .run(RunTarget::Existing(video_id), Stage::Publishing)
                .await?;
            info!(
                published_id = outcome.published_id.as_deref().unwrap_or("-"),
                "upload complete"
            );
        }
        Command::Analyze { published_id } => {
            let stage = live_analytics(&config, metrics);
            let feedback = stage.run(&published_id).await?;
            info!(published_id, score = feedback.overall_score, "analysis complete");
        }
        Command::Adapt => {
            let engine = AdaptationEngine::new(
                live_generator(&config),
                TemplateStore::new(&config.data_dir),
                metrics,
            );
            let outcome = engine.run().await?;
            info!(changed_fields = outcome.changes.len(), "template adaptation complete");
        }
    }
    Ok(())
}

fn orchestrator(
    config: &PipelineConfig,
    metrics: MetricsStore,
) -> Orchestrator<LiveStages> {
    Orchestrator::new(
        LiveStages::new(config.clone(), metrics),
        ArtifactStore::new(&config.data_dir),
        TemplateStore::new(&config.data_dir),
        &config.data_dir,
        std::time::Duration::from_secs(config.lease_stale_secs),
    )
}

async fn run_through(
    config: &PipelineConfig,
    metrics: MetricsStore,
    video_id: String,
    stop_after: Stage,
) -> anyhow::Result<()> {
    let outcome = orchestrator(config, metrics)
        .run(RunTarget::Existing(video_id), stop_after)
        .await?;
    info!(video_id = %outcome.video_id, stage = %outcome.last_stage, "stage complete");
    Ok(())
}
