use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::info;

use oxidized_deck::{
    config::Config,
    models::{GenerationParams, QualityLevel},
    queue::{GenerationJob, GenerationMode, JobOutcome, Worker},
    storage::ProjectOptions,
    thinking::ThinkingEvent,
    utils::init_logger,
};

#[derive(Parser)]
#[command(name = "oxidized-deck")]
#[command(about = "Plan, draft, critique and refine presentations with LLMs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a presentation
    Generate {
        /// What the presentation is about
        #[arg(short, long)]
        topic: String,

        #[arg(long)]
        tone: Option<String>,

        #[arg(short, long)]
        audience: Option<String>,

        /// Number of slides
        #[arg(short, long)]
        length: Option<u32>,

        /// Quality tier (standard, high, premium)
        #[arg(short, long)]
        quality: Option<String>,

        #[arg(long)]
        style: Option<String>,

        #[arg(long)]
        content_type: Option<String>,

        /// Ask for image suggestions on each slide
        #[arg(long, default_value = "false")]
        images: bool,

        /// File whose contents ground the slides instead of web research
        #[arg(long)]
        raw_data_file: Option<PathBuf>,

        #[arg(long)]
        brand: Option<String>,

        /// Single draft without the refinement loop
        #[arg(long, conflicts_with = "stream")]
        quick: bool,

        /// Print thinking events as they happen
        #[arg(long)]
        stream: bool,

        #[arg(long, default_value = "false")]
        no_research: bool,

        /// Save the result as a project
        #[arg(long, default_value = "false")]
        save: bool,

        /// Write the result JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let _guard = init_logger(&config.logging)?;
    info!(provider = %config.llm.provider, model = %config.llm.model, "Configuration loaded");

    match cli.command {
        Commands::Generate {
            topic,
            tone,
            audience,
            length,
            quality,
            style,
            content_type,
            images,
            raw_data_file,
            brand,
            quick,
            stream,
            no_research,
            save,
            output,
        } => {
            let quality_level = match quality {
                Some(q) => QualityLevel::from_id(&q).with_context(|| format!("Unknown quality level: {}", q))?,
                None => config.thinking.default_quality,
            };
            let raw_data = match raw_data_file {
                Some(path) => Some(
                    tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                ),
                None => None,
            };

            let mut params = GenerationParams::new(topic).with_quality(quality_level);
            params.tone = tone;
            params.audience = audience;
            params.length = length;
            params.style = style;
            params.content_type = content_type;
            params.include_images = images;
            params.raw_data = raw_data;
            params.brand_guidelines = brand;
            params.enable_research = !no_research;

            let mode = if quick { GenerationMode::Quick } else { GenerationMode::Thinking };
            let mut job = GenerationJob::new(params, mode);
            if save {
                job = job.with_project(ProjectOptions::default());
            }

            let worker = Worker::from_config(&config)?;
            let outcome = if stream {
                run_streaming(&worker, &job).await?
            } else {
                worker.process_job(&job).await?
            };

            if let Some(project_id) = outcome.project_id() {
                println!("Saved project {}", project_id);
            }
            let result = outcome.result();
            eprintln!(
                "Quality {}/100 (target {:.1}), stopped after iteration {}: {:?}, {} tokens",
                result.quality_report.overall_score,
                result.state.target_quality_score,
                result.state.iteration,
                result.state.stop_reason,
                result.state.tokens_used,
            );

            let json = serde_json::to_string_pretty(result)?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, json)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Wrote {}", path.display());
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}

async fn run_streaming(worker: &Worker, job: &GenerationJob) -> Result<JobOutcome> {
    let (tx, mut rx) = mpsc::channel(64);

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ThinkingEvent::State { phase, iteration, quality_score, tokens_used, .. } => {
                    eprintln!("[{}] iteration {} score {:.1} tokens {}", phase, iteration, quality_score, tokens_used);
                }
                ThinkingEvent::Step(step) => {
                    eprintln!("  {} -> {}", step.thought, step.observation);
                }
                ThinkingEvent::Presentation { presentation, .. } => {
                    eprintln!("Presentation ready: {}", presentation.title);
                }
            }
        }
    });

    let outcome = worker.process_streaming(job, tx).await;
    printer.await?;
    Ok(outcome?)
}
