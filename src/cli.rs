//! CLI entry point
//!
//! Owns argument parsing, tracing setup, config discovery, and the tokio
//! runtime. `main.rs` only maps the result to a process exit code.

use crate::config::Config;
use crate::orchestrator::Orchestrator;
use crate::types::{
    GenerationPreferences, GenerationRequest, ProficiencyLevel, ProgressUpdate,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// phrasegen - batched Thai flashcard generation via an LLM provider
#[derive(Parser)]
#[command(name = "phrasegen")]
#[command(about = "Generate validated, deduplicated Thai flashcard phrases with an LLM")]
#[command(version)]
pub struct Cli {
    /// Number of phrases to generate
    #[arg(default_value_t = 10)]
    pub count: usize,

    /// Learner proficiency level
    #[arg(long, default_value = "intermediate")]
    pub level: String,

    /// Specific topic to generate around
    #[arg(long)]
    pub topic: Option<String>,

    /// Situations to cover (free text)
    #[arg(long)]
    pub situations: Option<String>,

    /// Topics to avoid
    #[arg(long)]
    pub avoid: Option<String>,

    /// Tone level, 0 (serious) to 100 (absurd)
    #[arg(long, default_value_t = 50)]
    pub tone: u8,

    /// Path to configuration file (overrides discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the configured batch size
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Emit the full result as JSON instead of a readable listing
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse arguments, run one generation, print the result.
///
/// Handles all output. Returns an error only for pre-run failures (bad
/// arguments, unreadable config); generation failures are reported through
/// the result's summary and the process still exits zero with a partial
/// result, matching the degraded-success contract.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let level: ProficiencyLevel = cli
        .level
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))
        .context("invalid --level")?;

    let mut config = match &cli.config {
        Some(path) => Config::load(path).context("failed to load configuration")?,
        None => Config::discover().context("failed to load configuration")?,
    };
    if let Some(batch_size) = cli.batch_size {
        anyhow::ensure!(batch_size >= 1, "--batch-size must be at least 1");
        config.pipeline.batch_size = batch_size;
    }

    let mut preferences = GenerationPreferences::new(level).with_tone_level(cli.tone);
    if let Some(topic) = cli.topic {
        preferences = preferences.with_topic(topic);
    }
    if let Some(situations) = cli.situations {
        preferences = preferences.with_situations(situations);
    }
    if let Some(avoid) = cli.avoid {
        preferences = preferences.with_topics_to_avoid(avoid);
    }

    let request = GenerationRequest::new(preferences, cli.count).with_progress(Arc::new(
        |update: ProgressUpdate| {
            eprintln!("generated {}/{} phrases", update.completed, update.total);
        },
    ));

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let orchestrator = Orchestrator::from_config(&config);
    let result = runtime.block_on(orchestrator.run(request));

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_readable(&result);
    }

    if result.is_complete_failure() {
        anyhow::bail!("generation failed completely");
    }
    Ok(())
}

fn print_readable(result: &crate::types::GenerationResult) {
    if let Some(title) = &result.title {
        println!("# {title}\n");
    }
    for phrase in &result.phrases {
        println!("{} — {} ({})", phrase.english, phrase.thai, phrase.pronunciation);
        if let Some(mnemonic) = &phrase.mnemonic {
            println!("    mnemonic: {mnemonic}");
        }
        for example in &phrase.examples {
            println!("    e.g. {} — {}", example.thai, example.translation);
        }
    }
    if let Some(summary) = &result.error_summary {
        eprintln!("\n{}", summary.user_message);
    }
}

fn init_tracing(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("phrasegen=debug,info")
            } else {
                EnvFilter::try_new("phrasegen=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
