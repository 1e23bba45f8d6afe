use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::{batch, repl};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use triage_core::config::{self, AppConfig};
use triage_core::pipeline;
use triage_core::EmailInput;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only prompts and JSON.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Interactive) {
        Commands::Interactive => run_interactive(cfg).await,
        Commands::Classify { subject, body } => run_classify(cfg, subject, body).await,
        Commands::Batch { input, concurrency } => run_batch(cfg, input, concurrency).await,
        Commands::Check => run_check(cfg),
        Commands::Index => run_index(cfg).await,
    }
}

#[derive(Parser)]
#[command(name = "mail-triage")]
#[command(about = "Retrieval-augmented email classifier", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Prompt for emails on stdin until `quit` (default)
    Interactive,
    /// Classify a single email and print the result
    Classify {
        #[arg(short, long)]
        subject: String,
        #[arg(short, long, default_value = "")]
        body: String,
    },
    /// Classify a JSON array of {subject, body} objects
    Batch {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,
        /// Maximum emails in flight
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },
    /// Validate the knowledge file without contacting any backend
    Check,
    /// Embed the knowledge file and build the index
    Index,
}

async fn run_interactive(cfg: AppConfig) -> Result<()> {
    let startup = pipeline::initialize(&cfg).await?;
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    repl::run_session(&startup.classifier, stdin, &mut stdout).await?;
    Ok(())
}

async fn run_classify(cfg: AppConfig, subject: String, body: String) -> Result<()> {
    let startup = pipeline::initialize(&cfg).await?;
    let result = startup
        .classifier
        .classify(&EmailInput::new(subject, body))
        .await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn run_batch(cfg: AppConfig, input: PathBuf, concurrency: usize) -> Result<()> {
    let emails = batch::load_batch(&input)?;
    let startup = pipeline::initialize(&cfg).await?;
    let results = batch::classify_batch(&startup.classifier, emails, concurrency).await;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn run_check(cfg: AppConfig) -> Result<()> {
    let kb = pipeline::load_knowledge(&cfg)
        .with_context(|| format!("checking knowledge file {}", cfg.knowledge.path))?;
    let summary = serde_json::json!({
        "status": if kb.diagnostics.is_empty() { "ok" } else { "warnings" },
        "path": cfg.knowledge.path,
        "entries": kb.len(),
        "diagnostics": kb.diagnostics,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn run_index(cfg: AppConfig) -> Result<()> {
    let startup = pipeline::initialize(&cfg).await?;
    println!("{}", serde_json::to_string_pretty(&startup.summary)?);
    Ok(())
}
