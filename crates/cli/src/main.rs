//! Lectern CLI
//!
//! Main entry point for the lectern command-line tool.
//! Provides commands for ingesting course transcripts and asking questions
//! about them with retrieval-augmented generation.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, IngestCommand, StatsCommand};
use lectern_core::{config::RagConfig, logging, AppResult};
use std::path::PathBuf;

/// Lectern CLI - ask questions about indexed course materials
#[derive(Parser, Debug)]
#[command(name = "lectern")]
#[command(about = "Retrieval-augmented assistant for course materials", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "LECTERN_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (ollama)
    #[arg(short, long, global = true, env = "LECTERN_PROVIDER")]
    provider: Option<String>,

    /// Generation model identifier
    #[arg(short, long, global = true, env = "LECTERN_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest course transcripts into the index
    Ingest(IngestCommand),

    /// Ask one question about the indexed courses
    Ask(AskCommand),

    /// Interactive question-and-answer session
    Chat(ChatCommand),

    /// Show index statistics
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = RagConfig::load()?;
    let config = config.with_overrides(
        cli.workspace,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.generation_model);

    config.ensure_lectern_dir()?;

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    if let Err(e) = &result {
        tracing::error!("Command failed: {}", e);
    }

    result
}
