//! PaperMind command-line driver
//!
//! Entry point for the study assistant:
//! - Library management (ingest, list, show, rate, notes, delete)
//! - Interactive study sessions with the teach and zealot personas
//! - Dashboard and knowledge graph views
//! - Observability (logging, metrics)

mod chat;
mod commands;
mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::App;
use papermind_common::config::{AppConfig, ObservabilityConfig};
use papermind_common::db::models::AgentKind;
use papermind_common::{metrics, DbPool, Repository};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "papermind")]
#[command(about = "Study research papers with an LLM tutor and examiner")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to config/{default,$APP_ENV,local})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a PDF, or every PDF in a directory, to the library
    Ingest { path: PathBuf },

    /// List papers, newest first
    Papers {
        #[arg(long)]
        json: bool,
    },

    /// Show a paper with its concepts, takeaways and chats
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },

    /// Delete a paper with its notes and chats
    Delete { id: i64 },

    /// Rate your understanding of a paper from 0 (not rated) to 5 (nailed it)
    Rate {
        id: i64,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=5))]
        step: u8,
    },

    /// Add a takeaway to a paper
    Note {
        id: i64,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Change a paper's title
    Rename {
        id: i64,
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },

    /// Re-run extraction on the stored PDF and replace the summary
    Regenerate { id: i64 },

    /// Study a paper interactively (/teach, /zealot, /assess, /quit)
    Chat {
        paper_id: i64,

        /// Persona for the first message: teach or zealot
        #[arg(long, default_value = "teach")]
        agent: AgentKind,

        /// Start a fresh session instead of resuming the latest one
        #[arg(long)]
        new: bool,
    },

    /// Library overview
    Dashboard {
        #[arg(long)]
        json: bool,
    },

    /// Concepts, their links and your confidence
    Graph {
        #[arg(long)]
        json: bool,
    },

    /// Remove older copies of papers uploaded under the same file name
    PruneDuplicates,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(&path.to_string_lossy()),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;

    init_tracing(&config.observability, cli.verbose);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        metrics::install_exporter(config.observability.metrics_port)?;
    }
    metrics::register_metrics();

    info!(
        service = %config.observability.service_name,
        version = papermind_common::VERSION,
        database = %config.database.url,
        "Starting PaperMind"
    );

    let pool = DbPool::new(&config.database)
        .await
        .context("Failed to open database")?;
    let repository = Repository::new(pool);
    repository
        .ping()
        .await
        .context("Database is not reachable")?;
    let app = App::new(config, repository);

    match cli.command {
        Command::Ingest { path } => app.ingest(&path).await,
        Command::Papers { json } => app.papers(json).await,
        Command::Show { id, json } => app.show(id, json).await,
        Command::Delete { id } => app.delete(id).await,
        Command::Rate { id, step } => app.rate(id, step).await,
        Command::Note { id, text } => app.note(id, &text.join(" ")).await,
        Command::Rename { id, title } => app.rename(id, &title.join(" ")).await,
        Command::Regenerate { id } => app.regenerate(id).await,
        Command::Chat {
            paper_id,
            agent,
            new,
        } => chat::run(&app, paper_id, agent, new).await,
        Command::Dashboard { json } => app.dashboard(json).await,
        Command::Graph { json } => app.graph(json).await,
        Command::PruneDuplicates => app.prune_duplicates().await,
    }
}

/// Logs go to stderr so command output and chat replies stay clean
fn init_tracing(config: &ObservabilityConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_chat_flags() {
        let cli = Cli::parse_from(["papermind", "chat", "3", "--agent", "zealot", "--new"]);
        match cli.command {
            Command::Chat {
                paper_id,
                agent,
                new,
            } => {
                assert_eq!(paper_id, 3);
                assert_eq!(agent, AgentKind::Zealot);
                assert!(new);
            }
            _ => panic!("expected chat"),
        }
    }

    #[test]
    fn test_rating_range_is_enforced() {
        assert!(Cli::try_parse_from(["papermind", "rate", "1", "6"]).is_err());
        assert!(Cli::try_parse_from(["papermind", "rate", "1", "5"]).is_ok());
    }

    #[test]
    fn test_note_joins_words() {
        let cli = Cli::parse_from(["papermind", "note", "2", "skip", "connections", "help"]);
        let Command::Note { id, text } = cli.command else {
            panic!("expected note");
        };
        assert_eq!(id, 2);
        assert_eq!(text.join(" "), "skip connections help");
    }
}
