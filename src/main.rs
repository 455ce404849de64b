//! # Handbook Assistant CLI (`handbook`)
//!
//! ## Usage
//!
//! ```bash
//! handbook --config ./config/handbook.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `handbook serve` | Start the HTTP API |
//! | `handbook search "<query>"` | Rank handbook passages for a query |
//! | `handbook ask "<message>"` | Answer one message (AI, or fallback) |
//! | `handbook sections` | List handbook sections |
//! | `handbook section <name>` | Print the passages of a section |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use handbook_assistant::{chat, config, handbook, search, server};

/// Handbook Assistant: answers questions about the university handbook.
#[derive(Parser)]
#[command(
    name = "handbook",
    about = "University handbook chat assistant with keyword retrieval and LLM answers",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// `serve` requires it. Other commands fall back to built-in defaults
    /// with the language model disabled when the file does not exist.
    #[arg(long, global = true, default_value = "./config/handbook.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API.
    ///
    /// Binds to `[server].bind` and serves the chat, sections, search, and
    /// health endpoints.
    Serve,

    /// Rank handbook passages for a query.
    Search {
        /// The search query.
        query: String,

        /// Maximum number of results (defaults to `retrieval.search_limit`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Answer one message, using the language model when available.
    Ask {
        /// The question to ask.
        message: String,
    },

    /// List handbook sections.
    Sections,

    /// Print the passages of a section (case-insensitive partial name).
    Section {
        /// Section name or fragment.
        name: String,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "handbook_assistant=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = if cli.config.exists() || matches!(cli.command, Commands::Serve) {
        config::load_config(&cli.config)?
    } else {
        tracing::debug!(path = %cli.config.display(), "config file not found, using defaults");
        config::Config::minimal()
    };

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Search { query, limit } => {
            search::run_search(&cfg, &query, limit)?;
        }
        Commands::Ask { message } => {
            chat::run_ask(&cfg, &message).await?;
        }
        Commands::Sections => {
            handbook::run_sections(&cfg)?;
        }
        Commands::Section { name } => {
            handbook::run_section(&cfg, &name)?;
        }
    }

    Ok(())
}
