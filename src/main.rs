//! # Chat Recall CLI (`recall`)
//!
//! ## Usage
//!
//! ```bash
//! recall --config ./config/recall.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `recall init` | Create the SQLite index and run schema migrations |
//! | `recall serve` | Start the HTTP API and ingestion worker |
//! | `recall ask "<question>"` | Answer a question from the archive |
//! | `recall ingest <file>` | Import message events from a JSONL file (`-` for stdin) |
//! | `recall stats` | Show index statistics |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use chat_recall::{ask, config, ingest, logging, migrate, server, stats};

/// Chat Recall: question answering over a community chat archive.
#[derive(Parser)]
#[command(
    name = "recall",
    about = "Chat Recall — retrieval-augmented question answering over a community chat archive",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/recall.toml")]
    config: PathBuf,

    /// Default log level when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the index database.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Start the HTTP API.
    ///
    /// Binds to `[server].bind` and runs the ingestion worker alongside
    /// the query endpoints.
    Serve,

    /// Answer a question from the indexed archive.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Import message events, one JSON object per line.
    ///
    /// Each line: `{"id", "author", "bot"?, "channel"?, "guild"?, "content", "created_at"}`.
    Ingest {
        /// Path to a JSONL file, or `-` for stdin.
        path: PathBuf,
    },

    /// Show index statistics.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ask { question } => {
            ask::run_ask(&cfg, &question).await?;
        }
        Commands::Ingest { path } => {
            ingest::run_ingest(&cfg, &path).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
