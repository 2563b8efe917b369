//! # Agri Knowledge CLI (`agk`)
//!
//! Indexes collected agriculture articles into a local vector store and
//! answers semantic queries against it.
//!
//! ## Usage
//!
//! ```bash
//! agk --config ./config/agk.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `agk init` | Create the SQLite database and schema |
//! | `agk index [PATH]` | Load, chunk, embed and store articles |
//! | `agk search "<query>"` | Rank stored chunks against a query |
//! | `agk stats` | Show what is indexed |
//!
//! ## Examples
//!
//! ```bash
//! agk init
//! agk index ./agriculture_knowledge_base.json
//! agk search "ideal soil pH for rice" --k 3
//! agk stats --json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use agri_knowledge::config;
use agri_knowledge::ingest;
use agri_knowledge::knowledge::KnowledgeBase;
use agri_knowledge::search;
use agri_knowledge::sqlite_store::SqliteVectorStore;
use agri_knowledge::stats;

/// Agri Knowledge CLI: a local-first agriculture knowledge indexer and
/// semantic retriever.
#[derive(Parser)]
#[command(
    name = "agk",
    about = "Agri Knowledge: index agriculture articles and search them semantically",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/agk.toml")]
    config: PathBuf,

    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file, its tables, and the configured
    /// collection. Fails instead of falling back to memory. Idempotent.
    Init,

    /// Index articles from a JSON file or a directory of JSON files.
    Index {
        /// File or directory to load. Defaults to `[data].path`.
        path: Option<PathBuf>,

        /// Show article and chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,

        /// Override `[indexing].batch_size`.
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Search indexed chunks.
    Search {
        /// The search query string.
        query: String,

        /// Number of results. Defaults to `[retrieval].default_k`.
        #[arg(long)]
        k: Option<usize>,

        /// Print results as a JSON array.
        #[arg(long)]
        json: bool,
    },

    /// Show collection statistics.
    Stats {
        /// Print statistics as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "agri_knowledge=debug,agri_knowledge_core=debug"
    } else {
        "agri_knowledge=info,agri_knowledge_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = SqliteVectorStore::open(&cfg.db).await?;
            store.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Index {
            path,
            dry_run,
            batch_size,
        } => {
            let kb = KnowledgeBase::new(cfg)?;
            ingest::run_index(&kb, path, dry_run, batch_size).await?;
        }
        Commands::Search { query, k, json } => {
            let kb = KnowledgeBase::new(cfg)?;
            search::run_search(&kb, &query, k, json).await?;
        }
        Commands::Stats { json } => {
            let kb = KnowledgeBase::new(cfg)?;
            stats::run_stats(&kb, json).await?;
        }
    }

    Ok(())
}
