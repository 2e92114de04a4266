//! # papisqa CLI
//!
//! ```bash
//! papisqa index                         # sync the whole library
//! papisqa index author:curie --dry-run  # preview a subset
//! papisqa ask "What is the half-life of radium?" --show-context
//! papisqa status
//! ```
//!
//! Configuration is read from `--config`, or from
//! `{config_home}/papisqa/config.toml` when present. Logs go to stderr;
//! `RUST_LOG` overrides the level chosen with `-v`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing::error;
use tracing_subscriber::EnvFilter;

use papis_qa::ask::{run_ask, AskOptions};
use papis_qa::config::load_config;
use papis_qa::status::run_status;
use papis_qa::sync::run_index;

/// Question answering over a papis library.
#[derive(Parser)]
#[command(
    name = "papisqa",
    about = "Index the PDFs of a papis library and ask questions about them",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize the index with the library.
    ///
    /// Adds new PDFs, carries over changed citations and names, and removes
    /// entries whose PDF is gone.
    Index {
        /// Restrict additions and updates to matching documents
        /// (e.g. `author:curie year:1904`).
        query: Vec<String>,

        /// Discard the existing index and rebuild it.
        #[arg(long)]
        force: bool,

        /// Show what would change without touching the index.
        #[arg(long)]
        dry_run: bool,
    },

    /// Answer a question from the indexed documents.
    Ask {
        question: String,

        /// Number of excerpts to retrieve and summarize.
        #[arg(long, default_value_t = 10)]
        top_k: usize,

        /// Number of summaries the answer is built from.
        #[arg(long, default_value_t = 5)]
        max_sources: usize,

        /// Also print the contexts and their summaries.
        #[arg(long)]
        show_context: bool,

        /// With --show-context, also print the raw excerpts.
        #[arg(long)]
        show_excerpt: bool,

        /// Print the answer as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show where the index lives and what it holds.
    Status,

    /// Print shell completions.
    Completions { shell: Shell },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "papisqa", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Index {
            query,
            force,
            dry_run,
        } => run_index(&config, &query.join(" "), force, dry_run).await,
        Commands::Ask {
            question,
            top_k,
            max_sources,
            show_context,
            show_excerpt,
            json,
        } => {
            let options = AskOptions {
                top_k,
                max_sources,
                show_context,
                show_excerpt,
                json,
            };
            run_ask(&config, &question, &options).await
        }
        Commands::Status => run_status(&config),
        Commands::Completions { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
