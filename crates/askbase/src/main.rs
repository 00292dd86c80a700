//! # askbase CLI (`ask`)
//!
//! The `ask` binary drives the answer engine from the terminal.
//!
//! ## Usage
//!
//! ```bash
//! ask --config ./config/askbase.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ask index` | Chunk and embed the corpus, warming the cache |
//! | `ask ask "<question>"` | Answer one question and exit |
//! | `ask chat` | Interactive session; initialization runs in the background |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

use askbase::config::Config;
use askbase::engine::Engine;

/// askbase — retrieval-augmented question answering over a local
/// plain-text knowledge base.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file; without one, built-in defaults are used
/// (corpus in `knowledge_base/`, cache in `cache/`, Ollama embeddings).
#[derive(Parser)]
#[command(
    name = "ask",
    about = "Answer questions against a local plain-text knowledge base",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/askbase.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk and embed the knowledge base, warming the cache.
    ///
    /// Runs the full initialization sequence once so later runs start
    /// from the fingerprint-keyed cache instead of re-encoding.
    Index,

    /// Answer a single question and exit.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Interactive question session.
    ///
    /// Initialization runs on a background task; questions asked before
    /// the engine is ready receive a polite not-ready message instead
    /// of blocking.
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Index => {
            let engine = Engine::new(config);
            engine.initialize().await?;
            println!("Indexed {} chunks.", engine.chunk_count().await);
        }
        Commands::Ask { question } => {
            let engine = Engine::new(config);
            engine.initialize().await?;
            let answer = engine.query(&question).await;
            println!("{}", answer.answer);
            println!();
            println!("Source: {}", answer.source);
        }
        Commands::Chat => {
            let engine = Arc::new(Engine::new(config));
            engine.spawn_initialize();
            run_chat(engine).await?;
        }
    }

    Ok(())
}

/// Read questions from stdin until EOF or an empty line.
async fn run_chat(engine: Arc<Engine>) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"? ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            break;
        }

        let answer = engine.query(question).await;
        stdout
            .write_all(format!("{}\n[{}]\n\n", answer.answer, answer.source).as_bytes())
            .await?;
    }

    Ok(())
}
