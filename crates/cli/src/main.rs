//! coinsage CLI — the main entry point.
//!
//! Commands:
//! - `serve` — start the HTTP/SSE gateway
//! - `ask`   — run a single research query from the terminal

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "coinsage",
    about = "coinsage — a streaming crypto research agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to coinsage.toml (defaults to ./coinsage.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask one research question
    Ask {
        /// The question
        query: String,

        /// Session id for conversational memory across invocations
        #[arg(short, long)]
        session: Option<String>,

        /// Print answer deltas as they arrive
        #[arg(long)]
        stream: bool,

        /// Pool id picked from a prior disambiguation response
        #[arg(long)]
        select: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(cli.config.as_deref(), port).await,
        Commands::Ask {
            query,
            session,
            stream,
            select,
        } => commands::ask::run(cli.config.as_deref(), query, session, stream, select).await,
    }
}
