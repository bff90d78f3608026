//! Showroom CLI — the main entry point.
//!
//! Commands:
//! - `serve`  — Start the HTTP backend
//! - `doctor` — Diagnose the local setup

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "showroom",
    about = "Showroom — multi-agent NPC backend for virtual exhibition spaces",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = "showroom.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP backend server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Diagnose the local setup
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
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
        Commands::Serve { port } => commands::serve::run(&cli.config, port).await?,
        Commands::Doctor => commands::doctor::run(&cli.config).await?,
    }

    Ok(())
}
