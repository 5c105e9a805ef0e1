mod commands;
mod wiring;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "r6stats")]
#[command(about = "Collects player statistics and writes them to InfluxDB")]
struct Cli {
    /// Load environment variables from this file instead of `./.env`.
    #[arg(long, global = true, env = "R6STATS_ENV_FILE")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect on the configured cron schedule until interrupted (default).
    Run,
    /// Run a single collection cycle, print its report and exit.
    CollectOnce,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    let config = r6stats_core::load_app_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(?config, "config loaded");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run(&config).await,
        Commands::CollectOnce => commands::collect_once(&config).await,
    }
}
