//! Infinite Tic-Tac-Toe - console client
//!
//! Connects to a game server over Socket.IO and plays in the terminal.

#![warn(missing_docs)]

mod cli;
mod console;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use infinite_client::{
    ClientConfig, GameSession, LivenessStrategy, NetworkConnector, SessionRuntime,
    SocketIoFactory,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Play {
            config,
            server_url,
            liveness,
            log,
        } => run_play(config, server_url, liveness, log).await,
        Command::Config { config } => print_config(&config),
    }
}

/// Builds the effective configuration: file, then environment, then flags.
fn load_config(
    path: &Path,
    server_url: Option<String>,
    liveness: Option<LivenessStrategy>,
) -> Result<ClientConfig> {
    let mut config = ClientConfig::load_or_default(path)?.apply_env();
    if let Some(url) = server_url {
        config = config.with_server_url(url);
    }
    if let Some(strategy) = liveness {
        let tuned = config.liveness().clone().with_strategy(strategy);
        config = config.with_liveness(tuned);
    }
    Ok(config)
}

/// Print the effective configuration
fn print_config(path: &Path) -> Result<()> {
    let config = load_config(path, None, None)?;
    println!("{}", config.to_toml()?);
    Ok(())
}

/// Run the console client
#[instrument(skip_all, fields(config_path = %config_path.display()))]
async fn run_play(
    config_path: PathBuf,
    server_url: Option<String>,
    liveness: Option<LivenessStrategy>,
    log: PathBuf,
) -> Result<()> {
    // Setup logging to file to avoid interfering with the console board
    let log_file = std::fs::File::create(&log)
        .with_context(|| format!("Failed to create log file {}", log.display()))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,infinite_client=debug")),
        )
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .try_init();

    let config = load_config(&config_path, server_url, liveness)?;
    info!(server_url = %config.server_url(), "Starting Infinite Tic-Tac-Toe client");

    let server = url::Url::parse(config.server_url())?;
    let factory = SocketIoFactory::new(
        server,
        config.transport().clone(),
        Arc::new(NetworkConnector),
    );
    let (client, task) = SessionRuntime::spawn(GameSession::new(&config), Arc::new(factory));

    console::run(client).await?;
    task.await?;

    info!("Client exited");
    Ok(())
}
