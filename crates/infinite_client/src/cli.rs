//! Command-line interface for the infinite client.

use clap::{Parser, Subcommand};
use infinite_client::LivenessStrategy;
use std::path::PathBuf;

/// Infinite Tic-Tac-Toe - networked console client
#[derive(Parser, Debug)]
#[command(name = "infinite")]
#[command(about = "Play infinite tic-tac-toe against a remote opponent", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a game server and play in the console
    Play {
        /// Path to the client config file
        #[arg(short, long, default_value = "infinite_client.toml")]
        config: PathBuf,

        /// Game server URL (overrides config and environment)
        #[arg(long)]
        server_url: Option<String>,

        /// Liveness policy for running rounds
        #[arg(long, value_enum)]
        liveness: Option<LivenessStrategy>,

        /// Log file path
        #[arg(long, default_value = "infinite_tictactoe.log")]
        log: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Path to the client config file
        #[arg(short, long, default_value = "infinite_client.toml")]
        config: PathBuf,
    },
}
