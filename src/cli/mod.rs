//! CLI interface for sweepfade
//!
//! Provides subcommands for:
//! - `run`: Start the trading engine
//! - `status`: Show current state
//! - `config`: Show effective configuration

mod run;

pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "sweepfade")]
#[command(about = "Liquidity-sweep fade engine for binary prediction markets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the trading engine
    Run(RunArgs),
    /// Show current state
    Status,
    /// Show effective configuration
    Config,
}
