//! Adaptive HVAC CLI
//!
//! A command-line tool for inspecting the agent's live state, submitting
//! temperature overrides, and checking component health.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{health, set, status};

/// Adaptive HVAC CLI
#[derive(Parser)]
#[command(name = "hvacctl")]
#[command(author, version, about = "CLI for the adaptive HVAC agent", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via HVAC_API_URL env var)
    #[arg(long, env = "HVAC_API_URL", default_value = "http://localhost:5000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the current reading and predicted setpoint
    Status,

    /// Submit a desired temperature override
    Set {
        /// Desired temperature in °C
        temperature: f64,
    },

    /// Show agent component health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = client::ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Status => status::run(&client, cli.format).await,
        Commands::Set { temperature } => set::run(&client, temperature).await,
        Commands::Health => health::run(&client, cli.format).await,
    }
}
