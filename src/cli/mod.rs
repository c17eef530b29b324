//! CLI command implementations

use clap::{Parser, Subcommand};
use std::net::SocketAddr;

pub mod doctor;
pub mod error;
pub mod fetch;

pub use doctor::DoctorArgs;
pub use error::CliError;
pub use fetch::FetchArgs;

/// OHLCV data fetching and processing tool
#[derive(Parser, Debug)]
#[command(name = "ohlcv-hub")]
#[command(about = "Fetch daily and weekly OHLCV bars from Alpaca and export them", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Serve Prometheus metrics on this address (e.g., 127.0.0.1:9000)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check configuration and optionally test API connectivity
    Doctor(DoctorArgs),

    /// Fetch historical bars, validate and export
    Fetch(FetchArgs),
}

impl Cli {
    /// Whether verbose logging was requested
    pub fn verbose(&self) -> bool {
        match &self.command {
            Commands::Fetch(args) => args.verbose,
            Commands::Doctor(_) => false,
        }
    }
}
