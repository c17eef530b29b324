//! Main entry point for the ohlcv-hub CLI

use clap::Parser;
use ohlcv_hub::cli::{Cli, CliError, Commands};
use ohlcv_hub::fetcher::diagnostics::format_failure;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
///
/// `RUST_LOG` wins over the default filter; `--verbose` raises the default
/// from `warn` to `info` so throttle and retry events are visible.
fn init_tracing(verbose: bool) {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let default_directive = if verbose { "ohlcv_hub=info" } else { "ohlcv_hub=warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn report_error(err: &CliError) {
    match err {
        CliError::ConfigurationError(e) => eprintln!("❌ Configuration error: {e}"),
        CliError::InvalidArgument(msg) => eprintln!("❌ Error: {msg}"),
        _ => match err.fetcher_error() {
            Some(fetch_err) => {
                eprintln!("❌ {}", format_failure(fetch_err));
                if let Some(status) = fetch_err.status() {
                    eprintln!("  Status code: {status}");
                }
            }
            None => eprintln!("❌ {err}"),
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose());

    if let Some(addr) = cli.metrics_addr {
        ohlcv_hub::metrics::init_metrics(addr)?;
    }

    let result = match &cli.command {
        Commands::Doctor(args) => args.execute().await.map(|()| true),
        Commands::Fetch(args) => args.execute().await,
    };

    match result {
        Ok(true) => Ok(ExitCode::SUCCESS),
        // data exported, validation found errors
        Ok(false) => Ok(ExitCode::FAILURE),
        Err(e) => {
            error!("Command failed: {}", e);
            report_error(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}
