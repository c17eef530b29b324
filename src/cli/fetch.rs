//! Fetch command: build a daily or weekly dataset and export it

use chrono::{DateTime, NaiveDate};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use super::CliError;
use crate::config::{Config, FetchSettings};
use crate::dataset::{self, Dataset, DatasetRequest, ValidationReport};
use crate::fetcher::request::normalize_symbols;
use crate::fetcher::AlpacaClient;
use crate::output::{self, OutputFormat};
use crate::{Adjustment, Feed, Timeframe};

/// Name of the report written next to the dataset
pub const REPORT_FILENAME: &str = "validation_report.json";

/// Fetch command arguments
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Comma-separated list of stock symbols (e.g., SPY,QQQ)
    #[arg(long)]
    pub symbols: String,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: String,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    pub end: String,

    /// Timeframe: 1d (daily) or 1w (weekly, resampled from daily)
    #[arg(long)]
    pub tf: Timeframe,

    /// Output directory
    #[arg(long)]
    pub out: String,

    /// Output format: parquet or csv
    #[arg(long, default_value = "parquet")]
    pub format: OutputFormat,

    /// Price adjustment: raw, split, dividend, spin-off or all
    #[arg(long, default_value = "raw")]
    pub adjustment: Adjustment,

    /// Data feed: iex, sip, boats or otc
    #[arg(long, default_value = "iex")]
    pub feed: Feed,

    /// Write validation_report.json (default)
    #[arg(long, overrides_with = "no_report")]
    pub report: bool,

    /// Skip validation_report.json
    #[arg(long, overrides_with = "report")]
    pub no_report: bool,

    /// Log throttle decisions and 429 retries
    #[arg(long)]
    pub verbose: bool,

    /// Maximum pages followed per fetch (0 disables the cap)
    #[arg(long, default_value_t = 10_000)]
    pub max_pages: usize,

    /// Deadline for the whole fetch in seconds, waits included
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..=300))]
    pub timeout_secs: u64,
}

/// Validated fetch inputs
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPlan {
    /// Normalized symbols
    pub symbols: Vec<String>,
    /// Inclusive start
    pub start: NaiveDate,
    /// Inclusive end
    pub end: NaiveDate,
    /// Output directory
    pub out_dir: PathBuf,
}

impl FetchPlan {
    /// `ohlcv_<tf>_<YYYYMMDD>_<YYYYMMDD>`
    pub fn filename(&self, timeframe: Timeframe) -> String {
        format!(
            "ohlcv_{}_{}_{}",
            timeframe,
            self.start.format("%Y%m%d"),
            self.end.format("%Y%m%d")
        )
    }
}

/// What a completed fetch produced
#[derive(Debug)]
pub struct FetchOutcome {
    /// Exported dataset file
    pub output_path: PathBuf,
    /// Report path, when reporting is on
    pub report_path: Option<PathBuf>,
    /// Validation report
    pub report: ValidationReport,
    /// False when validation found blocking issues
    pub ok: bool,
}

impl FetchArgs {
    /// Whether the validation report is written
    pub fn report_enabled(&self) -> bool {
        !self.no_report
    }

    /// Fetch tuning from the command line
    pub fn settings(&self) -> FetchSettings {
        FetchSettings {
            request_timeout: Duration::from_secs(self.timeout_secs),
            max_pages: (self.max_pages > 0).then_some(self.max_pages),
            deadline: self.deadline_secs.map(Duration::from_secs),
        }
    }

    /// Check symbols, dates and output directory without touching the network
    ///
    /// # Errors
    /// `CliError::InvalidArgument` on blank symbols, unparseable dates,
    /// `start > end` or an empty output path
    pub fn plan(&self) -> Result<FetchPlan, CliError> {
        let symbols = normalize_symbols(self.symbols.split(','));
        if symbols.is_empty() {
            return Err(CliError::InvalidArgument(
                "at least one symbol is required".to_string(),
            ));
        }

        let start = parse_date(&self.start)?;
        let end = parse_date(&self.end)?;
        if start > end {
            return Err(CliError::InvalidArgument(format!(
                "start date {start} must be on or before end date {end}"
            )));
        }

        if self.out.trim().is_empty() {
            return Err(CliError::InvalidArgument(
                "output path is required".to_string(),
            ));
        }

        Ok(FetchPlan {
            symbols,
            start,
            end,
            out_dir: PathBuf::from(self.out.trim()),
        })
    }

    /// Execute the fetch command against the configured API
    ///
    /// # Returns
    /// `Ok(false)` when data was exported but validation found errors
    pub async fn execute(&self) -> Result<bool, CliError> {
        let plan = self.plan()?;
        let config = Config::from_env(true)?;
        let client = AlpacaClient::from_config(&config).with_settings(self.settings());

        let outcome = self.run(&client, &plan).await?;
        Ok(outcome.ok)
    }

    /// Build, export and report with the given client
    pub async fn run(&self, client: &AlpacaClient, plan: &FetchPlan) -> Result<FetchOutcome, CliError> {
        let request = DatasetRequest {
            symbols: plan.symbols.clone(),
            start: plan.start,
            end: plan.end,
            adjustment: self.adjustment,
            feed: Some(self.feed),
        };

        info!(
            symbols = %plan.symbols.join(","),
            start = %plan.start,
            end = %plan.end,
            tf = %self.tf,
            "Starting fetch"
        );

        let spinner = create_spinner(&plan.symbols, self.tf);
        let built = dataset::build_dataset(client, &request, self.tf).await;
        spinner.finish_and_clear();

        let Dataset { rows, report, ok } = built.map_err(|e| {
            error!("Fetch failed: {}", e);
            CliError::from(e)
        })?;

        if !ok {
            print_validation_errors(&report);
        }

        println!("Exporting data...");
        let output_path = output::export_rows(&rows, &plan.out_dir, self.format, &plan.filename(self.tf))?;

        let report_path = if self.report_enabled() {
            let path = plan.out_dir.join(REPORT_FILENAME);
            output::write_json(&report, &path)?;
            println!("Validation report written to: {}", path.display());
            Some(path)
        } else {
            None
        };

        print_summary(&report, &output_path);

        Ok(FetchOutcome {
            output_path,
            report_path,
            report,
            ok,
        })
    }
}

/// Parse `YYYY-MM-DD`, falling back to an RFC-3339 timestamp (UTC date taken)
pub fn parse_date(input: &str) -> Result<NaiveDate, CliError> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.naive_utc().date());
    }
    // no timezone designator, assume UTC
    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{input}Z")) {
        return Ok(dt.naive_utc().date());
    }
    Err(CliError::InvalidArgument(format!(
        "invalid date format: {input} (expected YYYY-MM-DD)"
    )))
}

fn print_validation_errors(report: &ValidationReport) {
    let issues = &report.issues;
    eprintln!("⚠️  Validation errors detected:");
    if !issues.duplicates.is_empty() {
        eprintln!("  - {} duplicate entries", issues.duplicates.len());
    }
    if !issues.non_monotonic.is_empty() {
        eprintln!(
            "  - {} non-monotonic timestamp issues",
            issues.non_monotonic.len()
        );
    }
    if issues.ohlc_violations.count > 0 {
        eprintln!("  - {} OHLC violations", issues.ohlc_violations.count);
    }
    if issues.volume_violations.count > 0 {
        eprintln!("  - {} volume violations", issues.volume_violations.count);
    }
    eprintln!("  Exporting data anyway (with errors)...");
}

fn print_summary(report: &ValidationReport, output_path: &Path) {
    println!("\n✓ Fetch completed successfully");
    println!("  Bars: {}", report.summary.bars_count);
    println!("  Symbols: {}", report.summary.symbols_count);
    println!("  Output file: {}", output_path.display());
    let missing = report.missing_days_total();
    if missing > 0 {
        println!("  Missing trading days: {missing} (see {REPORT_FILENAME})");
    }
}

fn create_spinner(symbols: &[String], timeframe: Timeframe) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!(
        "Fetching {} {} from Alpaca",
        symbols.join(","),
        timeframe
    ));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
