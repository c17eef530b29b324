//! Dataset building: fetch, normalize, (resample), validate
//!
//! The schema is stable across timeframes:
//! `symbol, timeframe, ts, open, high, low, close, volume, source, currency, adjustment`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::fetcher::{AlpacaClient, FetchRequest, FetcherError};
use crate::{Adjustment, Feed, Timeframe};

pub mod calendar;
pub mod normalize;
pub mod resample;
pub mod validate;

pub use validate::ValidationReport;

/// Provider label written to the `source` column
pub const SOURCE_ALPACA: &str = "alpaca";

/// Provider timeframe fetched for both daily and weekly datasets
const DAILY_PROVIDER_TIMEFRAME: &str = "1Day";

/// One row of the output dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRow {
    /// Ticker
    pub symbol: String,
    /// `1d` or `1w`
    pub timeframe: String,
    /// Bucket start (UTC)
    pub ts: DateTime<Utc>,
    /// Open
    pub open: f64,
    /// High
    pub high: f64,
    /// Low
    pub low: f64,
    /// Close
    pub close: f64,
    /// Volume
    pub volume: i64,
    /// Provider label
    pub source: String,
    /// Price currency
    pub currency: String,
    /// Adjustment the bars were fetched with
    pub adjustment: String,
}

/// Dataset build errors
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// Fetch failed
    #[error(transparent)]
    Fetch(#[from] FetcherError),
}

/// Built dataset with its validation outcome
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Rows sorted by `(symbol, ts)`
    pub rows: Vec<BarRow>,
    /// Validation report
    pub report: ValidationReport,
    /// False when validation found blocking issues
    pub ok: bool,
}

/// Inputs shared by the daily and weekly builds
#[derive(Debug, Clone)]
pub struct DatasetRequest {
    /// Symbols (normalized by the fetcher)
    pub symbols: Vec<String>,
    /// Inclusive start
    pub start: NaiveDate,
    /// Inclusive end
    pub end: NaiveDate,
    /// Corporate action adjustment
    pub adjustment: Adjustment,
    /// Data feed; provider default when `None`
    pub feed: Option<Feed>,
}

impl DatasetRequest {
    fn fetch_request(&self) -> FetchRequest {
        let request = FetchRequest::new(
            self.symbols.iter().cloned(),
            DAILY_PROVIDER_TIMEFRAME,
            self.start,
            self.end,
        )
        .with_adjustment(self.adjustment);
        match self.feed {
            Some(feed) => request.with_feed(feed.as_str()),
            None => request,
        }
    }
}

/// Build the dataset for `timeframe`
pub async fn build_dataset(
    client: &AlpacaClient,
    request: &DatasetRequest,
    timeframe: Timeframe,
) -> Result<Dataset, DatasetError> {
    match timeframe {
        Timeframe::Daily => build_daily_dataset(client, request).await,
        Timeframe::Weekly => build_weekly_dataset(client, request).await,
    }
}

/// Fetch daily bars, normalize and validate (with missing-session check)
pub async fn build_daily_dataset(
    client: &AlpacaClient,
    request: &DatasetRequest,
) -> Result<Dataset, DatasetError> {
    let rows = fetch_daily_rows(client, request).await?;
    let (ok, report) = validate::validate_daily_bars(&rows, request.start, request.end);
    info!(rows = rows.len(), ok, "Daily dataset built");
    Ok(Dataset { rows, report, ok })
}

/// Fetch daily bars, normalize, resample to weekly and validate
pub async fn build_weekly_dataset(
    client: &AlpacaClient,
    request: &DatasetRequest,
) -> Result<Dataset, DatasetError> {
    let daily = fetch_daily_rows(client, request).await?;
    let rows = resample::to_weekly(&daily);
    let (ok, report) = validate::validate_weekly_bars(&rows, request.start, request.end);
    info!(daily_rows = daily.len(), rows = rows.len(), ok, "Weekly dataset built");
    Ok(Dataset { rows, report, ok })
}

async fn fetch_daily_rows(
    client: &AlpacaClient,
    request: &DatasetRequest,
) -> Result<Vec<BarRow>, DatasetError> {
    let aggregate = client.fetch_bars(&request.fetch_request()).await?;
    Ok(normalize::bars_to_rows(
        &aggregate,
        Timeframe::Daily.as_str(),
        SOURCE_ALPACA,
        request.adjustment.as_str(),
    ))
}
