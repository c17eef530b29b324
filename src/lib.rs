//! # ohlcv-hub
//!
//! Fetch historical OHLCV bars from the Alpaca Market Data API and turn them
//! into a clean, validated per-symbol time series.
//!
//! ## Features
//!
//! - **Resilient pagination**: follows `next_page_token` cursors across a
//!   symbol-interleaved result set and merges pages in arrival order
//! - **Quota aware**: proactively waits when the previous response reported an
//!   exhausted `X-RateLimit-Remaining`
//! - **429 recovery**: bounded retries driven by `Retry-After`,
//!   `X-RateLimit-Reset` or exponential backoff
//! - **Deterministic**: time and sleeping go through an injected [`fetcher::clock::Clock`],
//!   so the whole retry/throttle state machine runs in tests without real delays
//! - **Dataset tooling**: normalization, NYSE calendar gap detection, weekly
//!   resampling and Parquet/CSV export
//!
//! ## Quick Start
//!
//! ```no_run
//! use ohlcv_hub::config::Config;
//! use ohlcv_hub::fetcher::alpaca::AlpacaClient;
//! use ohlcv_hub::fetcher::request::FetchRequest;
//! use chrono::NaiveDate;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env(true)?;
//! let client = AlpacaClient::from_config(&config);
//!
//! let request = FetchRequest::new(
//!     ["SPY", "QQQ"],
//!     "1Day",
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
//! )
//! .with_feed("iex");
//!
//! let aggregate = client.fetch_bars(&request).await?;
//! println!("{} symbols", aggregate.bars.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`] - request building, rate-limit tracking, retry policy and the pagination driver
//! - [`dataset`] - normalization, validation, calendar and weekly resampling
//! - [`output`] - Parquet and CSV export
//! - [`cli`] - `doctor` and `fetch` commands
//! - [`config`] - environment based configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// CLI command implementations
pub mod cli;

/// Environment configuration
pub mod config;

/// Dataset building: normalization, validation and resampling
pub mod dataset;

/// Market data fetching
pub mod fetcher;

/// Fetch metrics
pub mod metrics;

/// Dataset export writers
pub mod output;

/// One OHLCV bar as returned by the provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    /// Bucket start (UTC)
    pub timestamp: DateTime<Utc>,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Traded volume
    pub volume: i64,
    /// Number of trades in the bucket, when reported
    pub trade_count: Option<i64>,
    /// Volume weighted average price, when reported
    pub vwap: Option<f64>,
}

/// Dataset timeframe selectable from the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    /// Daily bars
    #[serde(rename = "1d")]
    Daily,
    /// Weekly bars (resampled from daily)
    #[serde(rename = "1w")]
    Weekly,
}

impl Timeframe {
    /// Short label used in the dataset schema and file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1w",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => Ok(Timeframe::Daily),
            "1w" => Ok(Timeframe::Weekly),
            _ => Err(format!("Invalid timeframe: {s}. Valid options: 1d, 1w")),
        }
    }
}

/// Corporate action adjustment applied by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Adjustment {
    /// No adjustment
    #[serde(rename = "raw")]
    Raw,
    /// Split adjusted
    #[serde(rename = "split")]
    Split,
    /// Dividend adjusted
    #[serde(rename = "dividend")]
    Dividend,
    /// Spin-off adjusted
    #[serde(rename = "spin-off")]
    SpinOff,
    /// All adjustments combined
    #[serde(rename = "all")]
    All,
}

impl Adjustment {
    /// Wire value of the adjustment
    pub fn as_str(&self) -> &'static str {
        match self {
            Adjustment::Raw => "raw",
            Adjustment::Split => "split",
            Adjustment::Dividend => "dividend",
            Adjustment::SpinOff => "spin-off",
            Adjustment::All => "all",
        }
    }
}

impl std::fmt::Display for Adjustment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Adjustment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw" => Ok(Adjustment::Raw),
            "split" => Ok(Adjustment::Split),
            "dividend" => Ok(Adjustment::Dividend),
            "spin-off" => Ok(Adjustment::SpinOff),
            "all" => Ok(Adjustment::All),
            _ => Err(format!(
                "Invalid adjustment: {s}. Valid options: raw, split, dividend, spin-off, all"
            )),
        }
    }
}

/// Result ordering requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    /// Oldest first
    #[serde(rename = "asc")]
    Asc,
    /// Newest first
    #[serde(rename = "desc")]
    Desc,
}

impl SortOrder {
    /// Wire value of the sort order
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(format!("Invalid sort order: {s}")),
        }
    }
}

/// Alpaca market data feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feed {
    /// Investors Exchange (free tier)
    #[serde(rename = "iex")]
    Iex,
    /// Consolidated SIP feed
    #[serde(rename = "sip")]
    Sip,
    /// Blue Ocean ATS
    #[serde(rename = "boats")]
    Boats,
    /// Over-the-counter
    #[serde(rename = "otc")]
    Otc,
}

impl Feed {
    /// Wire value of the feed
    pub fn as_str(&self) -> &'static str {
        match self {
            Feed::Iex => "iex",
            Feed::Sip => "sip",
            Feed::Boats => "boats",
            Feed::Otc => "otc",
        }
    }
}

impl std::fmt::Display for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "iex" => Ok(Feed::Iex),
            "sip" => Ok(Feed::Sip),
            "boats" => Ok(Feed::Boats),
            "otc" => Ok(Feed::Otc),
            _ => Err(format!(
                "Invalid feed: {s}. Valid options: iex, sip, boats, otc"
            )),
        }
    }
}
