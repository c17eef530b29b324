//! Strongly typed decoding of `/v2/stocks/bars` pages

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::fetcher::{FetcherError, FetcherResult};
use crate::Bar;

/// Bar object as sent by the provider
#[derive(Debug, Clone, Deserialize)]
pub struct RawBar {
    /// Bucket start
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    /// Open
    #[serde(rename = "o")]
    pub open: f64,
    /// High
    #[serde(rename = "h")]
    pub high: f64,
    /// Low
    #[serde(rename = "l")]
    pub low: f64,
    /// Close
    #[serde(rename = "c")]
    pub close: f64,
    /// Volume
    #[serde(rename = "v")]
    pub volume: i64,
    /// Trade count
    #[serde(rename = "n", default)]
    pub trade_count: Option<i64>,
    /// Volume weighted average price
    #[serde(rename = "vw", default)]
    pub vwap: Option<f64>,
}

impl From<RawBar> for Bar {
    fn from(raw: RawBar) -> Self {
        Bar {
            timestamp: raw.timestamp,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
            trade_count: raw.trade_count,
            vwap: raw.vwap,
        }
    }
}

/// One page of the bars response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BarsPage {
    /// Bars keyed by symbol; `null` or absent means an empty page
    #[serde(default, deserialize_with = "null_as_empty")]
    pub bars: BTreeMap<String, Vec<RawBar>>,
    /// Cursor for the next page
    #[serde(default)]
    pub next_page_token: Option<String>,
    /// Price currency
    #[serde(default)]
    pub currency: Option<String>,
}

impl BarsPage {
    /// Continuation cursor; an empty token means the last page
    pub fn next_token(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Total bars on this page
    pub fn bar_count(&self) -> usize {
        self.bars.values().map(Vec::len).sum()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<RawBar>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode a 200 response body
///
/// # Errors
/// `FetcherError::Provider` with status 200 when the body is not valid JSON
/// or a bar is missing one of `t,o,h,l,c,v`
pub fn parse_bars_page(body: &str) -> FetcherResult<BarsPage> {
    serde_json::from_str(body).map_err(|e| FetcherError::Provider {
        status: 200,
        message: format!("malformed response body: {e}"),
    })
}
