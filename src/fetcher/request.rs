//! Fetch request model and query parameter building
//!
//! A [`FetchRequest`] is validated and serialized once per fetch call by
//! [`RequestBuilder::build`]; the resulting [`QueryParams`] are the base map
//! every page request starts from.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::fetcher::alpaca_config::{MAX_PAGE_LIMIT, MIN_PAGE_LIMIT};
use crate::fetcher::{FetcherError, FetcherResult};
use crate::{Adjustment, SortOrder};

/// Date-like request bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateInput {
    /// Calendar date, sent as `YYYY-MM-DD`
    Date(NaiveDate),
    /// Exact instant, sent as RFC-3339 UTC with second precision
    Timestamp(DateTime<Utc>),
    /// Preformatted value, passed through when it is `YYYY-MM-DD` or RFC-3339
    Text(String),
}

impl DateInput {
    /// Provider wire format, or a validation error for unusable text
    pub fn to_query_value(&self) -> FetcherResult<String> {
        match self {
            DateInput::Date(date) => Ok(date.format("%Y-%m-%d").to_string()),
            DateInput::Timestamp(ts) => Ok(ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
            DateInput::Text(text) => {
                if parse_text_instant(text).is_some() {
                    Ok(text.clone())
                } else {
                    Err(FetcherError::Validation(format!(
                        "invalid date '{text}': expected YYYY-MM-DD or RFC-3339"
                    )))
                }
            }
        }
    }

    /// Instant used to order the bounds (dates map to midnight UTC)
    fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            DateInput::Date(date) => Some(date.and_hms_opt(0, 0, 0)?.and_utc()),
            DateInput::Timestamp(ts) => Some(*ts),
            DateInput::Text(text) => parse_text_instant(text),
        }
    }
}

fn parse_text_instant(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl From<NaiveDate> for DateInput {
    fn from(date: NaiveDate) -> Self {
        DateInput::Date(date)
    }
}

impl From<DateTime<Utc>> for DateInput {
    fn from(ts: DateTime<Utc>) -> Self {
        DateInput::Timestamp(ts)
    }
}

impl From<String> for DateInput {
    fn from(text: String) -> Self {
        DateInput::Text(text)
    }
}

impl From<&str> for DateInput {
    fn from(text: &str) -> Self {
        DateInput::Text(text.to_string())
    }
}

/// Parameters of one logical bars fetch
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// Requested symbols, normalized when the query is built
    pub symbols: Vec<String>,
    /// Provider timeframe (e.g. `1Day`, `15Min`)
    pub timeframe: String,
    /// Inclusive start
    pub start: DateInput,
    /// Inclusive end
    pub end: DateInput,
    /// Page size, 1..=10000
    pub limit: u32,
    /// Corporate action adjustment
    pub adjustment: Adjustment,
    /// Data feed; provider default when `None`
    pub feed: Option<String>,
    /// As-of date for symbol mapping
    pub asof: Option<String>,
    /// Result ordering
    pub sort: SortOrder,
    /// Price currency; provider default when `None`
    pub currency: Option<String>,
}

impl FetchRequest {
    /// Request with default limit (10000), `raw` adjustment and ascending sort
    pub fn new<I, S>(
        symbols: I,
        timeframe: impl Into<String>,
        start: impl Into<DateInput>,
        end: impl Into<DateInput>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            timeframe: timeframe.into(),
            start: start.into(),
            end: end.into(),
            limit: MAX_PAGE_LIMIT,
            adjustment: Adjustment::Raw,
            feed: None,
            asof: None,
            sort: SortOrder::Asc,
            currency: None,
        }
    }

    /// Set the page size
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Set the adjustment
    pub fn with_adjustment(mut self, adjustment: Adjustment) -> Self {
        self.adjustment = adjustment;
        self
    }

    /// Set the data feed
    pub fn with_feed(mut self, feed: impl Into<String>) -> Self {
        self.feed = Some(feed.into());
        self
    }

    /// Set the as-of date
    pub fn with_asof(mut self, asof: impl Into<String>) -> Self {
        self.asof = Some(asof.into());
        self
    }

    /// Set the sort order
    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Set the price currency
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }
}

/// Ordered query parameters for the bars endpoint
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryParams(Vec<(&'static str, String)>);

impl QueryParams {
    /// Value of `key`, if present
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether `key` is present
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Copy of these params with `page_token` appended
    pub fn with_page_token(&self, token: &str) -> Self {
        let mut params = self.clone();
        params.0.push(("page_token", token.to_string()));
        params
    }

    /// Pairs in insertion order
    pub fn as_slice(&self) -> &[(&'static str, String)] {
        &self.0
    }

    fn push(&mut self, key: &'static str, value: impl Into<String>) {
        self.0.push((key, value.into()));
    }
}

/// Trim, uppercase and drop blank entries; comma separated entries are split
///
/// `["spy, ,qqq"]` becomes `["SPY", "QQQ"]`.
pub fn normalize_symbols<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    symbols
        .into_iter()
        .flat_map(|entry| {
            entry
                .as_ref()
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Validates a [`FetchRequest`] and serializes it to query parameters
pub struct RequestBuilder;

impl RequestBuilder {
    /// Build the base parameter map
    ///
    /// # Errors
    /// `FetcherError::Validation` when the limit is outside 1..=10000, no
    /// symbol survives normalization, the timeframe is blank, a date is
    /// malformed, or start is after end.
    pub fn build(request: &FetchRequest) -> FetcherResult<QueryParams> {
        if !(MIN_PAGE_LIMIT..=MAX_PAGE_LIMIT).contains(&request.limit) {
            return Err(FetcherError::Validation(format!(
                "limit must be between {MIN_PAGE_LIMIT} and {MAX_PAGE_LIMIT}, got {}",
                request.limit
            )));
        }

        let symbols = normalize_symbols(&request.symbols);
        if symbols.is_empty() {
            return Err(FetcherError::Validation(
                "at least one symbol is required".to_string(),
            ));
        }

        let timeframe = request.timeframe.trim();
        if timeframe.is_empty() {
            return Err(FetcherError::Validation("timeframe is required".to_string()));
        }

        let start = request.start.to_query_value()?;
        let end = request.end.to_query_value()?;
        if let (Some(s), Some(e)) = (request.start.instant(), request.end.instant()) {
            if s > e {
                return Err(FetcherError::Validation(format!(
                    "start ({start}) must not be after end ({end})"
                )));
            }
        }

        let mut params = QueryParams::default();
        params.push("symbols", symbols.join(","));
        params.push("timeframe", timeframe);
        params.push("start", start);
        params.push("end", end);
        params.push("limit", request.limit.to_string());
        params.push("adjustment", request.adjustment.as_str());
        params.push("sort", request.sort.as_str());
        if let Some(feed) = &request.feed {
            params.push("feed", feed.as_str());
        }
        if let Some(asof) = &request.asof {
            params.push("asof", asof.as_str());
        }
        if let Some(currency) = &request.currency {
            params.push("currency", currency.as_str());
        }

        Ok(params)
    }
}
