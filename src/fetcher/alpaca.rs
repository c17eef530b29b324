//! Alpaca historical bars client
//!
//! [`AlpacaClient::fetch_bars`] is the one operation the rest of the crate
//! uses: validate the request, then drive the page loop to completion.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{Config, FetchSettings};
use crate::fetcher::alpaca_config::STOCK_BARS_ENDPOINT;
use crate::fetcher::alpaca_http::{auth_headers, ReqwestTransport, Transport};
use crate::fetcher::clock::{Clock, SystemClock};
use crate::fetcher::observer::{FetchObserver, TracingObserver};
use crate::fetcher::pagination::{BarsAggregate, PaginationDriver};
use crate::fetcher::request::{FetchRequest, RequestBuilder};
use crate::fetcher::FetcherResult;
use crate::metrics::FetchMetrics;

/// Client for `GET /v2/stocks/bars`
///
/// Without an injected transport, a fresh [`ReqwestTransport`] is created
/// for each call and dropped when the call returns, on success or failure.
pub struct AlpacaClient {
    base_url: String,
    api_key: String,
    api_secret: String,
    settings: FetchSettings,
    transport: Option<Arc<dyn Transport>>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn FetchObserver>,
}

impl AlpacaClient {
    /// Create a client with the system clock and tracing observer
    ///
    /// # Arguments
    /// * `base_url` - Market data host (e.g., "<https://data.alpaca.markets>")
    /// * `api_key` - API key id
    /// * `api_secret` - API secret
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            settings: FetchSettings::default(),
            transport: None,
            clock: Arc::new(SystemClock),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Create a client from loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.data_base_url, &config.api_key, &config.api_secret)
    }

    /// Use a caller-owned transport for every call
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the clock used for "now" and every wait
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the observer receiving throttle/retry/page events
    pub fn with_observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replace fetch tuning (timeout, page cap, deadline)
    pub fn with_settings(mut self, settings: FetchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Market data host
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch all pages of historical bars for `request`
    ///
    /// # Returns
    /// Bars per symbol in provider order plus the reported currency
    ///
    /// # Errors
    /// - `Validation` before any request when the request is malformed
    /// - `Provider` for non-200 responses (429 only after retries are exhausted)
    /// - `Transport`, `PageLimitExceeded`, `DeadlineExceeded`
    pub async fn fetch_bars(&self, request: &FetchRequest) -> FetcherResult<BarsAggregate> {
        let params = RequestBuilder::build(request)?;
        let symbols = params.get("symbols").unwrap_or_default().to_string();
        let fetch_metrics = FetchMetrics::start(&symbols, &request.timeframe);

        let owned;
        let transport: &dyn Transport = match &self.transport {
            Some(shared) => shared.as_ref(),
            None => {
                owned = ReqwestTransport::new(self.settings.request_timeout)?;
                &owned
            }
        };

        let url = format!("{}{}", self.base_url, STOCK_BARS_ENDPOINT);
        let headers = auth_headers(&self.api_key, &self.api_secret);
        let driver = PaginationDriver::new(
            transport,
            self.clock.as_ref(),
            self.observer.as_ref(),
            &self.settings,
            &url,
            &headers,
        );

        match driver.run(&params).await {
            Ok(aggregate) => {
                fetch_metrics.record_success(aggregate.total_bars() as u64);
                info!(
                    symbols = %symbols,
                    timeframe = %request.timeframe,
                    bars = aggregate.total_bars(),
                    "Fetched bars"
                );
                Ok(aggregate)
            }
            Err(e) => {
                fetch_metrics.record_failure(&e.to_string());
                warn!(symbols = %symbols, error = %e, "Bars fetch failed");
                Err(e)
            }
        }
    }
}
