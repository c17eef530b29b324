//! Fetch metrics
//!
//! Counters and histograms for requests, 429s, retry and throttle waits and
//! whole fetch outcomes, recorded through the `metrics` facade. Without an
//! installed exporter every macro is a no-op; `--metrics-addr` installs the
//! Prometheus scrape endpoint.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Address the exporter was installed on, set once
static METRICS_ADDR: OnceCell<SocketAddr> = OnceCell::new();

/// Metrics initialization errors
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Exporter could not be installed
    #[error("failed to install Prometheus exporter: {0}")]
    Install(String),
}

/// Install the Prometheus exporter and register metric descriptions
///
/// Must run inside a tokio runtime. Idempotent: later calls are ignored.
///
/// # Errors
/// Returns an error if the listener cannot be installed
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    if METRICS_ADDR.get().is_some() {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP requests sent to the market data API"
    );
    describe_counter!(
        "http_429_errors_total",
        Unit::Count,
        "Total number of 429 responses received"
    );
    describe_counter!("http_retries_total", Unit::Count, "Total number of 429 retries");
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration in seconds"
    );
    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Wait before each 429 retry"
    );
    describe_histogram!(
        "throttle_wait_seconds",
        Unit::Seconds,
        "Proactive wait applied when the quota was exhausted"
    );
    describe_counter!(
        "fetches_completed_total",
        Unit::Count,
        "Total number of fetch calls that completed"
    );
    describe_counter!(
        "fetches_failed_total",
        Unit::Count,
        "Total number of fetch calls that failed"
    );

    let _ = METRICS_ADDR.set(addr);
    info!(%addr, "Metrics exporter listening");
    Ok(())
}

/// Whether the exporter has been installed
pub fn is_initialized() -> bool {
    METRICS_ADDR.get().is_some()
}

/// Record one completed HTTP request
pub fn record_request(status: u16, duration: Duration) {
    counter!("http_requests_total", "status" => status.to_string()).increment(1);
    histogram!("http_request_duration_seconds").record(duration.as_secs_f64());

    if status == 429 {
        counter!("http_429_errors_total").increment(1);
        warn!(
            duration_ms = duration.as_millis() as u64,
            "Rate limit response (429)"
        );
    }
}

/// Record a request that failed below HTTP
pub fn record_transport_error(duration: Duration) {
    counter!("http_requests_total", "status" => "transport_error").increment(1);
    histogram!("http_request_duration_seconds").record(duration.as_secs_f64());
}

/// Record the wait before a 429 retry
pub fn record_retry_backoff(duration: Duration, attempt: u32) {
    counter!("http_retries_total", "attempt" => attempt.to_string()).increment(1);
    histogram!("retry_backoff_duration_seconds").record(duration.as_secs_f64());
}

/// Record a proactive throttle wait
pub fn record_throttle_wait(duration: Duration) {
    histogram!("throttle_wait_seconds").record(duration.as_secs_f64());
}

/// Outcome tracking for one fetch call
pub struct FetchMetrics {
    symbols: String,
    timeframe: String,
    start_time: Instant,
}

impl FetchMetrics {
    /// Start tracking a fetch
    pub fn start(symbols: impl Into<String>, timeframe: impl Into<String>) -> Self {
        let symbols = symbols.into();
        let timeframe = timeframe.into();
        debug!(symbols = %symbols, timeframe = %timeframe, "Fetch started");
        Self {
            symbols,
            timeframe,
            start_time: Instant::now(),
        }
    }

    /// Record a successful fetch
    pub fn record_success(&self, bars: u64) {
        counter!("fetches_completed_total", "timeframe" => self.timeframe.clone()).increment(1);
        debug!(
            symbols = %self.symbols,
            bars,
            duration_ms = self.start_time.elapsed().as_millis() as u64,
            "Fetch completed"
        );
    }

    /// Record a failed fetch
    pub fn record_failure(&self, reason: &str) {
        counter!("fetches_failed_total", "timeframe" => self.timeframe.clone()).increment(1);
        error!(
            symbols = %self.symbols,
            error = %reason,
            duration_ms = self.start_time.elapsed().as_millis() as u64,
            "Fetch failed"
        );
    }
}
