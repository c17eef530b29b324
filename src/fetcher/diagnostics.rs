//! User-facing classification of fetch failures
//!
//! Turns a [`FetcherError`] into a short description plus remediation hints,
//! used by the CLI when a fetch aborts.

use crate::fetcher::alpaca_http::TransportError;
use crate::fetcher::FetcherError;

/// Failure class shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Request rejected before sending
    InvalidInput,
    /// HTTP 400 / 422 from the provider
    InvalidRequest(u16),
    /// HTTP 401 / 403
    AuthFailed(u16),
    /// 429 survived every retry
    RateLimit,
    /// HTTP 5xx
    ServerError(u16),
    /// Other 4xx
    ClientError(u16),
    /// 200 with an unreadable body
    MalformedResponse,
    /// Transport timed out
    NetworkTimeout,
    /// Could not connect
    NetworkOffline,
    /// Other transport failure
    NetworkGeneric,
    /// Page cap reached
    PageLimit,
    /// Call deadline reached
    Deadline,
}

impl FailureKind {
    /// Classify a fetch error
    pub fn from_error(err: &FetcherError) -> Self {
        match err {
            FetcherError::Validation(_) => Self::InvalidInput,
            FetcherError::Provider { status, .. } => match *status {
                200 => Self::MalformedResponse,
                400 | 422 => Self::InvalidRequest(*status),
                401 | 403 => Self::AuthFailed(*status),
                429 => Self::RateLimit,
                s if s >= 500 => Self::ServerError(s),
                s => Self::ClientError(s),
            },
            FetcherError::Transport(TransportError::Timeout(_)) => Self::NetworkTimeout,
            FetcherError::Transport(TransportError::Connect(_)) => Self::NetworkOffline,
            FetcherError::Transport(TransportError::Request(_)) => Self::NetworkGeneric,
            FetcherError::PageLimitExceeded { .. } => Self::PageLimit,
            FetcherError::DeadlineExceeded { .. } => Self::Deadline,
        }
    }

    /// Short description
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid request parameters",
            Self::InvalidRequest(_) => "request rejected by provider",
            Self::AuthFailed(401) => "authentication failed (401)",
            Self::AuthFailed(403) => "authentication failed (403)",
            Self::AuthFailed(_) => "authentication failed",
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(502) => "bad gateway",
            Self::ServerError(503) => "service unavailable",
            Self::ServerError(504) => "gateway timeout",
            Self::ServerError(_) => "server error",
            Self::ClientError(404) => "resource not found",
            Self::ClientError(_) => "client error",
            Self::MalformedResponse => "malformed response",
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::NetworkGeneric => "network error",
            Self::PageLimit => "too many pages",
            Self::Deadline => "deadline exceeded",
        }
    }

    /// Remediation hints
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidInput => vec!["Check symbols, dates and limit arguments"],
            Self::InvalidRequest(_) => vec![
                "Check symbols, timeframe and date range for typos",
                "Free accounts must use --feed iex",
            ],
            Self::AuthFailed(_) => vec![
                "Verify ALPACA_API_KEY and ALPACA_API_SECRET",
                "Run `ohlcv-hub doctor --ping` to test credentials",
            ],
            Self::RateLimit => vec![
                "Wait a minute for the quota window to reset",
                "Fetch fewer symbols per run",
            ],
            Self::ServerError(_) => vec!["Provider may be experiencing issues, try again later"],
            Self::ClientError(_) => vec!["Review request parameters against the Alpaca API docs"],
            Self::MalformedResponse => vec![
                "Check ALPACA_DATA_BASE_URL points at the market data host",
            ],
            Self::NetworkTimeout => vec![
                "Check your network connection",
                "Increase --timeout-secs",
            ],
            Self::NetworkOffline => vec!["Verify internet connectivity and DNS resolution"],
            Self::NetworkGeneric => vec!["Check network connectivity and try again"],
            Self::PageLimit => vec!["Narrow the date range or raise --max-pages"],
            Self::Deadline => vec!["Narrow the date range or raise --deadline-secs"],
        }
    }
}

/// Multi-line failure summary for terminal output
pub fn format_failure(err: &FetcherError) -> String {
    let kind = FailureKind::from_error(err);
    let mut lines = vec![
        format!("[FAILED] Fetch failed: {}", kind.description()),
        format!("  Last error: {err}"),
        "  Suggestions:".to_string(),
    ];
    for suggestion in kind.suggestions() {
        lines.push(format!("    - {suggestion}"));
    }
    lines.join("\n")
}
