//! Resilient paginated fetch client for Alpaca historical bars
//!
//! Pieces, leaf first:
//! - [`rate_limit`] - quota snapshot from `X-RateLimit-*` headers
//! - [`retry`] - wait selection for 429 responses
//! - [`request`] - request model and query parameter building
//! - [`alpaca_http`] - the [`alpaca_http::Transport`] seam and its reqwest implementation
//! - [`pagination`] - the page loop (throttle gate, retry sub-loop, merge)
//! - [`alpaca`] - [`alpaca::AlpacaClient`], the entry point callers use

use std::time::Duration;

pub mod alpaca;
pub mod alpaca_config;
pub mod alpaca_http;
pub mod alpaca_parser;
pub mod clock;
pub mod diagnostics;
pub mod observer;
pub mod pagination;
pub mod rate_limit;
pub mod request;
pub mod retry;

pub use alpaca::AlpacaClient;
pub use alpaca_http::{HttpResponse, ReqwestTransport, Transport, TransportError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use observer::{FetchObserver, TracingObserver};
pub use pagination::BarsAggregate;
pub use request::{DateInput, FetchRequest, QueryParams, RequestBuilder};

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Request rejected locally, nothing was sent
    #[error("invalid request: {0}")]
    Validation(String),

    /// Provider answered with a non-200 status or an unreadable body
    #[error("provider error (HTTP {status}): {message}")]
    Provider {
        /// HTTP status of the failing response
        status: u16,
        /// Diagnostic message including a body excerpt
        message: String,
    },

    /// Connection level failure from the transport
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Provider kept returning continuation tokens past the page cap
    #[error("page limit exceeded: provider returned more than {max_pages} pages")]
    PageLimitExceeded {
        /// Configured cap
        max_pages: usize,
    },

    /// Call-level deadline reached before the fetch completed
    #[error("fetch deadline of {:.1}s exceeded", deadline.as_secs_f64())]
    DeadlineExceeded {
        /// Configured deadline
        deadline: Duration,
    },
}

impl FetcherError {
    /// HTTP status for provider errors
    pub fn status(&self) -> Option<u16> {
        match self {
            FetcherError::Provider { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;
