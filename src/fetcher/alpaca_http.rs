//! HTTP transport for the Alpaca market data API
//!
//! The pagination driver only needs "send one GET, give me status, headers
//! and body". That contract is the [`Transport`] trait; [`ReqwestTransport`]
//! is the production implementation. Retries are not performed here.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::fetcher::alpaca_config::{HEADER_API_KEY_ID, HEADER_API_SECRET_KEY};

/// Raw response handed back by a [`Transport`]
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body as text
    pub body: String,
}

impl HttpResponse {
    /// Response with no headers
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Add a header (invalid names or values are ignored)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }
}

/// Connection level failures; these are never retried by the fetch loop
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Request timed out
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Could not connect (DNS, refused, TLS)
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other request failure
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Performs a single HTTP GET
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one GET request
    ///
    /// # Arguments
    /// * `url` - Absolute endpoint URL
    /// * `params` - Query parameters in order
    /// * `headers` - Request headers (authentication)
    async fn get(
        &self,
        url: &str,
        params: &[(&'static str, String)],
        headers: &HeaderMap,
    ) -> Result<HttpResponse, TransportError>;
}

/// `reqwest` backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport with the given per-request timeout
    ///
    /// # Errors
    /// Returns an error if the TLS backend cannot be initialized
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ohlcv-hub/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client (shares its connection pool)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        params: &[(&'static str, String)],
        headers: &HeaderMap,
    ) -> Result<HttpResponse, TransportError> {
        debug!(url = %url, params = params.len(), "Sending GET request");

        let response = self
            .client
            .get(url)
            .query(params)
            .headers(headers.clone())
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Authentication headers for the market data API
///
/// Values that are not valid header text are skipped; the provider then
/// answers 401/403, which surfaces as a provider error.
pub fn auth_headers(api_key: &str, api_secret: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in [
        (HEADER_API_KEY_ID, api_key),
        (HEADER_API_SECRET_KEY, api_secret),
    ] {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        }
    }
    headers
}
