//! Environment configuration and fetch tuning
//!
//! Credentials and the API host come from the environment:
//! - `ALPACA_API_KEY`
//! - `ALPACA_API_SECRET`
//! - `ALPACA_DATA_BASE_URL` (optional, defaults to <https://data.alpaca.markets>)

use std::time::Duration;

use crate::fetcher::alpaca_config::{
    DEFAULT_DATA_BASE_URL, DEFAULT_MAX_PAGES, DEFAULT_REQUEST_TIMEOUT,
};

/// Environment variable holding the API key id
pub const ENV_API_KEY: &str = "ALPACA_API_KEY";

/// Environment variable holding the API secret
pub const ENV_API_SECRET: &str = "ALPACA_API_SECRET";

/// Environment variable overriding the market data host
pub const ENV_DATA_BASE_URL: &str = "ALPACA_DATA_BASE_URL";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required variable unset or empty
    #[error("{0} environment variable is required but not set")]
    MissingVar(&'static str),
}

/// Credentials and host for the market data API
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// API key id
    pub api_key: String,
    /// API secret
    pub api_secret: String,
    /// Market data host without trailing slash
    pub data_base_url: String,
}

// Secrets stay out of debug output.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &mask_secret(&self.api_key))
            .field("api_secret", &"***")
            .field("data_base_url", &self.data_base_url)
            .finish()
    }
}

impl Config {
    /// Load from the process environment
    ///
    /// # Errors
    /// `ConfigError::MissingVar` when `require_keys` is set and a key is unset or empty
    pub fn from_env(require_keys: bool) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok(), require_keys)
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F, require_keys: bool) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(ENV_API_KEY).unwrap_or_default();
        let api_secret = lookup(ENV_API_SECRET).unwrap_or_default();
        let data_base_url = lookup(ENV_DATA_BASE_URL)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_BASE_URL.to_string());

        if require_keys {
            if api_key.is_empty() {
                return Err(ConfigError::MissingVar(ENV_API_KEY));
            }
            if api_secret.is_empty() {
                return Err(ConfigError::MissingVar(ENV_API_SECRET));
            }
        }

        Ok(Self {
            api_key,
            api_secret,
            data_base_url: data_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Whether both credentials are present
    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    /// Key id safe for display (`PKAB...WXYZ`)
    pub fn masked_api_key(&self) -> String {
        mask_secret(&self.api_key)
    }
}

fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    match chars.len() {
        0 => "(not set)".to_string(),
        n if n <= 8 => "*".repeat(n),
        n => {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[n - 4..].iter().collect();
            format!("{head}...{tail}")
        }
    }
}

/// Tuning for one fetch call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    /// Per-request HTTP timeout for the internally owned transport
    pub request_timeout: Duration,
    /// Maximum pages followed; `None` removes the cap
    pub max_pages: Option<usize>,
    /// Wall time allowed for the whole call, retries and waits included
    pub deadline: Option<Duration>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_pages: Some(DEFAULT_MAX_PAGES),
            deadline: None,
        }
    }
}
