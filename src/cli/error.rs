//! CLI error types and conversions

use crate::config::ConfigError;
use crate::dataset::DatasetError;
use crate::fetcher::{FetcherError, TransportError};
use crate::metrics::MetricsError;
use crate::output::OutputError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(#[from] ConfigError),

    /// Fetcher error
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Dataset error
    #[error("dataset error: {0}")]
    DatasetError(#[from] DatasetError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// Metrics exporter error
    #[error("metrics error: {0}")]
    MetricsError(#[from] MetricsError),

    /// Connectivity check failed
    #[error("API connectivity test failed: {0}")]
    PingFailed(String),
}

impl From<TransportError> for CliError {
    fn from(e: TransportError) -> Self {
        CliError::FetcherError(FetcherError::Transport(e))
    }
}

impl CliError {
    /// Underlying fetcher error, also when wrapped by the dataset layer
    pub fn fetcher_error(&self) -> Option<&FetcherError> {
        match self {
            CliError::FetcherError(e) | CliError::DatasetError(DatasetError::Fetch(e)) => Some(e),
            _ => None,
        }
    }
}
