//! Doctor command: configuration check and optional connectivity ping

use chrono::{Days, NaiveDate, Utc};
use clap::Args;
use tracing::info;

use super::CliError;
use crate::config::{Config, FetchSettings};
use crate::fetcher::alpaca_config::STOCK_BARS_ENDPOINT;
use crate::fetcher::alpaca_http::auth_headers;
use crate::fetcher::pagination::body_excerpt;
use crate::fetcher::{FetchRequest, ReqwestTransport, RequestBuilder, Transport};
use crate::Feed;

/// Lookback window of the ping request
const PING_LOOKBACK_DAYS: u64 = 10;

/// Symbol requested by the ping
const PING_SYMBOL: &str = "SPY";

/// Body excerpt length in ping failures
const PING_EXCERPT_CHARS: usize = 200;

/// Doctor command arguments
#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Perform a test API request to verify connectivity
    #[arg(long)]
    pub ping: bool,
}

impl DoctorArgs {
    /// Execute the doctor command
    pub async fn execute(&self) -> Result<(), CliError> {
        let config = Config::from_env(true)?;

        println!("✓ Configuration OK");
        println!("  API Key: {}", config.masked_api_key());
        println!("  API Secret: ********");
        println!("  Base URL: {}", config.data_base_url);

        if !self.ping {
            println!("\nUse --ping to test API connectivity");
            return Ok(());
        }

        println!("\nTesting API connectivity...");
        let transport = ReqwestTransport::new(FetchSettings::default().request_timeout)?;
        ping(&transport, &config, Utc::now().date_naive()).await?;
        println!("✓ API connectivity test passed");
        Ok(())
    }
}

/// Send one `limit=1` bars request for the last ten days on the IEX feed
///
/// # Errors
/// `CliError::PingFailed` on any non-200 status, transport errors otherwise
pub async fn ping(transport: &dyn Transport, config: &Config, today: NaiveDate) -> Result<(), CliError> {
    let start = today
        .checked_sub_days(Days::new(PING_LOOKBACK_DAYS))
        .unwrap_or(today);
    let request = FetchRequest::new([PING_SYMBOL], "1Day", start, today)
        .with_limit(1)
        .with_feed(Feed::Iex.as_str());
    let params = RequestBuilder::build(&request)?;

    let url = format!("{}{}", config.data_base_url, STOCK_BARS_ENDPOINT);
    let headers = auth_headers(&config.api_key, &config.api_secret);
    let response = transport.get(&url, params.as_slice(), &headers).await?;

    info!(status = response.status, "Ping response received");
    if response.status != 200 {
        return Err(CliError::PingFailed(format!(
            "API request failed with status {}: {}",
            response.status,
            body_excerpt(&response.body, PING_EXCERPT_CHARS)
        )));
    }
    Ok(())
}
