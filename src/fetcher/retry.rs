//! Wait selection for throttled (HTTP 429) responses
//!
//! Strategy, in priority order:
//! 1. `Retry-After` seconds from the rejected response
//! 2. `X-RateLimit-Reset` minus the current time
//! 3. Exponential backoff indexed by retry attempt
//!
//! Every strategy is capped at [`MAX_RETRY_SLEEP`].

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use std::fmt;
use std::time::Duration;

use crate::fetcher::alpaca_config::{
    BACKOFF_SCHEDULE, HEADER_RATE_LIMIT_RESET, HEADER_RETRY_AFTER, MAX_RETRY_SLEEP,
};
use crate::fetcher::rate_limit::header_i64;

/// Which source determined a retry wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryStrategy {
    /// `Retry-After` header
    RetryAfter,
    /// `X-RateLimit-Reset` header
    RateLimitReset,
    /// Exponential backoff table
    Backoff,
}

impl RetryStrategy {
    /// Name reported to observers and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryStrategy::RetryAfter => "Retry-After",
            RetryStrategy::RateLimitReset => "X-RateLimit-Reset",
            RetryStrategy::Backoff => "backoff",
        }
    }
}

impl fmt::Display for RetryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retry wait policy for 429 responses
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy;

impl RetryPolicy {
    /// Compute how long to wait before re-sending a throttled request
    ///
    /// # Arguments
    /// * `headers` - Headers of the 429 response currently in hand
    /// * `attempt` - 0-based retry index (0 = first retry after the initial 429)
    /// * `now` - Current time from the injected clock
    ///
    /// # Returns
    /// The wait and the strategy that produced it
    pub fn compute_wait(
        &self,
        headers: &HeaderMap,
        attempt: u32,
        now: DateTime<Utc>,
    ) -> (Duration, RetryStrategy) {
        if let Some(secs) = retry_after_seconds(headers) {
            return (
                Duration::from_secs_f64(secs.clamp(0.0, MAX_RETRY_SLEEP.as_secs_f64())),
                RetryStrategy::RetryAfter,
            );
        }

        if let Some(reset) = header_i64(headers, HEADER_RATE_LIMIT_RESET) {
            let wait = reset.saturating_sub(now.timestamp()).max(0) as u64;
            return (
                Duration::from_secs(wait).min(MAX_RETRY_SLEEP),
                RetryStrategy::RateLimitReset,
            );
        }

        let wait = BACKOFF_SCHEDULE
            .get(attempt as usize)
            .copied()
            .unwrap_or(MAX_RETRY_SLEEP);
        (wait.min(MAX_RETRY_SLEEP), RetryStrategy::Backoff)
    }
}

/// `Retry-After` as seconds; HTTP-date values and garbage count as absent
fn retry_after_seconds(headers: &HeaderMap) -> Option<f64> {
    let secs = headers
        .get(HEADER_RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()?;
    secs.is_finite().then_some(secs)
}
