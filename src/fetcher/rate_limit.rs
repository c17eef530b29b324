//! Quota tracking from `X-RateLimit-*` response headers
//!
//! Alpaca reports the per-minute quota on every response. The driver keeps
//! the most recent snapshot and uses it to decide whether the *next* request
//! should wait for the window to reset.

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use std::time::Duration;

use crate::fetcher::alpaca_config::{
    HEADER_RATE_LIMIT_LIMIT, HEADER_RATE_LIMIT_REMAINING, HEADER_RATE_LIMIT_RESET,
    MAX_THROTTLE_SLEEP, THROTTLE_REMAINING_THRESHOLD, THROTTLE_SAFETY_BUFFER,
};

/// Quota values reported by a single response
///
/// `None` means the header was absent or unparseable, which is different
/// from a reported value of zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    /// Requests allowed per window
    pub limit: Option<i64>,
    /// Requests left in the current window
    pub remaining: Option<i64>,
    /// When the current window resets
    pub reset: Option<DateTime<Utc>>,
}

impl RateLimitSnapshot {
    /// Read the snapshot from response headers
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            limit: header_i64(headers, HEADER_RATE_LIMIT_LIMIT),
            remaining: header_i64(headers, HEADER_RATE_LIMIT_REMAINING),
            reset: header_i64(headers, HEADER_RATE_LIMIT_RESET)
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        }
    }
}

/// Most recent quota snapshot for one fetch call
#[derive(Debug, Default)]
pub struct RateLimitState {
    snapshot: RateLimitSnapshot,
}

impl RateLimitState {
    /// Create a state with nothing known yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> RateLimitSnapshot {
        self.snapshot
    }

    /// Replace the snapshot with the values carried by `headers`
    ///
    /// Fields are never merged with the previous response; a header missing
    /// now clears whatever the prior response reported.
    pub fn update(&mut self, headers: &HeaderMap) {
        self.snapshot = RateLimitSnapshot::from_headers(headers);
    }

    /// Proactive wait required before the next request, if any
    ///
    /// Returns `Some(wait)` only when both `remaining` and `reset` are known
    /// and `remaining` is at or below the threshold. The wait is
    /// `reset - now + 0.25s`, floored at zero and capped at 10 seconds.
    pub fn should_throttle(&self, now: DateTime<Utc>) -> Option<Duration> {
        let remaining = self.snapshot.remaining?;
        let reset = self.snapshot.reset?;
        if remaining > THROTTLE_REMAINING_THRESHOLD {
            return None;
        }

        let buffer = chrono::Duration::milliseconds(THROTTLE_SAFETY_BUFFER.as_millis() as i64);
        // negative when the window already reset
        let wait = (reset - now + buffer).to_std().unwrap_or(Duration::ZERO);

        Some(wait.min(MAX_THROTTLE_SLEEP))
    }
}

/// Parse an integer header, treating garbage as absent
pub(crate) fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse::<i64>()
        .ok()
}
