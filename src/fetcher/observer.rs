//! Structured events emitted by the pagination driver
//!
//! The driver reports every throttle decision, retry attempt and merged page
//! to an injected [`FetchObserver`]. [`TracingObserver`] forwards them to
//! `tracing` and the `metrics` facade; tests inject a recorder instead.

use std::time::Duration;
use tracing::{debug, info};

use crate::fetcher::rate_limit::RateLimitSnapshot;
use crate::fetcher::retry::RetryStrategy;
use crate::metrics;

/// Proactive wait applied before sending a page request
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleEvent {
    /// 1-based page index about to be requested
    pub page: usize,
    /// Snapshot that triggered the wait
    pub snapshot: RateLimitSnapshot,
    /// Wait applied (already capped)
    pub wait: Duration,
}

/// 429 retry about to be performed
#[derive(Debug, Clone, PartialEq)]
pub struct RetryEvent {
    /// 1-based page index
    pub page: usize,
    /// 0-based retry index
    pub attempt: u32,
    /// Wait before the retry (already capped)
    pub wait: Duration,
    /// Which header or table produced the wait
    pub strategy: RetryStrategy,
}

/// Page merged into the aggregate
#[derive(Debug, Clone, PartialEq)]
pub struct PageEvent {
    /// 1-based page index
    pub page: usize,
    /// Bars merged from this page
    pub bars: usize,
    /// Requests sent for this page (1 + retries)
    pub attempts: u32,
    /// Whether another page follows
    pub has_next: bool,
}

/// Receives one structured event per driver decision
pub trait FetchObserver: Send + Sync {
    /// A proactive throttle wait is about to happen
    fn on_throttle(&self, _event: &ThrottleEvent) {}

    /// A 429 retry wait is about to happen
    fn on_retry(&self, _event: &RetryEvent) {}

    /// A page was merged
    fn on_page(&self, _event: &PageEvent) {}
}

/// Default observer: structured `tracing` events plus fetch metrics
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl FetchObserver for TracingObserver {
    fn on_throttle(&self, event: &ThrottleEvent) {
        metrics::record_throttle_wait(event.wait);
        info!(
            page = event.page,
            remaining = ?event.snapshot.remaining,
            reset = ?event.snapshot.reset,
            wait_secs = event.wait.as_secs_f64(),
            "Proactive throttle"
        );
    }

    fn on_retry(&self, event: &RetryEvent) {
        metrics::record_retry_backoff(event.wait, event.attempt);
        info!(
            page = event.page,
            attempt = event.attempt + 1,
            wait_secs = event.wait.as_secs_f64(),
            strategy = %event.strategy,
            "429 retry"
        );
    }

    fn on_page(&self, event: &PageEvent) {
        debug!(
            page = event.page,
            bars = event.bars,
            attempts = event.attempts,
            has_next = event.has_next,
            "Page merged"
        );
    }
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl FetchObserver for NoopObserver {}
