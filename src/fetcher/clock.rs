//! Time source and sleep primitive used by the fetch loop
//!
//! Every wait the pagination driver performs (proactive throttle, 429 retry
//! backoff) and every "now" reading it takes goes through [`Clock`]. The
//! production binding is [`SystemClock`]. [`ManualClock`] never blocks: it
//! records each requested sleep and advances its own virtual time instead,
//! which is what tests and benchmarks drive the loop with.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Injected wall clock and sleeper
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current UTC instant
    fn now(&self) -> DateTime<Utc>;

    /// Wait for `duration` before returning
    async fn sleep(&self, duration: Duration);
}

/// Real wall clock backed by `chrono::Utc::now` and `tokio::time::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock: sleeping returns immediately and moves "now" forward
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Move virtual time forward without recording a sleep
    pub fn advance(&self, by: Duration) {
        let mut now = lock(&self.now);
        *now += chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.sleeps).clone()
    }

    /// Sum of all recorded sleeps
    pub fn total_slept(&self) -> Duration {
        lock(&self.sleeps).iter().sum()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }

    async fn sleep(&self, duration: Duration) {
        lock(&self.sleeps).push(duration);
        self.advance(duration);
    }
}

// A poisoned lock only means another test thread panicked mid-update; the
// recorded data is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
