//! Page loop for `/v2/stocks/bars`
//!
//! Each iteration:
//! 1. Copy the base params, adding `page_token` after the first page
//! 2. Proactive throttle gate from the *previous* response's quota snapshot
//! 3. Send through the [`Transport`]
//! 4. Retry 429s (at most 5 retries) with waits from [`RetryPolicy`]
//! 5. Replace the quota snapshot from the response in hand, whatever its status
//! 6. Fail on any non-200
//! 7. Merge the page's bars into the aggregate
//! 8. Continue while `next_page_token` is a non-empty string
//!
//! The gate and the retry waits are separate so one physical attempt is
//! never delayed twice for the same cause. The loop is strictly sequential.

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::FetchSettings;
use crate::fetcher::alpaca_config::{ERROR_BODY_EXCERPT_CHARS, MAX_RETRIES_PER_REQUEST};
use crate::fetcher::alpaca_http::{HttpResponse, Transport};
use crate::fetcher::alpaca_parser::{parse_bars_page, BarsPage};
use crate::fetcher::clock::Clock;
use crate::fetcher::observer::{FetchObserver, PageEvent, RetryEvent, ThrottleEvent};
use crate::fetcher::rate_limit::RateLimitState;
use crate::fetcher::request::QueryParams;
use crate::fetcher::retry::RetryPolicy;
use crate::fetcher::{FetcherError, FetcherResult};
use crate::{metrics, Bar};

/// Bars merged across every page of one fetch call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarsAggregate {
    /// Bars per symbol in page arrival order
    pub bars: BTreeMap<String, Vec<Bar>>,
    /// Currency reported by the first page that carried one
    pub currency: Option<String>,
}

impl BarsAggregate {
    /// Append a page; returns the number of bars merged
    ///
    /// Bars are appended per symbol after whatever earlier pages delivered,
    /// never sorted or deduplicated.
    pub fn merge_page(&mut self, page: BarsPage) -> usize {
        let mut merged = 0;
        for (symbol, raw_bars) in page.bars {
            merged += raw_bars.len();
            self.bars
                .entry(symbol)
                .or_default()
                .extend(raw_bars.into_iter().map(Bar::from));
        }
        if self.currency.is_none() {
            self.currency = page.currency;
        }
        merged
    }

    /// Total bars across all symbols
    pub fn total_bars(&self) -> usize {
        self.bars.values().map(Vec::len).sum()
    }

    /// Whether no bars were returned at all
    pub fn is_empty(&self) -> bool {
        self.total_bars() == 0
    }
}

/// Drives one paginated fetch with the injected collaborators
pub struct PaginationDriver<'a> {
    transport: &'a dyn Transport,
    clock: &'a dyn Clock,
    observer: &'a dyn FetchObserver,
    settings: &'a FetchSettings,
    url: &'a str,
    headers: &'a HeaderMap,
    retry_policy: RetryPolicy,
}

impl<'a> PaginationDriver<'a> {
    /// Wire up a driver
    ///
    /// # Arguments
    /// * `transport` - Sends each GET
    /// * `clock` - Supplies "now" and performs every wait
    /// * `observer` - Receives throttle/retry/page events
    /// * `settings` - Page cap and deadline
    /// * `url` - Absolute bars endpoint URL
    /// * `headers` - Authentication headers sent with every request
    pub fn new(
        transport: &'a dyn Transport,
        clock: &'a dyn Clock,
        observer: &'a dyn FetchObserver,
        settings: &'a FetchSettings,
        url: &'a str,
        headers: &'a HeaderMap,
    ) -> Self {
        Self {
            transport,
            clock,
            observer,
            settings,
            url,
            headers,
            retry_policy: RetryPolicy,
        }
    }

    /// Follow every page and return the merged aggregate
    ///
    /// # Errors
    /// - `Provider` on a non-200 final status or malformed body
    /// - `Transport` when the transport fails (not retried)
    /// - `PageLimitExceeded` / `DeadlineExceeded` per [`FetchSettings`]
    ///
    /// No partial aggregate is returned on failure.
    pub async fn run(&self, base_params: &QueryParams) -> FetcherResult<BarsAggregate> {
        let deadline_at = self
            .settings
            .deadline
            .and_then(|limit| self.clock.now().checked_add_signed(to_chrono(limit)));

        let mut rate_limit = RateLimitState::new();
        let mut aggregate = BarsAggregate::default();
        let mut cursor: Option<String> = None;
        let mut page = 0usize;

        loop {
            if let Some(max_pages) = self.settings.max_pages {
                if page >= max_pages {
                    warn!(max_pages, "Provider kept paginating past the page cap");
                    return Err(FetcherError::PageLimitExceeded { max_pages });
                }
            }
            page += 1;

            let params = match &cursor {
                Some(token) => base_params.with_page_token(token),
                None => base_params.clone(),
            };

            if page > 1 {
                if let Some(wait) = rate_limit.should_throttle(self.clock.now()) {
                    if !wait.is_zero() {
                        self.observer.on_throttle(&ThrottleEvent {
                            page,
                            snapshot: rate_limit.snapshot(),
                            wait,
                        });
                        self.sleep(wait, deadline_at).await?;
                    }
                }
            }

            let mut response = self.send(&params, deadline_at).await?;
            let mut retries = 0u32;
            while response.status == 429 && retries < MAX_RETRIES_PER_REQUEST {
                let (wait, strategy) =
                    self.retry_policy
                        .compute_wait(&response.headers, retries, self.clock.now());
                self.observer.on_retry(&RetryEvent {
                    page,
                    attempt: retries,
                    wait,
                    strategy,
                });
                self.sleep(wait, deadline_at).await?;
                retries += 1;
                response = self.send(&params, deadline_at).await?;
            }

            rate_limit.update(&response.headers);

            if response.status != 200 {
                return Err(provider_error(&response));
            }

            let body = parse_bars_page(&response.body)?;
            let next = body.next_token().map(str::to_string);
            let merged = aggregate.merge_page(body);

            self.observer.on_page(&PageEvent {
                page,
                bars: merged,
                attempts: retries + 1,
                has_next: next.is_some(),
            });

            match next {
                Some(token) => cursor = Some(token),
                None => break,
            }
        }

        debug!(
            pages = page,
            symbols = aggregate.bars.len(),
            bars = aggregate.total_bars(),
            "Pagination complete"
        );
        Ok(aggregate)
    }

    async fn send(
        &self,
        params: &QueryParams,
        deadline_at: Option<DateTime<Utc>>,
    ) -> FetcherResult<HttpResponse> {
        self.check_deadline(self.clock.now(), deadline_at)?;

        let started = Instant::now();
        match self
            .transport
            .get(self.url, params.as_slice(), self.headers)
            .await
        {
            Ok(response) => {
                metrics::record_request(response.status, started.elapsed());
                Ok(response)
            }
            Err(e) => {
                metrics::record_transport_error(started.elapsed());
                Err(e.into())
            }
        }
    }

    async fn sleep(&self, wait: Duration, deadline_at: Option<DateTime<Utc>>) -> FetcherResult<()> {
        let wake_at = self
            .clock
            .now()
            .checked_add_signed(to_chrono(wait))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.check_deadline(wake_at, deadline_at)?;
        self.clock.sleep(wait).await;
        Ok(())
    }

    fn check_deadline(
        &self,
        at: DateTime<Utc>,
        deadline_at: Option<DateTime<Utc>>,
    ) -> FetcherResult<()> {
        match (deadline_at, self.settings.deadline) {
            (Some(limit_at), Some(deadline)) if at > limit_at => {
                warn!(deadline_secs = deadline.as_secs_f64(), "Fetch deadline exceeded");
                Err(FetcherError::DeadlineExceeded { deadline })
            }
            _ => Ok(()),
        }
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

/// Provider error for a final non-200 response
fn provider_error(response: &HttpResponse) -> FetcherError {
    let excerpt = body_excerpt(&response.body, ERROR_BODY_EXCERPT_CHARS);
    let message = if response.status == 429 {
        format!(
            "API rate limited (429) after {MAX_RETRIES_PER_REQUEST} retries exhausted: {excerpt}"
        )
    } else {
        format!("request failed with status {}: {excerpt}", response.status)
    };
    FetcherError::Provider {
        status: response.status,
        message,
    }
}

/// First `max_chars` characters of the body, or a placeholder when empty
pub(crate) fn body_excerpt(body: &str, max_chars: usize) -> String {
    if body.is_empty() {
        return "(no response body)".to_string();
    }
    body.chars().take(max_chars).collect()
}
