//! Alpaca market data API constants
//!
//! Endpoint paths, header names and the numeric bounds of the throttle/retry
//! policy live here so the driver, the policy and the tests agree on them.

use std::time::Duration;

/// Default market data host
pub const DEFAULT_DATA_BASE_URL: &str = "https://data.alpaca.markets";

/// Historical stock bars endpoint
pub const STOCK_BARS_ENDPOINT: &str = "/v2/stocks/bars";

/// Header carrying the API key id
pub const HEADER_API_KEY_ID: &str = "APCA-API-KEY-ID";

/// Header carrying the API secret
pub const HEADER_API_SECRET_KEY: &str = "APCA-API-SECRET-KEY";

/// Per-minute request quota
pub const HEADER_RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";

/// Requests left in the current window
pub const HEADER_RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Window reset time (unix epoch seconds)
pub const HEADER_RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Seconds to wait before retrying a 429
pub const HEADER_RETRY_AFTER: &str = "retry-after";

/// Smallest accepted page size
pub const MIN_PAGE_LIMIT: u32 = 1;

/// Largest accepted page size (also the default)
pub const MAX_PAGE_LIMIT: u32 = 10_000;

/// Retries allowed for a single page after the initial 429 (6 attempts total)
pub const MAX_RETRIES_PER_REQUEST: u32 = 5;

/// Upper bound for any single 429 retry wait
pub const MAX_RETRY_SLEEP: Duration = Duration::from_secs(5);

/// Exponential backoff table used when a 429 carries no timing headers
///
/// Indexed by 0-based retry attempt; attempts past the end use [`MAX_RETRY_SLEEP`].
pub const BACKOFF_SCHEDULE: [Duration; 4] = [
    Duration::from_millis(500),
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// Added to the reported reset time before a proactive wait ends
pub const THROTTLE_SAFETY_BUFFER: Duration = Duration::from_millis(250);

/// Upper bound for a proactive throttle wait
pub const MAX_THROTTLE_SLEEP: Duration = Duration::from_secs(10);

/// Proactive throttle kicks in when remaining requests drop to this value or below
pub const THROTTLE_REMAINING_THRESHOLD: i64 = 1;

/// Characters of a failing response body kept in provider errors
pub const ERROR_BODY_EXCERPT_CHARS: usize = 500;

/// Default upper bound on pages followed by a single fetch
pub const DEFAULT_MAX_PAGES: usize = 10_000;

/// Default per-request HTTP timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
