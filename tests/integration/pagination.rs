//! Page loop behavior through the public client: merge, throttle, 429 retries

use crate::common::{
    bar, client, manual_clock, ok_page, param, rate_limited, start_time, RecordingObserver,
    ScriptedTransport,
};
use chrono::NaiveDate;
use ohlcv_hub::config::FetchSettings;
use ohlcv_hub::fetcher::retry::RetryStrategy;
use ohlcv_hub::fetcher::{FetchRequest, FetcherError, HttpResponse};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn request(symbols: &[&str]) -> FetchRequest {
    FetchRequest::new(
        symbols.iter().copied(),
        "1Day",
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    )
}

fn quota_page(remaining: i64, reset_in_secs: i64) -> HttpResponse {
    let reset = start_time().timestamp() + reset_in_secs;
    ok_page(json!({"AAPL": [bar("2024-01-02T05:00:00Z", 185.0)]}), Some("next"))
        .with_header("X-RateLimit-Limit", "200")
        .with_header("X-RateLimit-Remaining", &remaining.to_string())
        .with_header("X-RateLimit-Reset", &reset.to_string())
}

#[tokio::test]
async fn test_two_pages_merge_and_forward_token() {
    let transport = ScriptedTransport::new([
        ok_page(
            json!({"AAPL": [bar("2024-01-02T05:00:00Z", 185.0), bar("2024-01-03T05:00:00Z", 184.0)]}),
            Some("tok1"),
        ),
        ok_page(json!({"TSLA": [bar("2024-01-02T05:00:00Z", 248.0)]}), None),
    ]);
    let clock = manual_clock();

    let aggregate = client(&transport, &clock)
        .fetch_bars(&request(&["AAPL", "TSLA"]))
        .await
        .unwrap();

    assert_eq!(aggregate.bars["AAPL"].len(), 2);
    assert_eq!(aggregate.bars["TSLA"].len(), 1);
    assert_eq!(aggregate.bars["TSLA"][0].close, 248.0);
    assert_eq!(aggregate.currency.as_deref(), Some("USD"));

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(param(&requests[0], "page_token"), None);
    assert_eq!(param(&requests[1], "page_token"), Some("tok1"));
    assert_eq!(param(&requests[1], "symbols"), Some("AAPL,TSLA"));
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_empty_token_ends_pagination() {
    let transport = ScriptedTransport::new([ok_page(
        json!({"AAPL": [bar("2024-01-02T05:00:00Z", 185.0)]}),
        Some(""),
    )]);
    let clock = manual_clock();

    let aggregate = client(&transport, &clock)
        .fetch_bars(&request(&["AAPL"]))
        .await
        .unwrap();

    assert_eq!(aggregate.total_bars(), 1);
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_request_url_and_auth_headers() {
    let transport = ScriptedTransport::new([ok_page(json!({}), None)]);
    let clock = manual_clock();

    client(&transport, &clock)
        .fetch_bars(&request(&["SPY"]))
        .await
        .unwrap();

    assert_eq!(transport.urls(), vec!["http://alpaca.test/v2/stocks/bars"]);
    let headers = &transport.sent_headers()[0];
    assert_eq!(headers.get("APCA-API-KEY-ID").unwrap(), "PKTESTKEY0001");
    assert_eq!(headers.get("APCA-API-SECRET-KEY").unwrap(), "test-secret");
}

#[tokio::test]
async fn test_exhausted_quota_delays_next_page() {
    let transport = ScriptedTransport::new([
        quota_page(0, 5),
        ok_page(json!({"AAPL": [bar("2024-01-03T05:00:00Z", 186.0)]}), None),
    ]);
    let clock = manual_clock();
    let observer = Arc::new(RecordingObserver::default());

    client(&transport, &clock)
        .with_observer(observer.clone())
        .fetch_bars(&request(&["AAPL"]))
        .await
        .unwrap();

    assert_eq!(clock.sleeps(), vec![Duration::from_millis(5_250)]);
    assert_eq!(transport.request_count(), 2);

    let throttles = observer.throttles.lock().unwrap();
    assert_eq!(throttles.len(), 1);
    assert_eq!(throttles[0].page, 2);
    assert_eq!(throttles[0].snapshot.remaining, Some(0));
    assert_eq!(throttles[0].snapshot.limit, Some(200));
}

#[tokio::test]
async fn test_throttle_wait_is_capped() {
    let transport = ScriptedTransport::new([
        quota_page(1, 60),
        ok_page(json!({}), None),
    ]);
    let clock = manual_clock();

    client(&transport, &clock)
        .fetch_bars(&request(&["AAPL"]))
        .await
        .unwrap();

    assert_eq!(clock.sleeps(), vec![Duration::from_secs(10)]);
}

#[tokio::test]
async fn test_remaining_quota_does_not_throttle() {
    let transport = ScriptedTransport::new([
        quota_page(2, 5),
        ok_page(json!({}), None),
    ]);
    let clock = manual_clock();

    client(&transport, &clock)
        .fetch_bars(&request(&["AAPL"]))
        .await
        .unwrap();

    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_first_request_never_throttled() {
    // exhausted quota on the only page: nothing follows, nothing waits
    let transport = ScriptedTransport::new([
        ok_page(json!({"AAPL": [bar("2024-01-02T05:00:00Z", 185.0)]}), None)
            .with_header("X-RateLimit-Remaining", "0")
            .with_header("X-RateLimit-Reset", &(start_time().timestamp() + 5).to_string()),
    ]);
    let clock = manual_clock();

    client(&transport, &clock)
        .fetch_bars(&request(&["AAPL"]))
        .await
        .unwrap();

    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_missing_rate_limit_headers_never_throttle() {
    let transport = ScriptedTransport::new([
        ok_page(json!({"AAPL": [bar("2024-01-02T05:00:00Z", 185.0)]}), Some("a")),
        ok_page(json!({"AAPL": [bar("2024-01-03T05:00:00Z", 186.0)]}), Some("b")),
        ok_page(json!({"AAPL": [bar("2024-01-04T05:00:00Z", 187.0)]}), None),
    ]);
    let clock = manual_clock();

    let aggregate = client(&transport, &clock)
        .fetch_bars(&request(&["AAPL"]))
        .await
        .unwrap();

    assert_eq!(aggregate.total_bars(), 3);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_three_429s_then_success() {
    let transport = ScriptedTransport::new([
        rate_limited("1"),
        rate_limited("1"),
        rate_limited("1"),
        ok_page(json!({"AAPL": [bar("2024-01-02T05:00:00Z", 185.0)]}), None),
    ]);
    let clock = manual_clock();
    let observer = Arc::new(RecordingObserver::default());

    let aggregate = client(&transport, &clock)
        .with_observer(observer.clone())
        .fetch_bars(&request(&["AAPL"]))
        .await
        .unwrap();

    assert_eq!(aggregate.total_bars(), 1);
    assert_eq!(transport.request_count(), 4);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(1); 3]);

    let retries = observer.retries.lock().unwrap();
    assert_eq!(retries.len(), 3);
    assert_eq!(
        retries.iter().map(|e| e.attempt).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert!(retries.iter().all(|e| e.strategy == RetryStrategy::RetryAfter));

    let pages = observer.pages.lock().unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].attempts, 4);
}

#[tokio::test]
async fn test_retry_after_is_capped() {
    let transport = ScriptedTransport::new([
        rate_limited("120"),
        ok_page(json!({}), None),
    ]);
    let clock = manual_clock();

    client(&transport, &clock)
        .fetch_bars(&request(&["AAPL"]))
        .await
        .unwrap();

    assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
}

#[tokio::test]
async fn test_429_without_headers_uses_backoff_table() {
    let transport = ScriptedTransport::new([
        HttpResponse::new(429, ""),
        HttpResponse::new(429, ""),
        HttpResponse::new(429, ""),
        HttpResponse::new(429, ""),
        HttpResponse::new(429, ""),
        HttpResponse::new(200, r#"{"bars":{},"next_page_token":null}"#),
    ]);
    let clock = manual_clock();

    client(&transport, &clock)
        .fetch_bars(&request(&["AAPL"]))
        .await
        .unwrap();

    assert_eq!(
        clock.sleeps(),
        vec![
            Duration::from_millis(500),
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(5),
        ]
    );
}

#[tokio::test]
async fn test_retries_exhausted_fails_with_429() {
    let transport = ScriptedTransport::new(std::iter::repeat_with(|| rate_limited("1")).take(6));
    let clock = manual_clock();

    let err = client(&transport, &clock)
        .fetch_bars(&request(&["AAPL"]))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(429));
    assert!(err.to_string().contains("retries exhausted"), "{err}");
    assert_eq!(transport.request_count(), 6);
    assert_eq!(clock.sleeps().len(), 5);
}

#[tokio::test]
async fn test_non_429_errors_are_not_retried() {
    for status in [400u16, 401, 403, 500] {
        let transport = ScriptedTransport::new([HttpResponse::new(status, "nope")]);
        let clock = manual_clock();

        let err = client(&transport, &clock)
            .fetch_bars(&request(&["AAPL"]))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(status));
        assert!(err.to_string().contains("nope"), "{err}");
        assert_eq!(transport.request_count(), 1);
        assert!(clock.sleeps().is_empty());
    }
}

#[tokio::test]
async fn test_failure_on_later_page_discards_aggregate() {
    let transport = ScriptedTransport::new([
        ok_page(json!({"AAPL": [bar("2024-01-02T05:00:00Z", 185.0)]}), Some("tok1")),
        HttpResponse::new(500, ""),
    ]);
    let clock = manual_clock();

    let err = client(&transport, &clock)
        .fetch_bars(&request(&["AAPL"]))
        .await
        .unwrap_err();

    match err {
        FetcherError::Provider { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("(no response body)"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_merge_keeps_page_arrival_order() {
    let transport = ScriptedTransport::new([
        ok_page(
            json!({"AAPL": [bar("2024-01-04T05:00:00Z", 3.0)], "MSFT": [bar("2024-01-02T05:00:00Z", 10.0)]}),
            Some("p2"),
        ),
        ok_page(json!({"AAPL": [bar("2024-01-02T05:00:00Z", 1.0)]}), None),
    ]);
    let clock = manual_clock();

    let aggregate = client(&transport, &clock)
        .fetch_bars(&request(&["AAPL", "MSFT"]))
        .await
        .unwrap();

    let closes: Vec<f64> = aggregate.bars["AAPL"].iter().map(|b| b.close).collect();
    assert_eq!(closes, vec![3.0, 1.0]);
}

#[tokio::test]
async fn test_malformed_bar_is_provider_error() {
    let transport = ScriptedTransport::new([HttpResponse::new(
        200,
        r#"{"bars":{"AAPL":[{"t":"2024-01-02T05:00:00Z","o":1.0}]},"next_page_token":null}"#,
    )]);
    let clock = manual_clock();

    let err = client(&transport, &clock)
        .fetch_bars(&request(&["AAPL"]))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(200));
}

#[tokio::test]
async fn test_endless_pagination_hits_page_cap() {
    let transport = ScriptedTransport::new(
        std::iter::repeat_with(|| ok_page(json!({}), Some("again"))).take(10),
    );
    let clock = manual_clock();

    let err = client(&transport, &clock)
        .with_settings(FetchSettings {
            max_pages: Some(3),
            ..FetchSettings::default()
        })
        .fetch_bars(&request(&["AAPL"]))
        .await
        .unwrap_err();

    assert!(matches!(err, FetcherError::PageLimitExceeded { max_pages: 3 }));
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn test_deadline_covers_throttle_waits() {
    let transport = ScriptedTransport::new([
        quota_page(0, 8),
        ok_page(json!({}), None),
    ]);
    let clock = manual_clock();

    let err = client(&transport, &clock)
        .with_settings(FetchSettings {
            deadline: Some(Duration::from_secs(5)),
            ..FetchSettings::default()
        })
        .fetch_bars(&request(&["AAPL"]))
        .await
        .unwrap_err();

    assert!(matches!(err, FetcherError::DeadlineExceeded { .. }));
    assert_eq!(transport.request_count(), 1);
    assert!(clock.sleeps().is_empty());
}
