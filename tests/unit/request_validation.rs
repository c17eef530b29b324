//! Requests rejected before any network call

use crate::common::{client, manual_clock, ScriptedTransport};
use chrono::{NaiveDate, TimeZone, Utc};
use ohlcv_hub::fetcher::{FetchRequest, FetcherError, RequestBuilder};
use ohlcv_hub::{Adjustment, SortOrder};

fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

#[tokio::test]
async fn test_limit_out_of_range_sends_nothing() {
    for limit in [0u32, 10_001, 50_000] {
        let transport = ScriptedTransport::empty();
        let clock = manual_clock();

        let err = client(&transport, &clock)
            .fetch_bars(&FetchRequest::new(["SPY"], "1Day", jan(2), jan(5)).with_limit(limit))
            .await
            .unwrap_err();

        assert!(matches!(err, FetcherError::Validation(_)), "limit {limit}: {err}");
        assert_eq!(transport.request_count(), 0);
    }
}

#[tokio::test]
async fn test_blank_symbols_send_nothing() {
    let cases: Vec<Vec<&str>> = vec![vec![], vec![""], vec!["  ", " , "], vec![","]];
    for symbols in cases {
        let transport = ScriptedTransport::empty();
        let clock = manual_clock();

        let err = client(&transport, &clock)
            .fetch_bars(&FetchRequest::new(symbols.clone(), "1Day", jan(2), jan(5)))
            .await
            .unwrap_err();

        assert!(matches!(err, FetcherError::Validation(_)), "{symbols:?}");
        assert_eq!(transport.request_count(), 0);
    }
}

#[tokio::test]
async fn test_reversed_range_sends_nothing() {
    let transport = ScriptedTransport::empty();
    let clock = manual_clock();

    let err = client(&transport, &clock)
        .fetch_bars(&FetchRequest::new(["SPY"], "1Day", jan(5), jan(2)))
        .await
        .unwrap_err();

    assert!(matches!(err, FetcherError::Validation(_)));
    assert_eq!(transport.request_count(), 0);
}

#[test]
fn test_symbol_normalization() {
    let params = RequestBuilder::build(&FetchRequest::new(["spy, ,qqq", " iwm "], "1Day", jan(2), jan(5))).unwrap();
    assert_eq!(params.get("symbols"), Some("SPY,QQQ,IWM"));
}

#[test]
fn test_optional_params_omitted_unless_set() {
    let params = RequestBuilder::build(&FetchRequest::new(["SPY"], "1Day", jan(2), jan(5))).unwrap();
    for key in ["feed", "asof", "currency", "page_token"] {
        assert!(!params.contains(key), "{key} should be absent");
    }

    let params = RequestBuilder::build(
        &FetchRequest::new(["SPY"], "1Day", jan(2), jan(5))
            .with_feed("sip")
            .with_asof("2024-01-05")
            .with_currency("EUR")
            .with_adjustment(Adjustment::SpinOff)
            .with_sort(SortOrder::Desc),
    )
    .unwrap();
    assert_eq!(params.get("feed"), Some("sip"));
    assert_eq!(params.get("asof"), Some("2024-01-05"));
    assert_eq!(params.get("currency"), Some("EUR"));
    assert_eq!(params.get("adjustment"), Some("spin-off"));
    assert_eq!(params.get("sort"), Some("desc"));
}

#[test]
fn test_date_inputs_normalized() {
    let ts = Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap();
    let params = RequestBuilder::build(&FetchRequest::new(["SPY"], "1Hour", ts, "2024-01-05")).unwrap();
    assert_eq!(params.get("start"), Some("2024-01-02T14:30:00Z"));
    assert_eq!(params.get("end"), Some("2024-01-05"));

    let err = RequestBuilder::build(&FetchRequest::new(["SPY"], "1Day", "01/02/2024", jan(5))).unwrap_err();
    assert!(matches!(err, FetcherError::Validation(_)));
}
