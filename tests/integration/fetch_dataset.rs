//! Dataset build and export driven by the fetch command, against a scripted provider

use crate::common::{bar, client, manual_clock, ok_page, param, ScriptedTransport};
use chrono::{NaiveDate, TimeZone, Utc};
use clap::Parser;
use ohlcv_hub::cli::{Cli, Commands, FetchArgs};
use ohlcv_hub::dataset::{self, DatasetRequest};
use ohlcv_hub::{Adjustment, Feed, Timeframe};
use serde_json::{json, Value};
use std::path::Path;

fn fetch_args(out: &Path, tf: &str, extra: &[&str]) -> FetchArgs {
    let out = out.to_string_lossy().to_string();
    let mut argv = vec![
        "ohlcv-hub", "fetch", "--symbols", "aapl", "--start", "2024-01-02", "--end",
        "2024-01-05", "--tf", tf, "--out", out.as_str(),
    ];
    argv.extend_from_slice(extra);
    match Cli::try_parse_from(argv).unwrap().command {
        Commands::Fetch(args) => args,
        other => panic!("unexpected command: {other:?}"),
    }
}

fn daily_page() -> serde_json::Value {
    // Jan 5 is a session with no bar
    json!({
        "AAPL": [
            bar("2024-01-02T05:00:00Z", 185.0),
            bar("2024-01-03T05:00:00Z", 184.0),
            bar("2024-01-04T05:00:00Z", 182.0),
        ]
    })
}

#[tokio::test]
async fn test_daily_fetch_exports_csv_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let args = fetch_args(dir.path(), "1d", &["--format", "csv"]);
    let plan = args.plan().unwrap();

    let transport = ScriptedTransport::new([ok_page(daily_page(), None)]);
    let clock = manual_clock();
    let outcome = args.run(&client(&transport, &clock), &plan).await.unwrap();

    assert!(outcome.ok);
    assert_eq!(
        outcome.output_path,
        dir.path().join("ohlcv_1d_20240102_20240105.csv")
    );

    let csv = std::fs::read_to_string(&outcome.output_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("AAPL,1d,2024-01-02T05:00:00Z,184.0,187.0,183.0,185.0,1000000,alpaca,USD,raw"), "{}", lines[1]);

    let report_path = outcome.report_path.unwrap();
    assert_eq!(report_path, dir.path().join("validation_report.json"));
    let report: Value = serde_json::from_str(&std::fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(report["summary"]["bars_count"], 3);
    assert_eq!(report["summary"]["symbols_count"], 1);
    assert_eq!(report["summary"]["date_range"]["start"], "2024-01-02");
    assert_eq!(report["missing_days"]["AAPL"], json!(["2024-01-05"]));
    assert_eq!(report["missing_days"]["totals"]["missing_days_count_total"], 1);
    assert_eq!(report["issues"]["ohlc_violations"]["count"], 0);

    let sent = transport.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(param(&sent[0], "timeframe"), Some("1Day"));
    assert_eq!(param(&sent[0], "feed"), Some("iex"));
    assert_eq!(param(&sent[0], "limit"), Some("10000"));
    assert_eq!(param(&sent[0], "sort"), Some("asc"));
}

#[tokio::test]
async fn test_no_report_skips_json() {
    let dir = tempfile::tempdir().unwrap();
    let args = fetch_args(dir.path(), "1d", &["--format", "csv", "--no-report"]);
    let plan = args.plan().unwrap();

    let transport = ScriptedTransport::new([ok_page(daily_page(), None)]);
    let clock = manual_clock();
    let outcome = args.run(&client(&transport, &clock), &plan).await.unwrap();

    assert!(outcome.report_path.is_none());
    assert!(!dir.path().join("validation_report.json").exists());
}

#[tokio::test]
async fn test_validation_errors_still_export() {
    let dir = tempfile::tempdir().unwrap();
    let args = fetch_args(dir.path(), "1d", &["--format", "csv"]);
    let plan = args.plan().unwrap();

    let broken = json!({
        "AAPL": [
            {"t": "2024-01-02T05:00:00Z", "o": 10.0, "h": 9.0, "l": 8.0, "c": 9.5, "v": 100},
            {"t": "2024-01-02T05:00:00Z", "o": 10.0, "h": 11.0, "l": 9.0, "c": 10.5, "v": 100},
        ]
    });
    let transport = ScriptedTransport::new([ok_page(broken, None)]);
    let clock = manual_clock();
    let outcome = args.run(&client(&transport, &clock), &plan).await.unwrap();

    assert!(!outcome.ok);
    assert_eq!(outcome.report.issues.duplicates.len(), 1);
    assert_eq!(outcome.report.issues.ohlc_violations.count, 1);
    assert!(outcome.output_path.exists());
}

#[tokio::test]
async fn test_provider_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let args = fetch_args(&out, "1d", &[]);
    let plan = args.plan().unwrap();

    let transport = ScriptedTransport::new([ohlcv_hub::fetcher::HttpResponse::new(403, "forbidden")]);
    let clock = manual_clock();
    let err = args.run(&client(&transport, &clock), &plan).await.unwrap_err();

    assert_eq!(err.fetcher_error().and_then(|e| e.status()), Some(403));
    assert!(!out.exists());
}

#[tokio::test]
async fn test_weekly_dataset_resamples_daily_bars() {
    let transport = ScriptedTransport::new([ok_page(
        json!({
            "SPY": [
                bar("2024-01-02T05:00:00Z", 470.0),
                bar("2024-01-03T05:00:00Z", 468.0),
                bar("2024-01-05T05:00:00Z", 467.0),
                bar("2024-01-08T05:00:00Z", 474.0),
            ]
        }),
        None,
    )]);
    let clock = manual_clock();
    let request = DatasetRequest {
        symbols: vec!["SPY".to_string()],
        start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end: NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
        adjustment: Adjustment::All,
        feed: Some(Feed::Sip),
    };

    let built = dataset::build_dataset(&client(&transport, &clock), &request, Timeframe::Weekly)
        .await
        .unwrap();

    assert!(built.ok);
    assert_eq!(built.rows.len(), 2);
    let first = &built.rows[0];
    assert_eq!(first.timeframe, "1w");
    assert_eq!(first.ts, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    assert_eq!(first.open, 469.0);
    assert_eq!(first.close, 467.0);
    assert_eq!(first.high, 472.0);
    assert_eq!(first.low, 465.0);
    assert_eq!(first.volume, 3_000_000);
    assert_eq!(first.adjustment, "all");
    assert_eq!(built.rows[1].ts, Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap());
    assert_eq!(built.report.missing_days_total(), 0);

    assert_eq!(param(&transport.requests()[0], "timeframe"), Some("1Day"));
    assert_eq!(param(&transport.requests()[0], "feed"), Some("sip"));
}

#[tokio::test]
async fn test_weekly_fetch_exports_parquet() {
    let dir = tempfile::tempdir().unwrap();
    let args = fetch_args(dir.path(), "1w", &[]);
    let plan = args.plan().unwrap();

    let transport = ScriptedTransport::new([ok_page(daily_page(), None)]);
    let clock = manual_clock();
    let outcome = args.run(&client(&transport, &clock), &plan).await.unwrap();

    assert_eq!(
        outcome.output_path,
        dir.path().join("ohlcv_1w_20240102_20240105.parquet")
    );
    assert!(outcome.output_path.exists());
    assert_eq!(outcome.report.summary.bars_count, 1);
}
