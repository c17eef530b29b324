//! Shared fixtures: scripted transport, recording observer, response builders

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ohlcv_hub::fetcher::observer::{FetchObserver, PageEvent, RetryEvent, ThrottleEvent};
use ohlcv_hub::fetcher::{AlpacaClient, HttpResponse, ManualClock, Transport, TransportError};
use reqwest::header::HeaderMap;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub type Params = Vec<(&'static str, String)>;

/// Transport that replays canned responses and records every request
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<Params>>,
    urls: Mutex<Vec<String>>,
    headers: Mutex<Vec<HeaderMap>>,
}

impl ScriptedTransport {
    pub fn new(responses: impl IntoIterator<Item = HttpResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            urls: Mutex::new(Vec::new()),
            headers: Mutex::new(Vec::new()),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::new(Vec::<HttpResponse>::new())
    }

    pub fn requests(&self) -> Vec<Params> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    pub fn sent_headers(&self) -> Vec<HeaderMap> {
        self.headers.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(
        &self,
        url: &str,
        params: &[(&'static str, String)],
        headers: &HeaderMap,
    ) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(params.to_vec());
        self.urls.lock().unwrap().push(url.to_string());
        self.headers.lock().unwrap().push(headers.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::Request("script exhausted".to_string()))
    }
}

/// Observer that keeps every event
#[derive(Default)]
pub struct RecordingObserver {
    pub throttles: Mutex<Vec<ThrottleEvent>>,
    pub retries: Mutex<Vec<RetryEvent>>,
    pub pages: Mutex<Vec<PageEvent>>,
}

impl FetchObserver for RecordingObserver {
    fn on_throttle(&self, event: &ThrottleEvent) {
        self.throttles.lock().unwrap().push(event.clone());
    }

    fn on_retry(&self, event: &RetryEvent) {
        self.retries.lock().unwrap().push(event.clone());
    }

    fn on_page(&self, event: &PageEvent) {
        self.pages.lock().unwrap().push(event.clone());
    }
}

pub fn param<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, value)| value.as_str())
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap()
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(start_time()))
}

/// Client wired to the scripted transport and the manual clock
pub fn client(transport: &Arc<ScriptedTransport>, clock: &Arc<ManualClock>) -> AlpacaClient {
    AlpacaClient::new("http://alpaca.test/", "PKTESTKEY0001", "test-secret")
        .with_transport(transport.clone())
        .with_clock(clock.clone())
}

/// Wire bar object; daily bars are stamped at midnight New York time
pub fn bar(ts: &str, close: f64) -> Value {
    json!({
        "t": ts,
        "o": close - 1.0,
        "h": close + 2.0,
        "l": close - 2.0,
        "c": close,
        "v": 1_000_000,
        "n": 5_000,
        "vw": close - 0.5
    })
}

pub fn page_body(bars: Value, next_page_token: Option<&str>) -> String {
    json!({
        "bars": bars,
        "next_page_token": next_page_token,
        "currency": "USD"
    })
    .to_string()
}

pub fn ok_page(bars: Value, next_page_token: Option<&str>) -> HttpResponse {
    HttpResponse::new(200, page_body(bars, next_page_token))
}

pub fn rate_limited(retry_after: &str) -> HttpResponse {
    HttpResponse::new(429, r#"{"message":"too many requests"}"#).with_header("Retry-After", retry_after)
}
