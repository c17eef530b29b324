//! Dataset sanity checks and the validation report
//!
//! Checks: duplicate `(symbol, ts)` keys, non-increasing timestamps per
//! symbol, OHLC consistency and negative volume. Daily datasets also list
//! NYSE sessions with no bar per symbol. Missing sessions are reported but do
//! not make a dataset invalid.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::America::New_York;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::dataset::calendar::nyse_sessions;
use crate::dataset::BarRow;

/// Maximum samples kept per violation list
pub const MAX_SAMPLES: usize = 20;

/// Full validation report (written as `validation_report.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Counts and requested range
    pub summary: ReportSummary,
    /// Data quality issues
    pub issues: ReportIssues,
    /// Trading sessions without a bar
    pub missing_days: MissingDays,
}

/// Dataset size and requested range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Distinct symbols
    pub symbols_count: usize,
    /// Total rows
    pub bars_count: usize,
    /// Requested range
    pub date_range: DateRange,
}

/// Requested date range as `YYYY-MM-DD`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    /// Inclusive start
    pub start: String,
    /// Inclusive end
    pub end: String,
}

/// All issue lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportIssues {
    /// Keys appearing more than once
    pub duplicates: Vec<DuplicateIssue>,
    /// First ordering violation per symbol
    pub non_monotonic: Vec<NonMonotonicIssue>,
    /// OHLC relationship violations
    pub ohlc_violations: Violations<OhlcViolation>,
    /// Negative volume rows
    pub volume_violations: Violations<VolumeViolation>,
}

/// Duplicate `(symbol, ts)` key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateIssue {
    /// Symbol
    pub symbol: String,
    /// Timestamp
    pub ts: String,
    /// Number of rows sharing the key
    pub count: usize,
}

/// Timestamp that does not increase over its predecessor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonMonotonicIssue {
    /// Symbol
    pub symbol: String,
    /// Preceding timestamp
    pub example_ts_prev: String,
    /// Offending timestamp
    pub example_ts_next: String,
}

/// Total count plus capped samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violations<T> {
    /// All violations found
    pub count: usize,
    /// At most [`MAX_SAMPLES`] examples
    pub samples: Vec<T>,
}

impl<T> Default for Violations<T> {
    fn default() -> Self {
        Self {
            count: 0,
            samples: Vec::new(),
        }
    }
}

impl<T> Violations<T> {
    fn from_all(mut all: Vec<T>) -> Self {
        let count = all.len();
        all.truncate(MAX_SAMPLES);
        Self {
            count,
            samples: all,
        }
    }
}

/// Row whose OHLC values are inconsistent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcViolation {
    /// Symbol
    pub symbol: String,
    /// Timestamp
    pub ts: String,
    /// Open
    pub open: f64,
    /// High
    pub high: f64,
    /// Low
    pub low: f64,
    /// Close
    pub close: f64,
    /// Which rule failed
    pub issue: String,
}

/// Row with negative volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeViolation {
    /// Symbol
    pub symbol: String,
    /// Timestamp
    pub ts: String,
    /// Volume
    pub volume: i64,
}

/// Missing sessions keyed by symbol, plus totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingDays {
    /// Symbols with at least one missing session
    #[serde(flatten)]
    pub per_symbol: BTreeMap<String, Vec<String>>,
    /// Aggregate count
    pub totals: MissingTotals,
}

/// Missing session totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingTotals {
    /// Sum of missing sessions over all symbols
    pub missing_days_count_total: usize,
}

impl ValidationReport {
    /// Whether any blocking issue was found (missing sessions excluded)
    pub fn has_errors(&self) -> bool {
        !self.issues.duplicates.is_empty()
            || !self.issues.non_monotonic.is_empty()
            || self.issues.ohlc_violations.count > 0
            || self.issues.volume_violations.count > 0
    }

    /// Total missing sessions
    pub fn missing_days_total(&self) -> usize {
        self.missing_days.totals.missing_days_count_total
    }
}

/// Validate a daily dataset, including NYSE missing-session detection
///
/// # Returns
/// `(ok, report)` where `ok` is false when a blocking issue was found
pub fn validate_daily_bars(
    rows: &[BarRow],
    start: NaiveDate,
    end: NaiveDate,
) -> (bool, ValidationReport) {
    let mut report = check_issues(rows, start, end);
    if !rows.is_empty() {
        report.missing_days = missing_sessions(rows, start, end);
    }
    (!report.has_errors(), report)
}

/// Validate a weekly dataset; missing sessions are not computed
pub fn validate_weekly_bars(
    rows: &[BarRow],
    start: NaiveDate,
    end: NaiveDate,
) -> (bool, ValidationReport) {
    let report = check_issues(rows, start, end);
    (!report.has_errors(), report)
}

fn check_issues(rows: &[BarRow], start: NaiveDate, end: NaiveDate) -> ValidationReport {
    let symbols: BTreeSet<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();

    ValidationReport {
        summary: ReportSummary {
            symbols_count: symbols.len(),
            bars_count: rows.len(),
            date_range: DateRange {
                start: start.format("%Y-%m-%d").to_string(),
                end: end.format("%Y-%m-%d").to_string(),
            },
        },
        issues: ReportIssues {
            duplicates: find_duplicates(rows),
            non_monotonic: find_non_monotonic(rows),
            ohlc_violations: Violations::from_all(rows.iter().filter_map(ohlc_violation).collect()),
            volume_violations: Violations::from_all(
                rows.iter()
                    .filter(|r| r.volume < 0)
                    .map(|r| VolumeViolation {
                        symbol: r.symbol.clone(),
                        ts: iso(r.ts),
                        volume: r.volume,
                    })
                    .collect(),
            ),
        },
        missing_days: MissingDays::default(),
    }
}

fn find_duplicates(rows: &[BarRow]) -> Vec<DuplicateIssue> {
    let mut counts: BTreeMap<(&str, DateTime<Utc>), usize> = BTreeMap::new();
    for row in rows {
        *counts.entry((row.symbol.as_str(), row.ts)).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|((symbol, ts), count)| DuplicateIssue {
            symbol: symbol.to_string(),
            ts: iso(ts),
            count,
        })
        .collect()
}

fn find_non_monotonic(rows: &[BarRow]) -> Vec<NonMonotonicIssue> {
    let mut last_seen: HashMap<&str, DateTime<Utc>> = HashMap::new();
    let mut flagged: BTreeMap<&str, NonMonotonicIssue> = BTreeMap::new();

    for row in rows {
        let symbol = row.symbol.as_str();
        if let Some(prev) = last_seen.insert(symbol, row.ts) {
            if row.ts <= prev && !flagged.contains_key(symbol) {
                flagged.insert(
                    symbol,
                    NonMonotonicIssue {
                        symbol: symbol.to_string(),
                        example_ts_prev: iso(prev),
                        example_ts_next: iso(row.ts),
                    },
                );
            }
        }
    }
    flagged.into_values().collect()
}

fn ohlc_violation(row: &BarRow) -> Option<OhlcViolation> {
    let issue = if row.high < row.open.max(row.close) {
        "high < max(open, close)"
    } else if row.low > row.open.min(row.close) {
        "low > min(open, close)"
    } else if row.high < row.low {
        "high < low"
    } else {
        return None;
    };
    Some(OhlcViolation {
        symbol: row.symbol.clone(),
        ts: iso(row.ts),
        open: row.open,
        high: row.high,
        low: row.low,
        close: row.close,
        issue: issue.to_string(),
    })
}

fn missing_sessions(rows: &[BarRow], start: NaiveDate, end: NaiveDate) -> MissingDays {
    let expected = nyse_sessions(start, end);

    let mut present: BTreeMap<&str, BTreeSet<NaiveDate>> = BTreeMap::new();
    for row in rows {
        present
            .entry(row.symbol.as_str())
            .or_default()
            .insert(row.ts.with_timezone(&New_York).date_naive());
    }

    let mut per_symbol = BTreeMap::new();
    for (symbol, dates) in present {
        let missing: Vec<String> = expected
            .iter()
            .filter(|d| !dates.contains(d))
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect();
        if !missing.is_empty() {
            per_symbol.insert(symbol.to_string(), missing);
        }
    }

    let total = per_symbol.values().map(Vec::len).sum();
    MissingDays {
        per_symbol,
        totals: MissingTotals {
            missing_days_count_total: total,
        },
    }
}

fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}
