//! Daily to weekly resampling
//!
//! Weeks run from Monday 00:00 UTC (inclusive) to the next Monday
//! (exclusive) and are labelled with their Monday.

use chrono::{DateTime, Datelike, Duration, Utc};
use std::collections::BTreeMap;

use crate::dataset::BarRow;
use crate::Timeframe;

/// Aggregate daily rows into weekly rows
///
/// open = first, high = max, low = min, close = last, volume = sum. Weeks
/// without bars are not emitted. Source, currency and adjustment come from
/// the symbol's first daily row. Output is sorted by `(symbol, ts)`.
pub fn to_weekly(daily: &[BarRow]) -> Vec<BarRow> {
    let mut by_symbol: BTreeMap<&str, Vec<&BarRow>> = BTreeMap::new();
    for row in daily {
        by_symbol.entry(row.symbol.as_str()).or_default().push(row);
    }

    let mut weekly = Vec::new();
    for (symbol, mut rows) in by_symbol {
        rows.sort_by_key(|r| r.ts);
        let Some(first) = rows.first() else {
            continue;
        };
        let (source, currency, adjustment) = (&first.source, &first.currency, &first.adjustment);

        let mut weeks: BTreeMap<DateTime<Utc>, BarRow> = BTreeMap::new();
        for row in &rows {
            weeks
                .entry(week_start(row.ts))
                .and_modify(|week| {
                    week.high = week.high.max(row.high);
                    week.low = week.low.min(row.low);
                    week.close = row.close;
                    week.volume += row.volume;
                })
                .or_insert_with(|| BarRow {
                    symbol: symbol.to_string(),
                    timeframe: Timeframe::Weekly.as_str().to_string(),
                    ts: week_start(row.ts),
                    open: row.open,
                    high: row.high,
                    low: row.low,
                    close: row.close,
                    volume: row.volume,
                    source: source.clone(),
                    currency: currency.clone(),
                    adjustment: adjustment.clone(),
                });
        }
        weekly.extend(weeks.into_values());
    }

    weekly
}

/// Monday 00:00 UTC of the week containing `ts`
pub fn week_start(ts: DateTime<Utc>) -> DateTime<Utc> {
    let date = ts.date_naive();
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    monday.and_time(chrono::NaiveTime::MIN).and_utc()
}
