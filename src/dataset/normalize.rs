//! Flatten a fetched aggregate into dataset rows

use crate::dataset::BarRow;
use crate::fetcher::BarsAggregate;

/// Currency assumed when the provider does not report one
pub const DEFAULT_CURRENCY: &str = "USD";

/// Convert an aggregate to rows sorted by `(symbol, ts)`
///
/// # Arguments
/// * `aggregate` - Bars per symbol as fetched
/// * `timeframe` - Dataset timeframe label (e.g., "1d")
/// * `source` - Provider label (e.g., "alpaca")
/// * `adjustment` - Adjustment the bars were fetched with
pub fn bars_to_rows(
    aggregate: &BarsAggregate,
    timeframe: &str,
    source: &str,
    adjustment: &str,
) -> Vec<BarRow> {
    let currency = aggregate.currency.as_deref().unwrap_or(DEFAULT_CURRENCY);

    let mut rows: Vec<BarRow> = aggregate
        .bars
        .iter()
        .flat_map(|(symbol, bars)| {
            bars.iter().map(move |bar| BarRow {
                symbol: symbol.clone(),
                timeframe: timeframe.to_string(),
                ts: bar.timestamp,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                source: source.to_string(),
                currency: currency.to_string(),
                adjustment: adjustment.to_string(),
            })
        })
        .collect();

    // stable: duplicates keep provider order
    rows.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.ts.cmp(&b.ts)));
    rows
}
