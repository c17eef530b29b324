//! CSV dataset writer

use chrono::SecondsFormat;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

use super::{OutputError, OutputResult};
use crate::dataset::BarRow;

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// Column order of the dataset schema
pub const COLUMNS: [&str; 11] = [
    "symbol",
    "timeframe",
    "ts",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "source",
    "currency",
    "adjustment",
];

/// CSV record with an RFC-3339 timestamp
#[derive(Debug, Serialize)]
struct RowRecord<'a> {
    symbol: &'a str,
    timeframe: &'a str,
    ts: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
    source: &'a str,
    currency: &'a str,
    adjustment: &'a str,
}

impl<'a> From<&'a BarRow> for RowRecord<'a> {
    fn from(row: &'a BarRow) -> Self {
        Self {
            symbol: &row.symbol,
            timeframe: &row.timeframe,
            ts: row.ts.to_rfc3339_opts(SecondsFormat::Secs, true),
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
            source: &row.source,
            currency: &row.currency,
            adjustment: &row.adjustment,
        }
    }
}

/// Write rows to `path`; the header is written even when `rows` is empty
pub fn write_rows(rows: &[BarRow], path: &Path) -> OutputResult<()> {
    let file = File::create(path)
        .map_err(|e| OutputError::IoError(format!("Failed to create file: {e}")))?;
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));

    writer
        .write_record(COLUMNS)
        .map_err(|e| OutputError::CsvError(format!("Failed to write header: {e}")))?;

    for row in rows {
        writer
            .serialize(RowRecord::from(row))
            .map_err(|e| OutputError::CsvError(format!("Failed to write row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| OutputError::IoError(format!("Failed to flush: {e}")))?;

    debug!(path = %path.display(), rows = rows.len(), "CSV written");
    Ok(())
}
