//! Parquet dataset writer (polars)

use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::debug;

use super::{OutputError, OutputResult};
use crate::dataset::BarRow;

/// Build a DataFrame in dataset column order; `ts` is a UTC millisecond datetime
pub fn rows_to_dataframe(rows: &[BarRow]) -> OutputResult<DataFrame> {
    let strings = |f: fn(&BarRow) -> &str| -> Vec<String> {
        rows.iter().map(|r| f(r).to_string()).collect()
    };
    let floats = |f: fn(&BarRow) -> f64| -> Vec<f64> { rows.iter().map(f).collect() };

    let ts: Vec<i64> = rows.iter().map(|r| r.ts.timestamp_millis()).collect();
    let volumes: Vec<i64> = rows.iter().map(|r| r.volume).collect();

    DataFrame::new(vec![
        Column::new("symbol".into(), strings(|r| &r.symbol)),
        Column::new("timeframe".into(), strings(|r| &r.timeframe)),
        Column::new("ts".into(), ts)
            .cast(&DataType::Datetime(
                TimeUnit::Milliseconds,
                Some("UTC".into()),
            ))
            .map_err(|e| OutputError::ParquetError(format!("ts cast: {e}")))?,
        Column::new("open".into(), floats(|r| r.open)),
        Column::new("high".into(), floats(|r| r.high)),
        Column::new("low".into(), floats(|r| r.low)),
        Column::new("close".into(), floats(|r| r.close)),
        Column::new("volume".into(), volumes),
        Column::new("source".into(), strings(|r| &r.source)),
        Column::new("currency".into(), strings(|r| &r.currency)),
        Column::new("adjustment".into(), strings(|r| &r.adjustment)),
    ])
    .map_err(|e| OutputError::ParquetError(format!("dataframe creation: {e}")))
}

/// Write rows to `path` as Parquet
pub fn write_rows(rows: &[BarRow], path: &Path) -> OutputResult<()> {
    let mut df = rows_to_dataframe(rows)?;
    let file =
        File::create(path).map_err(|e| OutputError::IoError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .map_err(|e| OutputError::ParquetError(format!("write parquet: {e}")))?;

    debug!(path = %path.display(), rows = rows.len(), "Parquet written");
    Ok(())
}
