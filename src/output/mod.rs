//! Dataset export writers

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::dataset::BarRow;

pub mod csv;
pub mod parquet;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Parquet write error
    #[error("Parquet error: {0}")]
    ParquetError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Export file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Apache Parquet
    #[default]
    Parquet,
    /// Comma separated values
    Csv,
}

impl OutputFormat {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parquet" => Ok(OutputFormat::Parquet),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Invalid format: {s}. Valid options: parquet, csv")),
        }
    }
}

/// Export rows to `<out_dir>/<filename>.<ext>`, creating the directory
///
/// # Returns
/// Path of the written file
///
/// # Errors
/// Returns an error if the directory or file cannot be written
pub fn export_rows(
    rows: &[BarRow],
    out_dir: &Path,
    format: OutputFormat,
    filename: &str,
) -> OutputResult<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .map_err(|e| OutputError::IoError(format!("Failed to create directory: {e}")))?;

    let path = out_dir.join(format!("{filename}.{}", format.extension()));
    match format {
        OutputFormat::Parquet => parquet::write_rows(rows, &path)?,
        OutputFormat::Csv => csv::write_rows(rows, &path)?,
    }

    info!(path = %path.display(), rows = rows.len(), format = %format, "Dataset exported");
    Ok(path)
}

/// Write any serializable value as pretty JSON
///
/// # Errors
/// Returns an error on IO or serialization failure
pub fn write_json<T: serde::Serialize>(value: &T, path: &Path) -> OutputResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| OutputError::IoError(format!("Failed to serialize JSON: {e}")))?;
    std::fs::write(path, json)
        .map_err(|e| OutputError::IoError(format!("Failed to write {}: {e}", path.display())))
}
