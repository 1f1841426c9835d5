use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("raw file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("duplicate column '{column}' after trimming header names")]
    DuplicateColumn { column: String },

    #[error("column '{column}' data row {row} has unparseable timestamp '{value}'")]
    InvalidTimestamp {
        column: String,
        row: usize,
        value: String,
    },

    #[error("timestamp parsing introduced missing values: {}", format_counts(.missing))]
    MissingTimestamps { missing: Vec<(String, usize)> },

    #[error("Polars operation failed: {0}")]
    Polars(#[from] PolarsError),
}

/// Renders `name=count` pairs as a single comma separated list.
pub fn format_counts(counts: &[(String, usize)]) -> String {
    counts
        .iter()
        .map(|(name, count)| format!("{name}={count}"))
        .collect::<Vec<_>>()
        .join(", ")
}
