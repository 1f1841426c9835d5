// crates/ticketqa-core/src/error.rs

use std::path::PathBuf;

use thiserror::Error;
use ticketqa_parser::{format_counts, ParserError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Raw file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Parse error: column '{column}' row {row} value '{value}'")]
    Parse {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Timestamp parsing introduced missing values: {}", format_counts(.missing))]
    DataIntegrity { missing: Vec<(String, usize)> },

    #[error("Satisfaction mapping produced missing values. Unexpected '{column}' categories: {}", format_counts(.values))]
    UnmappedCategory {
        column: String,
        values: Vec<(String, usize)>,
    },

    #[error("Duplicate Ticket ID detected: {duplicates} (null ids: {nulls})")]
    Uniqueness { duplicates: usize, nulls: usize },

    #[error("Negative duration(s) found. first_response_minutes={first_response}, resolution_minutes={resolution}")]
    Integrity {
        first_response: usize,
        resolution: usize,
    },

    #[error("Chronological integrity failed: first response before created={created_to_first_response}, resolution before first response={first_response_to_resolution}, close before resolution={resolution_to_close}")]
    Chronology {
        created_to_first_response: usize,
        first_response_to_resolution: usize,
        resolution_to_close: usize,
    },

    #[error("SLA reconciliation failed: response SLA mismatches={response}, resolution SLA mismatches={resolution}")]
    Reconciliation { response: usize, resolution: usize },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Config file could not be parsed: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<ParserError> for PipelineError {
    fn from(err: ParserError) -> Self {
        match err {
            ParserError::NotFound { path } => PipelineError::NotFound { path },
            ParserError::Io { source, .. } => PipelineError::Io(source),
            ParserError::Csv(source) => PipelineError::Csv(source),
            ParserError::MissingColumn { column } => {
                PipelineError::Schema(format!("missing required column '{column}'"))
            }
            ParserError::DuplicateColumn { column } => {
                PipelineError::Schema(format!("duplicate column '{column}'"))
            }
            ParserError::InvalidTimestamp { column, row, value } => {
                PipelineError::Parse { column, row, value }
            }
            ParserError::MissingTimestamps { missing } => PipelineError::DataIntegrity { missing },
            ParserError::Polars(source) => PipelineError::Polars(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
