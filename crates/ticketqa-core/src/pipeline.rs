use polars::prelude::DataFrame;
use serde::Serialize;
use ticketqa_parser::{load_raw, parse_timestamps};
use tracing::info;

use crate::config::PipelineConfig;
use crate::derivation::derive_kpi_columns;
use crate::error::Result;
use crate::qa::{run_qa_checks, KpiSnapshot};
use crate::writer::{write_processed, WriteSummary};

/// Outcome of a successful end-to-end run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub input_rows: usize,
    pub snapshot: KpiSnapshot,
    pub output: WriteSummary,
}

/// Parses, derives and validates an already loaded frame.
pub fn process_frame(raw: &DataFrame, config: &PipelineConfig) -> Result<(DataFrame, KpiSnapshot)> {
    let parsed = parse_timestamps(raw, &config.columns.time_columns())?;
    let derived = derive_kpi_columns(&parsed, config)?;
    let snapshot = run_qa_checks(&derived, config)?;
    Ok((derived, snapshot))
}

/// Loads and validates the raw export without writing anything.
pub fn check_only(config: &PipelineConfig) -> Result<KpiSnapshot> {
    let raw = load_raw(&config.raw_path)?;
    let (_, snapshot) = process_frame(&raw, config)?;
    info!("Check completed successfully; no output written");
    Ok(snapshot)
}

pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineReport> {
    let raw = load_raw(&config.raw_path)?;
    let input_rows = raw.height();

    let (processed, snapshot) = process_frame(&raw, config)?;
    let output = write_processed(
        &processed,
        &config.processed_path,
        &config.output_datetime_format,
    )?;

    info!(rows = input_rows, "Pipeline completed successfully");
    Ok(PipelineReport {
        input_rows,
        snapshot,
        output,
    })
}
