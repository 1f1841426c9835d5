//! Figures the downstream warehouse reconciliation suite recomputes in SQL
//! and compares against the processed file.

use std::path::Path;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use ticketqa_parser::load_raw;

use crate::error::{PipelineError, Result};
use crate::qa::median;
use crate::schema::{
    require_column, RESOLUTION_MINUTES, RESOLUTION_SLA_FLAG_BOOL, RESPONSE_SLA_FLAG_BOOL,
    SATISFACTION_SCORE,
};

/// The score that counts as a satisfied ticket.
const SATISFIED_SCORE: i64 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationAggregates {
    pub row_count: usize,
    pub response_sla_compliance_pct: Option<f64>,
    pub resolution_sla_compliance_pct: Option<f64>,
    pub median_resolution_minutes: Option<f64>,
    pub satisfaction_rate_pct: Option<f64>,
}

/// Reads a processed file back from disk and computes its aggregates.
pub fn summarize(path: &Path) -> Result<ReconciliationAggregates> {
    let df = load_raw(path)?;
    ReconciliationAggregates::from_processed(&df)
}

impl ReconciliationAggregates {
    /// Works on a frame as loaded from the processed CSV, where every
    /// column is still text.
    pub fn from_processed(df: &DataFrame) -> Result<Self> {
        let response = parse_column(df, RESPONSE_SLA_FLAG_BOOL, parse_bool)?;
        let resolution = parse_column(df, RESOLUTION_SLA_FLAG_BOOL, parse_bool)?;
        let minutes = parse_column(df, RESOLUTION_MINUTES, |v| v.trim().parse::<f64>().ok())?;
        let scores = parse_column(df, SATISFACTION_SCORE, |v| v.trim().parse::<i64>().ok())?;

        Ok(Self {
            row_count: df.height(),
            response_sla_compliance_pct: percentage(&response, |flag| *flag),
            resolution_sla_compliance_pct: percentage(&resolution, |flag| *flag),
            median_resolution_minutes: median(minutes),
            satisfaction_rate_pct: percentage(&scores, |score| *score == SATISFIED_SCORE),
        })
    }
}

fn parse_column<T>(
    df: &DataFrame,
    name: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<T>> {
    let text = require_column(df, name)?.cast(&DataType::String)?;
    let text = text.str()?;

    let mut values = Vec::with_capacity(text.len());
    for (idx, value) in text.into_iter().enumerate() {
        let Some(raw) = value else {
            continue;
        };
        let parsed = parse(raw).ok_or_else(|| PipelineError::Parse {
            column: name.to_string(),
            row: idx + 1,
            value: raw.to_string(),
        })?;
        values.push(parsed);
    }
    Ok(values)
}

fn parse_bool(value: &str) -> Option<bool> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn percentage<T>(values: &[T], hit: impl Fn(&T) -> bool) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let hits = values.iter().filter(|v| hit(v)).count();
    Some(hits as f64 / values.len() as f64 * 100.0)
}
