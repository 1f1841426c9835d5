use std::collections::BTreeMap;

use polars::prelude::*;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::schema::{
    require_column, BACKLOG_FLAG, FIRST_RESPONSE_MINUTES, RESOLUTION_MINUTES,
    RESOLUTION_SLA_FLAG_BOOL, RESOLUTION_SLA_MET_RECALC, RESPONSE_SLA_FLAG_BOOL,
    RESPONSE_SLA_MET_RECALC, SATISFACTION_SCORE, SLA_MET_LABEL,
};

const MICROS_PER_MINUTE: f64 = 60.0 * 1_000_000.0;

/// Appends the KPI columns to a frame whose time columns are already parsed.
///
/// Fails without returning any frame when a survey result has no score.
pub fn derive_kpi_columns(df: &DataFrame, config: &PipelineConfig) -> Result<DataFrame> {
    info!("Creating derived KPI-ready columns");
    let len = df.height();
    let cols = &config.columns;

    let created = require_column(df, &cols.created_time)?.datetime()?;
    let first_response = require_column(df, &cols.first_response_time)?.datetime()?;
    let resolution = require_column(df, &cols.resolution_time)?.datetime()?;
    let expected_response = require_column(df, &cols.expected_sla_first_response)?.datetime()?;
    let expected_resolve = require_column(df, &cols.expected_sla_resolve)?.datetime()?;

    let response_label = require_column(df, &cols.sla_first_response_label)?.cast(&DataType::String)?;
    let response_label = response_label.str()?;
    let resolution_label = require_column(df, &cols.sla_resolution_label)?.cast(&DataType::String)?;
    let resolution_label = resolution_label.str()?;
    let status = require_column(df, &cols.status)?.cast(&DataType::String)?;
    let status = status.str()?;
    let survey = require_column(df, &cols.survey_result)?.cast(&DataType::String)?;
    let survey = survey.str()?;

    let mut first_response_minutes = Vec::with_capacity(len);
    let mut resolution_minutes = Vec::with_capacity(len);
    let mut response_recalc = Vec::with_capacity(len);
    let mut resolution_recalc = Vec::with_capacity(len);
    let mut response_flag = Vec::with_capacity(len);
    let mut resolution_flag = Vec::with_capacity(len);
    let mut backlog = Vec::with_capacity(len);
    let mut satisfaction: Vec<Option<i64>> = Vec::with_capacity(len);
    let mut unmapped: BTreeMap<String, usize> = BTreeMap::new();

    for idx in 0..len {
        let created_at = created.get(idx);
        let first_response_at = first_response.get(idx);
        let resolved_at = resolution.get(idx);

        first_response_minutes.push(elapsed_minutes(
            created_at,
            first_response_at,
            &cols.first_response_time,
            idx,
        )?);
        resolution_minutes.push(elapsed_minutes(
            created_at,
            resolved_at,
            &cols.resolution_time,
            idx,
        )?);
        response_recalc.push(met_deadline(first_response_at, expected_response.get(idx)));
        resolution_recalc.push(met_deadline(resolved_at, expected_resolve.get(idx)));
        response_flag.push(Some(is_met_label(response_label.get(idx))));
        resolution_flag.push(Some(is_met_label(resolution_label.get(idx))));
        backlog.push(Some(
            status
                .get(idx)
                .is_some_and(|value| config.is_backlog_status(value.trim())),
        ));

        let category = survey.get(idx).unwrap_or_default();
        match config.satisfaction_map.get(category) {
            Some(score) => satisfaction.push(Some(*score)),
            None => {
                *unmapped.entry(category.to_string()).or_default() += 1;
                satisfaction.push(None);
            }
        }
    }

    if !unmapped.is_empty() {
        let mut values: Vec<(String, usize)> = unmapped.into_iter().collect();
        values.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        return Err(PipelineError::UnmappedCategory {
            column: cols.survey_result.clone(),
            values,
        });
    }

    let mut output = df.clone();
    for series in [
        Series::new(FIRST_RESPONSE_MINUTES.into(), first_response_minutes),
        Series::new(RESOLUTION_MINUTES.into(), resolution_minutes),
        Series::new(RESPONSE_SLA_MET_RECALC.into(), response_recalc),
        Series::new(RESOLUTION_SLA_MET_RECALC.into(), resolution_recalc),
        Series::new(RESPONSE_SLA_FLAG_BOOL.into(), response_flag),
        Series::new(RESOLUTION_SLA_FLAG_BOOL.into(), resolution_flag),
        Series::new(BACKLOG_FLAG.into(), backlog),
        Series::new(SATISFACTION_SCORE.into(), satisfaction),
    ] {
        output.with_column(series)?;
    }

    info!("Derived columns created successfully");
    Ok(output)
}

/// Minutes from `start` to `end`; a span too wide for i64 micros is an error on `end_column`.
fn elapsed_minutes(
    start: Option<i64>,
    end: Option<i64>,
    end_column: &str,
    idx: usize,
) -> Result<Option<f64>> {
    let (Some(start), Some(end)) = (start, end) else {
        return Ok(None);
    };
    let micros = end.checked_sub(start).ok_or_else(|| PipelineError::Parse {
        column: end_column.to_string(),
        row: idx + 1,
        value: format!("{end}us is out of range from created {start}us"),
    })?;
    Ok(Some(micros as f64 / MICROS_PER_MINUTE))
}

fn met_deadline(actual: Option<i64>, deadline: Option<i64>) -> Option<bool> {
    match (actual, deadline) {
        (Some(actual), Some(deadline)) => Some(actual <= deadline),
        _ => None,
    }
}

fn is_met_label(label: Option<&str>) -> bool {
    label.is_some_and(|value| value.trim() == SLA_MET_LABEL)
}
