use std::collections::HashSet;

use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::schema::{
    require_column, BACKLOG_FLAG, FIRST_RESPONSE_MINUTES, RESOLUTION_MINUTES,
    RESOLUTION_SLA_FLAG_BOOL, RESOLUTION_SLA_MET_RECALC, RESPONSE_SLA_FLAG_BOOL,
    RESPONSE_SLA_MET_RECALC, SATISFACTION_SCORE,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UniquenessReport {
    /// Rows repeating an id already seen earlier in the frame.
    pub duplicates: usize,
    pub nulls: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DurationViolations {
    pub first_response: usize,
    pub resolution: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChronologyViolations {
    pub created_to_first_response: usize,
    pub first_response_to_resolution: usize,
    pub resolution_to_close: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationMismatches {
    pub response: usize,
    pub resolution: usize,
}

/// Summary figures logged once every check has passed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiSnapshot {
    pub total_tickets: usize,
    pub median_first_response_minutes: Option<f64>,
    pub median_resolution_minutes: Option<f64>,
    pub backlog_tickets: usize,
    pub mean_satisfaction_score: Option<f64>,
    pub response_sla_rate: Option<f64>,
    pub resolution_sla_rate: Option<f64>,
}

/// Runs the integrity checks in order and stops at the first failure.
pub fn run_qa_checks(df: &DataFrame, config: &PipelineConfig) -> Result<KpiSnapshot> {
    info!("Running QA checks");

    let uniqueness = check_uniqueness(df, config)?;
    if uniqueness.duplicates != 0 || uniqueness.nulls != 0 {
        return Err(PipelineError::Uniqueness {
            duplicates: uniqueness.duplicates,
            nulls: uniqueness.nulls,
        });
    }
    info!("QA: Ticket ID uniqueness OK");

    let durations = check_durations(df)?;
    if durations.first_response != 0 || durations.resolution != 0 {
        return Err(PipelineError::Integrity {
            first_response: durations.first_response,
            resolution: durations.resolution,
        });
    }
    info!("QA: Duration integrity OK (no negatives)");

    let chronology = check_chronology(df, config)?;
    if chronology != ChronologyViolations::default() {
        return Err(PipelineError::Chronology {
            created_to_first_response: chronology.created_to_first_response,
            first_response_to_resolution: chronology.first_response_to_resolution,
            resolution_to_close: chronology.resolution_to_close,
        });
    }
    info!("QA: Chronological integrity OK");

    let mismatches = check_sla_reconciliation(df)?;
    if mismatches.response != 0 || mismatches.resolution != 0 {
        return Err(PipelineError::Reconciliation {
            response: mismatches.response,
            resolution: mismatches.resolution,
        });
    }
    info!("QA: SLA reconciliation OK (recalc matches provided labels)");

    let snapshot = kpi_snapshot(df)?;
    log_snapshot(&snapshot);
    info!("All QA checks passed");
    Ok(snapshot)
}

pub fn check_uniqueness(df: &DataFrame, config: &PipelineConfig) -> Result<UniquenessReport> {
    let ids = require_column(df, &config.columns.ticket_id)?.cast(&DataType::String)?;
    let ids = ids.str()?;

    let mut seen = HashSet::with_capacity(ids.len());
    let mut report = UniquenessReport::default();
    for id in ids.into_iter() {
        match id {
            Some(id) => {
                if !seen.insert(id) {
                    report.duplicates += 1;
                }
            }
            None => report.nulls += 1,
        }
    }
    Ok(report)
}

pub fn check_durations(df: &DataFrame) -> Result<DurationViolations> {
    Ok(DurationViolations {
        first_response: count_negative(require_column(df, FIRST_RESPONSE_MINUTES)?.f64()?),
        resolution: count_negative(require_column(df, RESOLUTION_MINUTES)?.f64()?),
    })
}

pub fn check_chronology(df: &DataFrame, config: &PipelineConfig) -> Result<ChronologyViolations> {
    let cols = &config.columns;
    let created = require_column(df, &cols.created_time)?.datetime()?;
    let first_response = require_column(df, &cols.first_response_time)?.datetime()?;
    let resolution = require_column(df, &cols.resolution_time)?.datetime()?;
    let close = require_column(df, &cols.close_time)?.datetime()?;

    let mut violations = ChronologyViolations::default();
    for idx in 0..df.height() {
        if is_before(first_response.get(idx), created.get(idx)) {
            violations.created_to_first_response += 1;
        }
        if is_before(resolution.get(idx), first_response.get(idx)) {
            violations.first_response_to_resolution += 1;
        }
        if is_before(close.get(idx), resolution.get(idx)) {
            violations.resolution_to_close += 1;
        }
    }
    Ok(violations)
}

pub fn check_sla_reconciliation(df: &DataFrame) -> Result<ReconciliationMismatches> {
    Ok(ReconciliationMismatches {
        response: count_mismatches(
            require_column(df, RESPONSE_SLA_MET_RECALC)?.bool()?,
            require_column(df, RESPONSE_SLA_FLAG_BOOL)?.bool()?,
        ),
        resolution: count_mismatches(
            require_column(df, RESOLUTION_SLA_MET_RECALC)?.bool()?,
            require_column(df, RESOLUTION_SLA_FLAG_BOOL)?.bool()?,
        ),
    })
}

pub fn kpi_snapshot(df: &DataFrame) -> Result<KpiSnapshot> {
    let first_response = require_column(df, FIRST_RESPONSE_MINUTES)?.f64()?;
    let resolution = require_column(df, RESOLUTION_MINUTES)?.f64()?;
    let backlog = require_column(df, BACKLOG_FLAG)?.bool()?;
    let satisfaction = require_column(df, SATISFACTION_SCORE)?.i64()?;
    let response_met = require_column(df, RESPONSE_SLA_MET_RECALC)?.bool()?;
    let resolution_met = require_column(df, RESOLUTION_SLA_MET_RECALC)?.bool()?;

    let scores: Vec<f64> = satisfaction.into_iter().flatten().map(|v| v as f64).collect();

    Ok(KpiSnapshot {
        total_tickets: df.height(),
        median_first_response_minutes: median(first_response.into_iter().flatten().collect()),
        median_resolution_minutes: median(resolution.into_iter().flatten().collect()),
        backlog_tickets: backlog.into_iter().flatten().filter(|flag| *flag).count(),
        mean_satisfaction_score: mean(&scores),
        response_sla_rate: true_rate(response_met),
        resolution_sla_rate: true_rate(resolution_met),
    })
}

fn log_snapshot(snapshot: &KpiSnapshot) {
    info!("KPI snapshot (sanity checks):");
    info!("- Tickets total: {}", snapshot.total_tickets);
    info!(
        "- First response median (min): {}",
        format_optional(snapshot.median_first_response_minutes, 2)
    );
    info!(
        "- Resolution median (min): {}",
        format_optional(snapshot.median_resolution_minutes, 2)
    );
    info!("- Open backlog tickets: {}", snapshot.backlog_tickets);
    info!(
        "- Avg satisfaction score: {}",
        format_optional(snapshot.mean_satisfaction_score, 2)
    );
    info!(
        "- Response SLA rate (recalc): {}",
        format_optional(snapshot.response_sla_rate, 4)
    );
    info!(
        "- Resolution SLA rate (recalc): {}",
        format_optional(snapshot.resolution_sla_rate, 4)
    );
}

pub(crate) fn format_optional(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(value) => format!("{value:.precision$}"),
        None => "n/a".to_string(),
    }
}

fn count_negative(values: &Float64Chunked) -> usize {
    values.into_iter().flatten().filter(|v| *v < 0.0).count()
}

fn count_mismatches(recalculated: &BooleanChunked, provided: &BooleanChunked) -> usize {
    recalculated
        .into_iter()
        .zip(provided.into_iter())
        .filter(|(a, b)| a != b)
        .count()
}

fn is_before(later: Option<i64>, earlier: Option<i64>) -> bool {
    matches!((later, earlier), (Some(later), Some(earlier)) if later < earlier)
}

/// Median over non-NaN values; the mean of the two middle values for even counts.
pub(crate) fn median(mut values: Vec<f64>) -> Option<f64> {
    values.retain(|v| !v.is_nan());
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn true_rate(flags: &BooleanChunked) -> Option<f64> {
    let values: Vec<f64> = flags
        .into_iter()
        .flatten()
        .map(|flag| if flag { 1.0 } else { 0.0 })
        .collect();
    mean(&values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_handles_even_odd_and_empty() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(vec![4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(vec![f64::NAN, 5.0]), Some(5.0));
        assert_eq!(median(Vec::new()), None);
    }

    #[test]
    fn uniqueness_counts_repeats_after_the_first() -> Result<()> {
        let config = PipelineConfig::default();
        let df = DataFrame::new(vec![Series::new(
            "Ticket ID".into(),
            vec![Some("1"), Some("2"), Some("1"), Some("1"), None],
        )
        .into()])?;

        let report = check_uniqueness(&df, &config)?;
        assert_eq!(
            report,
            UniquenessReport {
                duplicates: 2,
                nulls: 1
            }
        );
        Ok(())
    }

    #[test]
    fn uniqueness_casts_numeric_ids() -> Result<()> {
        let config = PipelineConfig::default();
        let df = DataFrame::new(vec![Series::new("Ticket ID".into(), vec![7i64, 8, 7]).into()])?;
        assert_eq!(check_uniqueness(&df, &config)?.duplicates, 1);
        Ok(())
    }

    #[test]
    fn format_optional_uses_precision() {
        assert_eq!(format_optional(Some(0.5), 4), "0.5000");
        assert_eq!(format_optional(None, 2), "n/a");
    }
}
