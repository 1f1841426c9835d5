use polars::prelude::{Column, DataFrame};

use crate::error::{PipelineError, Result};

pub const FIRST_RESPONSE_MINUTES: &str = "first_response_minutes";
pub const RESOLUTION_MINUTES: &str = "resolution_minutes";
pub const RESPONSE_SLA_MET_RECALC: &str = "response_sla_met_recalc";
pub const RESOLUTION_SLA_MET_RECALC: &str = "resolution_sla_met_recalc";
pub const RESPONSE_SLA_FLAG_BOOL: &str = "response_sla_flag_bool";
pub const RESOLUTION_SLA_FLAG_BOOL: &str = "resolution_sla_flag_bool";
pub const BACKLOG_FLAG: &str = "backlog_flag";
pub const SATISFACTION_SCORE: &str = "satisfaction_score";

/// KPI columns appended to every processed dataset, in output order.
pub const DERIVED_COLUMNS: [&str; 8] = [
    FIRST_RESPONSE_MINUTES,
    RESOLUTION_MINUTES,
    RESPONSE_SLA_MET_RECALC,
    RESOLUTION_SLA_MET_RECALC,
    RESPONSE_SLA_FLAG_BOOL,
    RESOLUTION_SLA_FLAG_BOOL,
    BACKLOG_FLAG,
    SATISFACTION_SCORE,
];

/// The label value a provided SLA column must carry to count as met.
pub const SLA_MET_LABEL: &str = "Met";

pub(crate) fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| PipelineError::Schema(format!("missing required column '{name}'")))
}
