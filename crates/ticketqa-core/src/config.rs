use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Raw column names as they appear (after trimming) in the export header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnNames {
    pub ticket_id: String,
    pub created_time: String,
    pub first_response_time: String,
    pub resolution_time: String,
    pub close_time: String,
    pub expected_sla_first_response: String,
    pub expected_sla_resolve: String,
    pub status: String,
    pub sla_first_response_label: String,
    pub sla_resolution_label: String,
    pub survey_result: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            ticket_id: "Ticket ID".to_string(),
            created_time: "Created time".to_string(),
            first_response_time: "First response time".to_string(),
            resolution_time: "Resolution time".to_string(),
            close_time: "Close time".to_string(),
            expected_sla_first_response: "Expected SLA to first response".to_string(),
            expected_sla_resolve: "Expected SLA to resolve".to_string(),
            status: "Status".to_string(),
            sla_first_response_label: "SLA For first response".to_string(),
            sla_resolution_label: "SLA For Resolution".to_string(),
            survey_result: "Survey results".to_string(),
        }
    }
}

impl ColumnNames {
    /// The six columns converted to timestamps, in parse order.
    pub fn time_columns(&self) -> [&str; 6] {
        [
            self.created_time.as_str(),
            self.first_response_time.as_str(),
            self.resolution_time.as_str(),
            self.close_time.as_str(),
            self.expected_sla_first_response.as_str(),
            self.expected_sla_resolve.as_str(),
        ]
    }
}

/// Settings for one pipeline run. Built once, then only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub raw_path: PathBuf,
    pub processed_path: PathBuf,
    pub columns: ColumnNames,
    /// Statuses that count as open backlog.
    pub backlog_statuses: Vec<String>,
    pub satisfaction_map: BTreeMap<String, i64>,
    /// chrono format used for timestamp columns in the processed file.
    pub output_datetime_format: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_path: PathBuf::from("data/raw/itsm_raw.csv"),
            processed_path: PathBuf::from("data/processed/itsm_clean.csv"),
            columns: ColumnNames::default(),
            backlog_statuses: vec![
                "New".to_string(),
                "Open".to_string(),
                "In Progress".to_string(),
            ],
            satisfaction_map: BTreeMap::from([
                ("Satisfied".to_string(), 3),
                ("Neutral".to_string(), 2),
                ("Dissatisfied".to_string(), 1),
            ]),
            output_datetime_format: "%Y-%m-%d %H:%M:%S%.f".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::Config(format!(
                "config file '{}' does not exist",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backlog_statuses.is_empty() {
            return Err(PipelineError::Config(
                "backlog_statuses must not be empty".to_string(),
            ));
        }
        if self.satisfaction_map.is_empty() {
            return Err(PipelineError::Config(
                "satisfaction_map must not be empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for name in self.columns.time_columns() {
            if !seen.insert(name) {
                return Err(PipelineError::Config(format!(
                    "time column '{name}' is configured more than once"
                )));
            }
        }
        if self.output_datetime_format.trim().is_empty() {
            return Err(PipelineError::Config(
                "output_datetime_format must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_backlog_status(&self, status: &str) -> bool {
        self.backlog_statuses.iter().any(|s| s == status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_export_layout() {
        let config = PipelineConfig::default();
        config.validate().unwrap();

        assert_eq!(config.columns.time_columns()[0], "Created time");
        assert_eq!(config.satisfaction_map.get("Neutral"), Some(&2));
        assert!(config.is_backlog_status("In Progress"));
        assert!(!config.is_backlog_status("Closed"));
    }

    #[test]
    fn toml_overrides_only_what_it_names() {
        let config = PipelineConfig::from_toml_str(
            r#"
                raw_path = "in/tickets.csv"
                backlog_statuses = ["Pending"]

                [columns]
                status = "State"
            "#,
        )
        .unwrap();

        assert_eq!(config.raw_path, PathBuf::from("in/tickets.csv"));
        assert_eq!(config.processed_path, PipelineConfig::default().processed_path);
        assert_eq!(config.backlog_statuses, vec!["Pending".to_string()]);
        assert_eq!(config.columns.status, "State");
        assert_eq!(config.columns.ticket_id, "Ticket ID");
    }

    #[test]
    fn rejects_empty_satisfaction_map() {
        let err = PipelineConfig::from_toml_str("[satisfaction_map]\n").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn rejects_repeated_time_columns() {
        let err = PipelineConfig::from_toml_str(
            r#"
                [columns]
                close_time = "Created time"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Created time"));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = PipelineConfig::from_toml_str("raw_pth = \"x.csv\"\n").unwrap_err();
        assert!(matches!(err, PipelineError::Toml(_)));
    }
}
