pub mod aggregates;
pub mod config;
pub mod derivation;
pub mod error;
pub mod pipeline;
pub mod qa;
pub mod schema;
pub mod writer;

pub use aggregates::{summarize, ReconciliationAggregates};
pub use config::{ColumnNames, PipelineConfig};
pub use derivation::derive_kpi_columns;
pub use error::{PipelineError, Result};
pub use pipeline::{check_only, process_frame, run_pipeline, PipelineReport};
pub use qa::{run_qa_checks, KpiSnapshot};
pub use writer::{write_processed, WriteSummary};
