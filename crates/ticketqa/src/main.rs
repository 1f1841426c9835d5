use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use ticketqa_core::{check_only, run_pipeline, summarize, PipelineConfig, ReconciliationAggregates};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Service-desk ticket KPI pipeline", long_about = None)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load, derive, validate and write the processed dataset
    Run(RunArgs),
    /// Load, derive and validate without writing anything
    Check(CheckArgs),
    /// Print reconciliation aggregates of a processed dataset
    Summarize(SummarizeArgs),
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// TOML config file; defaults apply to anything it leaves out
    #[arg(long)]
    config: Option<PathBuf>,
    /// Raw ticket export to read
    #[arg(long)]
    input: Option<PathBuf>,
    /// Destination of the processed CSV
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct CheckArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    input: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct SummarizeArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    /// Processed CSV to summarize (defaults to the configured output path)
    #[arg(long)]
    input: Option<PathBuf>,
    /// Emit JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = format!("{err:#}");
            error!(error = %message, "Pipeline failed");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Run(args) => handle_run(args),
        Command::Check(args) => handle_check(args),
        Command::Summarize(args) => handle_summarize(args),
    }
}

fn handle_run(args: RunArgs) -> Result<()> {
    let config = resolve_config(args.config.as_deref(), args.input, args.output)?;
    let report = run_pipeline(&config)?;
    info!(
        rows = report.input_rows,
        path = %report.output.path.display(),
        digest = %report.output.digest,
        "Run finished"
    );
    Ok(())
}

fn handle_check(args: CheckArgs) -> Result<()> {
    let config = resolve_config(args.config.as_deref(), args.input, None)?;
    let snapshot = check_only(&config)?;
    info!(tickets = snapshot.total_tickets, "Check finished");
    Ok(())
}

fn handle_summarize(args: SummarizeArgs) -> Result<()> {
    let config = resolve_config(args.config.as_deref(), None, None)?;
    let path = args.input.unwrap_or(config.processed_path);
    let aggregates = summarize(&path)
        .with_context(|| format!("failed to summarize {}", path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&aggregates)?);
    } else {
        println!("{}", aggregates_table(&aggregates));
    }
    Ok(())
}

/// Layers CLI flags over environment over the config file over defaults.
fn resolve_config(
    file: Option<&Path>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<PipelineConfig> {
    dotenvy::dotenv().ok();
    layer_config(file, input, output, |key| env::var_os(key))
}

fn layer_config(
    file: Option<&Path>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    lookup: impl Fn(&str) -> Option<OsString>,
) -> Result<PipelineConfig> {
    let base = match file {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let raw_path = input
        .or_else(|| lookup("TICKETQA_RAW_PATH").map(PathBuf::from))
        .unwrap_or(base.raw_path.clone());
    let processed_path = output
        .or_else(|| lookup("TICKETQA_PROCESSED_PATH").map(PathBuf::from))
        .unwrap_or(base.processed_path.clone());

    Ok(PipelineConfig {
        raw_path,
        processed_path,
        ..base
    })
}

fn aggregates_table(aggregates: &ReconciliationAggregates) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Row count".to_string(), aggregates.row_count.to_string()]);
    table.add_row(vec![
        "Response SLA compliance (%)".to_string(),
        format_metric(aggregates.response_sla_compliance_pct),
    ]);
    table.add_row(vec![
        "Resolution SLA compliance (%)".to_string(),
        format_metric(aggregates.resolution_sla_compliance_pct),
    ]);
    table.add_row(vec![
        "Median resolution (min)".to_string(),
        format_metric(aggregates.median_resolution_minutes),
    ]);
    table.add_row(vec![
        "Satisfaction rate (%)".to_string(),
        format_metric(aggregates.satisfaction_rate_pct),
    ]);
    table
}

fn format_metric(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn write_config(dir: &Path) -> PathBuf {
        let config_path = dir.join("ticketqa.toml");
        std::fs::write(
            &config_path,
            "raw_path = \"from_file.csv\"\nprocessed_path = \"file_out.csv\"\n",
        )
        .unwrap();
        config_path
    }

    fn fake_env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let vars: HashMap<String, OsString> = pairs
            .iter()
            .map(|&(key, value)| (key.to_string(), OsString::from(value)))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn environment_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config(dir.path());
        let env = fake_env(&[
            ("TICKETQA_RAW_PATH", "from_env.csv"),
            ("TICKETQA_PROCESSED_PATH", "env_out.csv"),
        ]);

        let config = layer_config(Some(&config_path), None, None, env).unwrap();

        assert_eq!(config.raw_path, PathBuf::from("from_env.csv"));
        assert_eq!(config.processed_path, PathBuf::from("env_out.csv"));
    }

    #[test]
    fn flags_override_environment() {
        let env = fake_env(&[
            ("TICKETQA_RAW_PATH", "from_env.csv"),
            ("TICKETQA_PROCESSED_PATH", "env_out.csv"),
        ]);

        let config = layer_config(None, Some(PathBuf::from("from_flag.csv")), None, env).unwrap();

        assert_eq!(config.raw_path, PathBuf::from("from_flag.csv"));
        assert_eq!(config.processed_path, PathBuf::from("env_out.csv"));
    }

    #[test]
    fn defaults_apply_without_file_env_or_flags() {
        let config = layer_config(None, None, None, fake_env(&[])).unwrap();
        let defaults = PipelineConfig::default();

        assert_eq!(config.raw_path, defaults.raw_path);
        assert_eq!(config.processed_path, defaults.processed_path);
    }

    #[test]
    fn cli_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config(dir.path());

        let config = layer_config(
            Some(&config_path),
            Some(PathBuf::from("from_flag.csv")),
            Some(PathBuf::from("flag_out.csv")),
            fake_env(&[]),
        )
        .unwrap();

        assert_eq!(config.raw_path, PathBuf::from("from_flag.csv"));
        assert_eq!(config.processed_path, PathBuf::from("flag_out.csv"));
    }

    #[test]
    fn aggregates_render_as_table() {
        let aggregates = ReconciliationAggregates {
            row_count: 4,
            response_sla_compliance_pct: Some(75.0),
            resolution_sla_compliance_pct: None,
            median_resolution_minutes: Some(120.0),
            satisfaction_rate_pct: Some(50.0),
        };
        let rendered = aggregates_table(&aggregates).to_string();

        assert!(rendered.contains("Row count"));
        assert!(rendered.contains("75.0000"));
        assert!(rendered.contains("n/a"));
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["ticketqa", "--log-format", "pretty", "check", "--input", "raw.csv"])
            .unwrap();
        assert!(matches!(cli.log_format, LogFormat::Pretty));
        match cli.command {
            Command::Check(args) => assert_eq!(args.input, Some(PathBuf::from("raw.csv"))),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
