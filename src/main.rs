//! tabetl - run one extract-transform-load job

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use tabetl::job::{EtlJob, JobConfig};
use tabetl::model::ScalarType;
use tabetl::transform::{CastMode, UnitRegistry};

/// Extract CSV, NDJSON and XML files, cast and convert columns, write CSV
#[derive(Parser, Debug)]
#[command(name = "tabetl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing the source files
    #[arg(required_unless_present = "config")]
    source_dir: Option<PathBuf>,

    /// CSV file to write
    #[arg(required_unless_present = "config")]
    output: Option<PathBuf>,

    /// JSON job file; other flags override its settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Column(s) to extract (comma-separated)
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Field delimiter for CSV sources
    #[arg(long)]
    delimiter: Option<char>,

    /// Lines to skip at the top of CSV sources
    #[arg(long)]
    skip_rows: Option<usize>,

    /// CSV sources have no header row
    #[arg(long)]
    no_header: bool,

    /// Encoding label for all sources (e.g. latin1)
    #[arg(long)]
    encoding: Option<String>,

    /// Only XML root children with this tag are records
    #[arg(long)]
    record_tag: Option<String>,

    /// Cast a column, e.g. height=float (repeatable)
    #[arg(long = "type", value_name = "COLUMN=TYPE", value_parser = parse_type_spec)]
    types: Vec<(String, ScalarType)>,

    /// Convert a column's units, e.g. height=inch:meter (repeatable)
    #[arg(long = "unit", value_name = "COLUMN=FROM:TO", value_parser = parse_unit_spec)]
    units: Vec<(String, String, String)>,

    /// Decimal places kept after unit conversion
    #[arg(long)]
    precision: Option<u32>,

    /// Fail on the first value that cannot be cast instead of nulling it
    #[arg(long)]
    strict: bool,

    /// Append `timestamp,message` progress lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_type_spec(s: &str) -> Result<(String, ScalarType), String> {
    let (column, data_type) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=TYPE, got '{}'", s))?;
    Ok((column.trim().to_string(), data_type.parse()?))
}

fn parse_unit_spec(s: &str) -> Result<(String, String, String), String> {
    let parsed = s
        .split_once('=')
        .and_then(|(column, units)| units.split_once(':').map(|(from, to)| (column, from, to)));
    match parsed {
        Some((column, from, to)) if !column.is_empty() && !from.is_empty() && !to.is_empty() => {
            Ok((column.trim().into(), from.trim().into(), to.trim().into()))
        }
        _ => Err(format!("expected COLUMN=FROM:TO, got '{}'", s)),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tabetl={}", level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn build_config(cli: Cli) -> Result<JobConfig> {
    let mut config = match &cli.config {
        Some(path) => JobConfig::from_file(path)?,
        None => JobConfig::default(),
    };

    if let Some(source_dir) = cli.source_dir {
        config.source_dir = source_dir;
    }
    if let Some(output) = cli.output {
        config.output_file = output;
    }
    if cli.log_file.is_some() {
        config.log_file = cli.log_file;
    }
    if !cli.columns.is_empty() {
        config.columns = Some(cli.columns);
    }

    let extract = &mut config.extract;
    if let Some(delimiter) = cli.delimiter {
        extract.csv.delimiter = delimiter;
    }
    if let Some(skip_rows) = cli.skip_rows {
        extract.csv.skip_rows = skip_rows;
    }
    if cli.no_header {
        extract.csv.has_header = false;
    }
    if let Some(encoding) = cli.encoding {
        extract.csv.encoding = Some(encoding.clone());
        extract.json.encoding = Some(encoding.clone());
        extract.xml.encoding = Some(encoding);
    }
    if cli.record_tag.is_some() {
        extract.xml.record_tag = cli.record_tag;
    }

    config.types.extend(cli.types);
    config
        .units
        .extend(cli.units.into_iter().map(|(column, from, to)| (column, (from, to))));
    if cli.precision.is_some() {
        config.precision = cli.precision;
    }
    if cli.strict {
        config.cast_mode = CastMode::Strict;
    }

    if config.source_dir.as_os_str().is_empty() || config.output_file.as_os_str().is_empty() {
        anyhow::bail!("a source directory and an output file are required");
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = build_config(cli)?;
    let source_dir = config.source_dir.clone();

    let registry = UnitRegistry::builtin();
    let summary = EtlJob::new(config, &registry)
        .run()
        .with_context(|| format!("ETL job failed for {}", source_dir.display()))?;

    println!(
        "Wrote {} rows x {} columns to {}",
        summary.rows,
        summary.columns,
        summary.output_file.display()
    );
    if summary.nulled > 0 {
        println!(
            "{} value(s) could not be cast and were set to null",
            summary.nulled
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_spec() {
        assert_eq!(
            parse_type_spec("height=float"),
            Ok(("height".to_string(), ScalarType::Float))
        );
        assert!(parse_type_spec("height").is_err());
        assert!(parse_type_spec("height=decimal").is_err());
    }

    #[test]
    fn test_parse_unit_spec() {
        assert_eq!(
            parse_unit_spec("weight=pound:kilogram"),
            Ok(("weight".into(), "pound".into(), "kilogram".into()))
        );
        assert!(parse_unit_spec("weight=pound").is_err());
        assert!(parse_unit_spec("=pound:kg").is_err());
    }

    #[test]
    fn test_flags_override_job_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        std::fs::write(
            &path,
            r#"{"source_dir": "in", "output_file": "out.csv", "extract": {"csv": {"delimiter": ";"}}}"#,
        )
        .unwrap();

        let cli = Cli::parse_from([
            "tabetl",
            "--config",
            path.to_str().unwrap(),
            "--skip-rows",
            "2",
            "--type",
            "h=float",
            "--strict",
        ]);
        let config = build_config(cli).unwrap();
        assert_eq!(config.source_dir, PathBuf::from("in"));
        assert_eq!(config.extract.csv.delimiter, ';');
        assert_eq!(config.extract.csv.skip_rows, 2);
        assert_eq!(config.types.get("h"), Some(&ScalarType::Float));
        assert_eq!(config.cast_mode, CastMode::Strict);
    }
}
