//! Batch job driver: extract, transform and load one source directory

mod progress;

use std::path::{Path, PathBuf};

use anyhow::Context;
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::error;

use crate::config::ExtractOptions;
use crate::error::Result;
use crate::model::ScalarType;
use crate::parser::read_directory;
use crate::transform::{
    coerce_types_with, convert_units, CastMode, Coerced, TypeSchema, UnitConversions,
    UnitRegistry,
};
use crate::writer::write_csv;

pub use progress::{format_entry, ProgressLog, TIMESTAMP_FORMAT};

/// Description of one ETL job
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Directory holding the source files
    pub source_dir: PathBuf,
    /// CSV file the result is written to
    pub output_file: PathBuf,
    /// Optional `timestamp,message` progress log
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Columns to extract; every column when unset
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub extract: ExtractOptions,
    /// Target type per column
    #[serde(default)]
    pub types: TypeSchema,
    /// `[from, to]` units per column
    #[serde(default)]
    pub units: IndexMap<String, (String, String)>,
    /// Decimal places kept after unit conversion
    #[serde(default)]
    pub precision: Option<u32>,
    #[serde(default)]
    pub cast_mode: CastMode,
}

impl JobConfig {
    pub fn new(source_dir: impl Into<PathBuf>, output_file: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_file: output_file.into(),
            ..Default::default()
        }
    }

    /// Load a job description from a JSON file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job file: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid job file: {}", path.display()))
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn with_extract(mut self, extract: ExtractOptions) -> Self {
        self.extract = extract;
        self
    }

    pub fn with_type(mut self, column: impl Into<String>, data_type: ScalarType) -> Self {
        self.types.insert(column.into(), data_type);
        self
    }

    pub fn with_unit(
        mut self,
        column: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        self.units.insert(column.into(), (from.into(), to.into()));
        self
    }

    pub fn with_precision(mut self, decimals: u32) -> Self {
        self.precision = Some(decimals);
        self
    }

    pub fn with_cast_mode(mut self, mode: CastMode) -> Self {
        self.cast_mode = mode;
        self
    }

    /// The unit conversions of this job
    pub fn conversions(&self) -> UnitConversions {
        UnitConversions {
            columns: self.units.clone(),
            precision: self.precision,
        }
    }
}

/// What a finished job produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub rows: usize,
    pub columns: usize,
    /// Cells nulled because they failed to cast
    pub nulled: usize,
    pub output_file: PathBuf,
}

/// A configured job bound to a unit registry
pub struct EtlJob<'a> {
    config: JobConfig,
    registry: &'a UnitRegistry,
    log: ProgressLog,
}

impl<'a> EtlJob<'a> {
    pub fn new(config: JobConfig, registry: &'a UnitRegistry) -> Self {
        let log = match &config.log_file {
            Some(path) => ProgressLog::new(path),
            None => ProgressLog::disabled(),
        };
        Self {
            config,
            registry,
            log,
        }
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Run extract, transform and load in order
    pub fn run(&self) -> Result<JobSummary> {
        let config = &self.config;
        self.log.record("ETL job started")?;

        let table = self.phase("Extract", || {
            read_directory(
                &config.source_dir,
                config.columns.as_deref(),
                &config.extract,
            )
        })?;

        let (table, nulled) = self.phase("Transform", || {
            let Coerced { table, report } =
                coerce_types_with(table, &config.types, config.cast_mode)?;
            let table = convert_units(table, &config.conversions(), self.registry)?;
            Ok((table, report.total_nulled()))
        })?;

        self.phase("Load", || write_csv(&table, &config.output_file))?;

        self.log.record("ETL job finished")?;
        Ok(JobSummary {
            rows: table.row_count(),
            columns: table.column_count(),
            nulled,
            output_file: config.output_file.clone(),
        })
    }

    fn phase<T>(&self, name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.log.record(&format!("{} phase started", name))?;
        match f() {
            Ok(value) => {
                self.log.record(&format!("{} phase finished", name))?;
                Ok(value)
            }
            Err(e) => {
                error!(phase = name, error = %e, "Phase failed");
                // The phase error is what the caller needs to see
                let _ = self.log.record(&format!("{} phase failed", name));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::error::EtlError;

    #[test]
    fn test_job_config_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        fs::write(
            &path,
            r#"{
                "source_dir": "data/raw",
                "output_file": "data/out.csv",
                "types": {"height": "float", "weight": "float"},
                "units": {"height": ["inch", "meter"]},
                "precision": 4,
                "extract": {"csv": {"delimiter": ";"}}
            }"#,
        )
        .unwrap();

        let config = JobConfig::from_file(&path).unwrap();
        let expected = JobConfig::new("data/raw", "data/out.csv")
            .with_type("height", ScalarType::Float)
            .with_type("weight", ScalarType::Float)
            .with_unit("height", "inch", "meter")
            .with_precision(4)
            .with_extract(ExtractOptions::default().with_csv(
                crate::config::CsvOptions::default().with_delimiter(';'),
            ));
        assert_eq!(config, expected);
    }

    #[test]
    fn test_job_config_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        fs::write(
            &path,
            r#"{"source_dir": "a", "output_file": "b", "unit": {}}"#,
        )
        .unwrap();
        assert!(JobConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_run_logs_every_phase() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("raw");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("a.csv"), "name,height\nann,64.0\nbob,n/a\n").unwrap();

        let output = dir.path().join("out.csv");
        let log_file = dir.path().join("log.txt");
        let registry = UnitRegistry::builtin();
        let config = JobConfig::new(&source, &output)
            .with_log_file(&log_file)
            .with_type("height", ScalarType::Float)
            .with_unit("height", "inch", "meter")
            .with_precision(4);

        let summary = EtlJob::new(config, &registry).run().unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.columns, 2);
        assert_eq!(summary.nulled, 1);

        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "name,height\nann,1.6256\nbob,\n"
        );

        let log = fs::read_to_string(&log_file).unwrap();
        let messages: Vec<&str> = log
            .lines()
            .map(|l| l.split_once(',').unwrap().1)
            .collect();
        assert_eq!(
            messages,
            vec![
                "ETL job started",
                "Extract phase started",
                "Extract phase finished",
                "Transform phase started",
                "Transform phase finished",
                "Load phase started",
                "Load phase finished",
                "ETL job finished",
            ]
        );
    }

    #[test]
    fn test_failed_phase_is_logged_and_returned() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("raw");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("a.csv"), "w\n5\n").unwrap();

        let log_file = dir.path().join("log.txt");
        let registry = UnitRegistry::builtin();
        let config = JobConfig::new(&source, dir.path().join("out.csv"))
            .with_log_file(&log_file)
            .with_unit("w", "gram", "meter");

        let err = EtlJob::new(config, &registry).run().unwrap_err();
        assert!(matches!(err, EtlError::UnsupportedConversion { .. }));

        let log = fs::read_to_string(&log_file).unwrap();
        assert!(log.lines().last().unwrap().ends_with(",Transform phase failed"));
        assert!(!dir.path().join("out.csv").exists());
    }
}
