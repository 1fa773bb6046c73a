//! Append-only `timestamp,message` progress log

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::info;

use crate::error::{EtlError, Result};

/// Year-MonthName-Day-Hour:Minute:Second
pub const TIMESTAMP_FORMAT: &str = "%Y-%b-%d-%H:%M:%S";

/// Progress sink for batch jobs.
///
/// Every message is emitted as a tracing event; when a file is configured it
/// is also appended there. The file is reopened per message so nothing is
/// held open between phases.
#[derive(Debug, Clone, Default)]
pub struct ProgressLog {
    path: Option<PathBuf>,
}

impl ProgressLog {
    /// Log to `path` as well as to tracing
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Log to tracing only
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record one message with the current local time
    pub fn record(&self, message: &str) -> Result<()> {
        info!("{}", message);

        let Some(path) = &self.path else {
            return Ok(());
        };
        let entry = format_entry(&Local::now().naive_local(), message);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| EtlError::io(path, e))?;
        writeln!(file, "{}", entry).map_err(|e| EtlError::io(path, e))
    }
}

/// One log line without the trailing newline
pub fn format_entry(timestamp: &NaiveDateTime, message: &str) -> String {
    format!("{},{}", timestamp.format(TIMESTAMP_FORMAT), message)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_format_entry() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 9)
            .unwrap();
        assert_eq!(
            format_entry(&ts, "ETL job started"),
            "2024-Mar-05-14:07:09,ETL job started"
        );
    }

    #[test]
    fn test_record_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let log = ProgressLog::new(&path);
        log.record("first").unwrap();
        log.record("second").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(",first"));
        assert!(lines[1].ends_with(",second"));
    }

    #[test]
    fn test_disabled_log_writes_nothing() {
        let log = ProgressLog::disabled();
        assert!(log.record("nothing").is_ok());
        assert!(log.path().is_none());
    }

    #[test]
    fn test_missing_log_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = ProgressLog::new(dir.path().join("logs").join("log.txt"));
        assert!(matches!(log.record("x"), Err(EtlError::Io { .. })));
    }
}
