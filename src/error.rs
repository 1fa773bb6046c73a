//! Error types for extraction, transformation and loading

use std::path::PathBuf;

use thiserror::Error;

use crate::model::ScalarType;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("XML error in {path}: {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("Invalid record in {path} at line {line}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Column '{column}' not found in {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Unsupported file format: {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error(
        "Schema mismatch: expected columns [{}], found [{}]",
        .expected.join(", "),
        .found.join(", ")
    )]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Duplicate column name '{column}'")]
    DuplicateColumn { column: String },

    #[error("Row has {found} cells but the table has {expected} columns")]
    RowWidth { expected: usize, found: usize },

    #[error("Cannot convert '{from}' to '{to}': {reason}")]
    UnsupportedConversion {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Malformed value '{value}' in column '{column}' at row {row}: not a valid {target}")]
    MalformedValue {
        column: String,
        row: usize,
        value: String,
        target: ScalarType,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl EtlError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EtlError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mismatch_lists_both_column_sets() {
        let err = EtlError::SchemaMismatch {
            expected: vec!["name".into(), "age".into()],
            found: vec!["name".into()],
        };
        assert_eq!(
            err.to_string(),
            "Schema mismatch: expected columns [name, age], found [name]"
        );
    }
}
