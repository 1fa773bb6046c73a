//! Parser layer for reading various tabular data formats

mod csv;
mod json;
mod xml;

use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};
use tracing::{debug, info, warn};

use crate::config::ExtractOptions;
use crate::error::{EtlError, Result};
use crate::model::Table;

pub use self::csv::CsvParser;
pub use self::json::JsonParser;
pub use self::xml::XmlParser;

/// Trait for parsing tabular data files.
///
/// Every parser yields an all-text table: cells are either `Null` or
/// `String`, and type interpretation is left to the coercion stage.
pub trait Parser {
    /// Parse a file and return a Table
    fn parse(
        &self,
        path: &Path,
        columns: Option<&[String]>,
        options: &ExtractOptions,
    ) -> Result<Table>;

    /// Check if this parser can handle the given file extension
    fn supports_extension(&self, ext: &str) -> bool;

    /// Short format name used in logs
    fn name(&self) -> &'static str;
}

/// Factory for selecting parsers based on file extension
pub struct ParserFactory {
    parsers: Vec<Box<dyn Parser>>,
}

impl Default for ParserFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserFactory {
    /// Create a new parser factory with all supported parsers.
    ///
    /// The order here is the order in which `read_directory` visits formats.
    pub fn new() -> Self {
        Self {
            parsers: vec![
                Box::new(CsvParser),
                Box::new(JsonParser),
                Box::new(XmlParser),
            ],
        }
    }

    /// Get a parser for the given file path
    pub fn get_parser(&self, path: &Path) -> Option<&dyn Parser> {
        let ext = extension_of(path);
        self.parsers
            .iter()
            .find(|p| p.supports_extension(&ext))
            .map(|p| p.as_ref())
    }

    /// Parse a file using the appropriate parser
    pub fn parse(
        &self,
        path: &Path,
        columns: Option<&[String]>,
        options: &ExtractOptions,
    ) -> Result<Table> {
        let parser = self.get_parser(path).ok_or_else(|| EtlError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
        parser.parse(path, columns, options)
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Parse a single file, choosing the parser by extension
pub fn read_file(
    path: &Path,
    columns: Option<&[String]>,
    options: &ExtractOptions,
) -> Result<Table> {
    ParserFactory::new().parse(path, columns, options)
}

/// Read every recognized file directly inside `dir` into one table.
///
/// Formats are visited CSV, then JSON, then XML, and files within a format
/// in name order. All files must produce the same column set; the first
/// disagreement is returned as `SchemaMismatch`. A directory without
/// recognized files yields an empty table.
pub fn read_directory(
    dir: &Path,
    columns: Option<&[String]>,
    options: &ExtractOptions,
) -> Result<Table> {
    let factory = ParserFactory::new();

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| EtlError::io(dir, e))? {
        let path = entry.map_err(|e| EtlError::io(dir, e))?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut table = Table::empty();
    for parser in &factory.parsers {
        for path in files
            .iter()
            .filter(|p| parser.supports_extension(&extension_of(p)))
        {
            let part = parser.parse(path, columns, options)?;
            info!(
                path = %path.display(),
                format = parser.name(),
                rows = part.row_count(),
                columns = part.column_count(),
                "Extracted file"
            );
            table = table.concat(part).inspect_err(|_| {
                warn!(path = %path.display(), "Column set differs from earlier files");
            })?;
        }
    }

    for path in files.iter().filter(|p| factory.get_parser(p).is_none()) {
        debug!(path = %path.display(), "Skipping unrecognized file");
    }

    Ok(table)
}

/// Read a whole file as text, decoding with the given encoding label
pub(crate) fn read_text(path: &Path, encoding: Option<&str>) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| EtlError::io(path, e))?;
    let encoding = match encoding {
        Some(label) => {
            Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| EtlError::Config {
                message: format!("unknown encoding '{}'", label),
            })?
        }
        None => UTF_8,
    };

    // BOM sniffing also strips a leading BOM
    let (text, used, had_errors) = encoding.decode(&bytes);
    if had_errors {
        warn!(
            path = %path.display(),
            encoding = used.name(),
            "Invalid byte sequences replaced while decoding"
        );
    }
    Ok(text.into_owned())
}
