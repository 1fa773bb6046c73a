//! Per-format extraction options

use serde::Deserialize;

use crate::error::{EtlError, Result};

/// Options for delimited text files
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CsvOptions {
    /// Field separator; must be a single ASCII character
    pub delimiter: char,
    /// Lines dropped from the top of the file before the header
    pub skip_rows: usize,
    /// Whether the first (non-skipped) line names the columns
    pub has_header: bool,
    /// Encoding label understood by `encoding_rs` (defaults to UTF-8)
    pub encoding: Option<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            skip_rows: 0,
            has_header: true,
            encoding: None,
        }
    }
}

impl CsvOptions {
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    /// Delimiter as the byte the CSV reader expects
    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(EtlError::Config {
                message: format!("delimiter must be ASCII, got '{}'", self.delimiter),
            })
        }
    }
}

/// Options for newline-delimited JSON files
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JsonOptions {
    /// Encoding label understood by `encoding_rs` (defaults to UTF-8)
    pub encoding: Option<String>,
}

impl JsonOptions {
    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }
}

/// Options for XML files
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct XmlOptions {
    /// Encoding label understood by `encoding_rs` (defaults to UTF-8)
    pub encoding: Option<String>,
    /// Only root children with this tag are records; all of them when unset
    pub record_tag: Option<String>,
}

impl XmlOptions {
    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    pub fn with_record_tag(mut self, tag: impl Into<String>) -> Self {
        self.record_tag = Some(tag.into());
        self
    }
}

/// Options for every recognized source format
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractOptions {
    pub csv: CsvOptions,
    pub json: JsonOptions,
    pub xml: XmlOptions,
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_csv(mut self, csv: CsvOptions) -> Self {
        self.csv = csv;
        self
    }

    pub fn with_json(mut self, json: JsonOptions) -> Self {
        self.json = json;
        self
    }

    pub fn with_xml(mut self, xml: XmlOptions) -> Self {
        self.xml = xml;
        self
    }
}
