//! Delimited text parser

use std::borrow::Cow;
use std::path::Path;

use crate::config::ExtractOptions;
use crate::error::{EtlError, Result};
use crate::model::{CellValue, Table};

use super::{read_text, Parser};

/// Parser for delimited text files.
///
/// Values are never type-inferred; empty fields become null.
pub struct CsvParser;

impl Parser for CsvParser {
    fn parse(
        &self,
        path: &Path,
        columns: Option<&[String]>,
        options: &ExtractOptions,
    ) -> Result<Table> {
        let opts = &options.csv;
        let text = read_text(path, opts.encoding.as_deref())?;
        let body = skip_lines(&text, opts.skip_rows);

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(opts.delimiter_byte()?)
            .has_headers(false)
            .flexible(true)
            .from_reader(body.as_bytes());

        let mut records = Vec::new();
        for result in csv_reader.records() {
            let record = result.map_err(|source| EtlError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            let line = record.position().map_or(0, |p| p.line() as usize) + opts.skip_rows;
            records.push((line, record));
        }

        let mut records = records.into_iter();
        let (names, indices, width) = if opts.has_header {
            let Some((_, header)) = records.next() else {
                return Ok(Table::empty());
            };
            let header: Vec<String> = header.iter().map(str::to_string).collect();
            // Reject duplicate header names even when only a subset is selected
            Table::with_names(&header)?;

            match columns {
                Some(requested) => {
                    let indices = requested
                        .iter()
                        .map(|name| {
                            header.iter().position(|h| h == name).ok_or_else(|| {
                                EtlError::MissingColumn {
                                    path: path.to_path_buf(),
                                    column: name.clone(),
                                }
                            })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    (requested.to_vec(), indices, header.len())
                }
                None => {
                    let width = header.len();
                    (header, (0..width).collect(), width)
                }
            }
        } else {
            let width = match columns {
                Some(requested) => requested.len(),
                None => match records.as_slice().first() {
                    Some((_, record)) => record.len(),
                    None => return Ok(Table::empty()),
                },
            };
            let names = match columns {
                Some(requested) => requested.to_vec(),
                None => (1..=width).map(|i| format!("column_{}", i)).collect(),
            };
            (names, (0..width).collect(), width)
        };

        let mut table = Table::with_names(&names)?;
        for (line, record) in records {
            if record.len() > width {
                return Err(EtlError::Parse {
                    path: path.to_path_buf(),
                    line,
                    reason: format!("expected {} fields, found {}", width, record.len()),
                });
            }
            // Short rows are padded with nulls
            let cells = indices
                .iter()
                .map(|&i| match record.get(i) {
                    Some(s) if !s.is_empty() => CellValue::String(Cow::Owned(s.to_string())),
                    _ => CellValue::Null,
                })
                .collect();
            table.push_row(cells)?;
        }

        Ok(table)
    }

    fn supports_extension(&self, ext: &str) -> bool {
        ext.eq_ignore_ascii_case("csv")
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}

/// Drop the first `n` lines of `text`
fn skip_lines(text: &str, n: usize) -> &str {
    let mut rest = text;
    for _ in 0..n {
        match rest.find('\n') {
            Some(i) => rest = &rest[i + 1..],
            None => return "",
        }
    }
    rest
}
