//! XML parser
//!
//! Each element child of the document root is one record. A column's value
//! is the text of the first descendant element of the record whose tag
//! matches the column name.

use std::borrow::Cow;
use std::path::Path;

use indexmap::IndexSet;
use roxmltree::{Document, Node, ParsingOptions};

use crate::config::ExtractOptions;
use crate::error::{EtlError, Result};
use crate::model::{CellValue, Table};

use super::{read_text, Parser};

/// Parser for XML files
pub struct XmlParser;

impl Parser for XmlParser {
    fn parse(
        &self,
        path: &Path,
        columns: Option<&[String]>,
        options: &ExtractOptions,
    ) -> Result<Table> {
        let opts = &options.xml;
        let text = read_text(path, opts.encoding.as_deref())?;
        let parsing = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(&text, parsing).map_err(|source| EtlError::Xml {
            path: path.to_path_buf(),
            source,
        })?;

        let records: Vec<Node> = doc
            .root_element()
            .children()
            .filter(Node::is_element)
            .filter(|n| {
                opts.record_tag
                    .as_deref()
                    .map_or(true, |tag| n.tag_name().name() == tag)
            })
            .collect();

        let Some(first) = records.first() else {
            return Ok(Table::empty());
        };

        let column_names: Vec<String> = match columns {
            Some(requested) => requested.to_vec(),
            None => first
                .children()
                .filter(Node::is_element)
                .map(|n| n.tag_name().name().to_string())
                .collect::<IndexSet<_>>()
                .into_iter()
                .collect(),
        };

        let mut table = Table::with_names(&column_names)?;
        for record in &records {
            let cells = column_names
                .iter()
                .map(|name| field_text(record, name))
                .collect();
            table.push_row(cells)?;
        }

        Ok(table)
    }

    fn supports_extension(&self, ext: &str) -> bool {
        ext.eq_ignore_ascii_case("xml")
    }

    fn name(&self) -> &'static str {
        "xml"
    }
}

/// Text of the first descendant named `name`; null when absent or empty
fn field_text(record: &Node, name: &str) -> CellValue {
    record
        .descendants()
        .skip(1)
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .and_then(|n| n.text())
        .filter(|t| !t.is_empty())
        .map_or(CellValue::Null, |t| CellValue::String(Cow::Owned(t.to_string())))
}
