//! Newline-delimited JSON parser

use std::borrow::Cow;
use std::path::Path;

use indexmap::IndexSet;
use serde_json::{Map, Value};

use crate::config::ExtractOptions;
use crate::error::{EtlError, Result};
use crate::model::{CellValue, Table};

use super::{read_text, Parser};

/// Parser for newline-delimited JSON files (one object per line)
pub struct JsonParser;

impl Parser for JsonParser {
    fn parse(
        &self,
        path: &Path,
        columns: Option<&[String]>,
        options: &ExtractOptions,
    ) -> Result<Table> {
        let text = read_text(path, options.json.encoding.as_deref())?;

        let mut records: Vec<Map<String, Value>> = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line_num = idx + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(line).map_err(|e| EtlError::Parse {
                path: path.to_path_buf(),
                line: line_num,
                reason: e.to_string(),
            })?;
            match value {
                Value::Object(obj) => records.push(obj),
                _ => {
                    return Err(EtlError::Parse {
                        path: path.to_path_buf(),
                        line: line_num,
                        reason: "expected a JSON object".to_string(),
                    })
                }
            }
        }

        if records.is_empty() {
            return Ok(Table::empty());
        }

        // Collect all unique keys across all objects to build column list
        let column_names: Vec<String> = match columns {
            Some(requested) => requested.to_vec(),
            None => {
                let mut names: IndexSet<String> = IndexSet::new();
                for obj in &records {
                    for key in obj.keys() {
                        names.insert(key.clone());
                    }
                }
                names.into_iter().collect()
            }
        };

        let mut table = Table::with_names(&column_names)?;
        for obj in &records {
            let cells = column_names
                .iter()
                .map(|key| json_value_to_cell(obj.get(key)))
                .collect();
            table.push_row(cells)?;
        }

        Ok(table)
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "json" | "jsonl" | "ndjson")
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// Scalars become their text form; arrays and objects keep their JSON text
fn json_value_to_cell(value: Option<&Value>) -> CellValue {
    match value {
        None | Some(Value::Null) => CellValue::Null,
        Some(Value::Bool(b)) => CellValue::String(Cow::Owned(b.to_string())),
        Some(Value::Number(n)) => CellValue::String(Cow::Owned(n.to_string())),
        Some(Value::String(s)) => CellValue::String(Cow::Owned(s.clone())),
        Some(nested @ (Value::Array(_) | Value::Object(_))) => {
            CellValue::String(Cow::Owned(nested.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn parse_str(content: &str, columns: Option<&[String]>) -> Result<Table> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, content).unwrap();
        JsonParser.parse(&path, columns, &ExtractOptions::default())
    }

    #[test]
    fn test_json_value_to_cell() {
        assert_eq!(json_value_to_cell(None), CellValue::Null);
        assert_eq!(json_value_to_cell(Some(&Value::Null)), CellValue::Null);
        assert_eq!(
            json_value_to_cell(Some(&serde_json::json!(42))),
            CellValue::from("42")
        );
        assert_eq!(
            json_value_to_cell(Some(&serde_json::json!(64.0))),
            CellValue::from("64.0")
        );
        assert_eq!(
            json_value_to_cell(Some(&serde_json::json!(true))),
            CellValue::from("true")
        );
        assert_eq!(
            json_value_to_cell(Some(&serde_json::json!([1, 2]))),
            CellValue::from("[1,2]")
        );
    }

    #[test]
    fn test_union_of_keys_in_first_seen_order() {
        let table = parse_str(
            "{\"name\": \"ann\", \"age\": 31}\n\n{\"name\": \"bob\", \"city\": \"Leeds\"}\n",
            None,
        )
        .unwrap();
        assert_eq!(table.column_names(), vec!["name", "age", "city"]);
        assert_eq!(
            table.rows[1].cells,
            vec![CellValue::from("bob"), CellValue::Null, CellValue::from("Leeds")]
        );
    }

    #[test]
    fn test_requested_columns() {
        let columns = vec!["age".to_string(), "missing".to_string()];
        let table = parse_str("{\"name\": \"ann\", \"age\": 31}\n", Some(&columns)).unwrap();
        assert_eq!(table.column_names(), vec!["age", "missing"]);
        assert_eq!(
            table.rows[0].cells,
            vec![CellValue::from("31"), CellValue::Null]
        );
    }

    #[test]
    fn test_non_object_line_is_parse_error() {
        let err = parse_str("{\"a\": 1}\n[1, 2]\n", None).unwrap_err();
        assert!(matches!(err, EtlError::Parse { line: 2, .. }));

        let err = parse_str("{\"a\": \n", None).unwrap_err();
        assert!(matches!(err, EtlError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_empty_file_is_empty_table() {
        assert!(parse_str("\n\n", None).unwrap().is_empty());
    }
}
