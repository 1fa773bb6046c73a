//! Table, Row, and Cell data structures

use std::borrow::Cow;

use rustc_hash::FxHashSet;

use super::schema::{Column, ScalarType};
use crate::error::{EtlError, Result};

/// A cell value with type information
#[derive(Debug, Clone)]
pub enum CellValue {
    Null,
    Int(i64),
    Float(f64),
    String(Cow<'static, str>),
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Null, CellValue::Null) => true,
            (CellValue::Int(a), CellValue::Int(b)) => a == b,
            (CellValue::Float(a), CellValue::Float(b)) => {
                // Handle NaN comparison
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            (CellValue::String(a), CellValue::String(b)) => a == b,
            _ => false,
        }
    }
}

impl CellValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Numeric view of the value; text and null are not numeric
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Text as it is written to a delimited file. Null renders as `None`.
    pub fn to_text(&self) -> Option<Cow<'_, str>> {
        match self {
            CellValue::Null => None,
            CellValue::Int(i) => Some(Cow::Owned(i.to_string())),
            CellValue::Float(f) => Some(Cow::Owned(format_float(*f))),
            CellValue::String(s) => Some(Cow::Borrowed(s.as_ref())),
        }
    }

    /// Convert to a display string
    pub fn display(&self) -> Cow<'_, str> {
        self.to_text().unwrap_or(Cow::Borrowed("null"))
    }
}

/// Integral floats keep one decimal so they read back as floats.
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(Cow::Owned(s.to_string()))
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(Cow::Owned(s))
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl<T> From<Option<T>> for CellValue
where
    T: Into<CellValue>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => CellValue::Null,
        }
    }
}

/// A row in the table
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Cell values in column order
    pub cells: Vec<CellValue>,
}

/// A table containing columns and rows.
///
/// Every row holds exactly one cell per column; `push_row` enforces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Column definitions
    pub columns: Vec<Column>,
    /// All rows in the table
    pub rows: Vec<Row>,
}

impl Table {
    /// Create a new empty table with column definitions
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Table with no columns and no rows
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create an empty text table from column names, rejecting duplicates
    pub fn with_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut seen = FxHashSet::default();
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if !seen.insert(name) {
                return Err(EtlError::DuplicateColumn {
                    column: name.to_string(),
                });
            }
            columns.push(Column::new(name));
        }
        Ok(Self::new(columns))
    }

    /// Build a table from column names and rows of cells
    pub fn from_rows<S: AsRef<str>>(names: &[S], rows: Vec<Vec<CellValue>>) -> Result<Self> {
        let mut table = Self::with_names(names)?;
        for cells in rows {
            table.push_row(cells)?;
        }
        Ok(table)
    }

    /// Add a row to the table
    pub fn push_row(&mut self, cells: Vec<CellValue>) -> Result<()> {
        if cells.len() != self.columns.len() {
            return Err(EtlError::RowWidth {
                expected: self.columns.len(),
                found: cells.len(),
            });
        }
        self.rows.push(Row { cells });
        Ok(())
    }

    /// Get column index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Get column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// All values of one column, top to bottom
    pub fn column_values(&self, name: &str) -> Option<Vec<&CellValue>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r.cells[idx]).collect())
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True for the zero-column, zero-row table
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    /// Append the rows of `other` below this table's rows.
    ///
    /// Both tables must carry the same set of column names. When the order
    /// differs, `other`'s cells are rearranged into this table's order. An
    /// empty table on either side yields the other one unchanged.
    pub fn concat(mut self, other: Table) -> Result<Table> {
        if self.is_empty() {
            return Ok(other);
        }
        if other.is_empty() {
            return Ok(self);
        }

        let mapping: Option<Vec<usize>> = self
            .columns
            .iter()
            .map(|c| other.column_index(&c.name))
            .collect();

        let mapping = match mapping {
            Some(m) if m.len() == other.column_count() => m,
            _ => {
                return Err(EtlError::SchemaMismatch {
                    expected: self.column_names(),
                    found: other.column_names(),
                })
            }
        };

        let in_order = mapping.iter().enumerate().all(|(i, &j)| i == j);
        self.rows.reserve(other.rows.len());
        for mut row in other.rows {
            if !in_order {
                let mut cells: Vec<Option<CellValue>> = row.cells.into_iter().map(Some).collect();
                row.cells = mapping
                    .iter()
                    .map(|&j| cells[j].take().unwrap_or(CellValue::Null))
                    .collect();
            }
            self.rows.push(row);
        }

        Ok(self)
    }

    /// Replace the declared type of a column
    pub(crate) fn set_column_type(&mut self, index: usize, data_type: ScalarType) {
        if let Some(col) = self.columns.get_mut(index) {
            col.data_type = data_type;
        }
    }
}
