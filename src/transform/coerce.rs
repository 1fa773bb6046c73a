//! Per-column type coercion
//!
//! Casting is non-strict by default: a cell that cannot be read as the
//! target type becomes null and is counted in the [`CoercionReport`]. The
//! batch keeps going with the same row and column counts. [`CastMode::Strict`]
//! turns the first such cell into an [`EtlError::MalformedValue`] instead.

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{EtlError, Result};
use crate::model::{CellValue, ScalarType, Table};

/// Target type per column, applied in insertion order
pub type TypeSchema = IndexMap<String, ScalarType>;

/// How to treat values that cannot be cast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastMode {
    /// Replace the value with null and count it
    #[default]
    Lenient,
    /// Fail on the first malformed value
    Strict,
}

/// A cell that could not be cast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedCell {
    pub column: String,
    /// 1-based row number within the table
    pub row: usize,
    pub value: String,
    pub target: ScalarType,
}

/// Outcome of a lenient cast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoercionReport {
    /// Cells replaced with null, per cast column
    pub nulled: IndexMap<String, usize>,
    /// First malformed cell encountered, in schema then row order
    pub first_failure: Option<MalformedCell>,
}

impl CoercionReport {
    /// Total number of nulled cells
    pub fn total_nulled(&self) -> usize {
        self.nulled.values().sum()
    }

    /// Nulled cells for one column (0 if the column was not cast)
    pub fn nulled_in(&self, column: &str) -> usize {
        self.nulled.get(column).copied().unwrap_or(0)
    }

    pub fn is_clean(&self) -> bool {
        self.first_failure.is_none()
    }
}

/// A cast table together with its report
#[derive(Debug, Clone)]
pub struct Coerced {
    pub table: Table,
    pub report: CoercionReport,
}

/// Cast the schema's columns, nulling values that do not parse
pub fn coerce_types(table: Table, schema: &TypeSchema) -> Table {
    coerce_types_reported(table, schema).table
}

/// Cast the schema's columns according to `mode`
pub fn coerce_types_with(table: Table, schema: &TypeSchema, mode: CastMode) -> Result<Coerced> {
    let coerced = coerce_types_reported(table, schema);
    match (mode, coerced.report.first_failure) {
        (CastMode::Strict, Some(cell)) => Err(EtlError::MalformedValue {
            column: cell.column,
            row: cell.row,
            value: cell.value,
            target: cell.target,
        }),
        (_, first_failure) => Ok(Coerced {
            table: coerced.table,
            report: CoercionReport {
                nulled: coerced.report.nulled,
                first_failure,
            },
        }),
    }
}

/// Lenient cast that also reports how many cells were nulled
pub fn coerce_types_reported(mut table: Table, schema: &TypeSchema) -> Coerced {
    let mut report = CoercionReport::default();

    for (name, &target) in schema {
        let Some(idx) = table.column_index(name) else {
            warn!(column = %name, "Type schema names a column that is not in the table");
            continue;
        };

        let mut nulled = 0;
        for (row_idx, row) in table.rows.iter_mut().enumerate() {
            let cell = std::mem::replace(&mut row.cells[idx], CellValue::Null);
            match cast_cell(cell, target) {
                Ok(value) => row.cells[idx] = value,
                Err(original) => {
                    nulled += 1;
                    if report.first_failure.is_none() {
                        report.first_failure = Some(MalformedCell {
                            column: name.clone(),
                            row: row_idx + 1,
                            value: original.display().into_owned(),
                            target,
                        });
                    }
                }
            }
        }

        table.set_column_type(idx, target);
        if nulled > 0 {
            debug!(column = %name, target = %target, nulled, "Nulled values that failed to cast");
        }
        report.nulled.insert(name.clone(), nulled);
    }

    Coerced { table, report }
}

/// Cast one value; the original comes back on failure
fn cast_cell(value: CellValue, target: ScalarType) -> std::result::Result<CellValue, CellValue> {
    match (target, value) {
        (_, CellValue::Null) => Ok(CellValue::Null),

        (ScalarType::Text, CellValue::String(s)) => Ok(CellValue::String(s)),
        (ScalarType::Text, other) => Ok(CellValue::from(other.display().into_owned())),

        (ScalarType::Integer, CellValue::Int(i)) => Ok(CellValue::Int(i)),
        (ScalarType::Integer, CellValue::Float(f)) => {
            if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                Ok(CellValue::Int(f as i64))
            } else {
                Err(CellValue::Float(f))
            }
        }
        (ScalarType::Integer, CellValue::String(s)) => match s.trim().parse::<i64>() {
            Ok(i) => Ok(CellValue::Int(i)),
            Err(_) => Err(CellValue::String(s)),
        },

        (ScalarType::Float, CellValue::Float(f)) => Ok(CellValue::Float(f)),
        (ScalarType::Float, CellValue::Int(i)) => Ok(CellValue::Float(i as f64)),
        (ScalarType::Float, CellValue::String(s)) => match s.trim().parse::<f64>() {
            Ok(f) => Ok(CellValue::Float(f)),
            Err(_) => Err(CellValue::String(s)),
        },
    }
}
