//! tabetl - extract, transform and load tabular data
//!
//! Reads directories of CSV, newline-delimited JSON and XML files into a
//! uniform all-text [`Table`], casts columns to scalar types, converts
//! physical units and writes the result back out as CSV.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use tabetl::config::ExtractOptions;
//! use tabetl::model::ScalarType;
//! use tabetl::transform::{TypeSchema, UnitConversions, UnitRegistry};
//!
//! # fn main() -> tabetl::Result<()> {
//! let registry = UnitRegistry::builtin();
//! let table = tabetl::read_directory(Path::new("data/raw"), None, &ExtractOptions::default())?;
//!
//! let mut schema = TypeSchema::new();
//! schema.insert("height".into(), ScalarType::Float);
//! let table = tabetl::coerce_types(table, &schema);
//!
//! let conversions = UnitConversions::new().with("height", "inch", "meter");
//! let table = tabetl::convert_units(table, &conversions, &registry)?;
//!
//! tabetl::write_csv(&table, Path::new("data/processed/out.csv"))?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod job;
pub mod model;
pub mod parser;
pub mod transform;
pub mod writer;

pub use config::ExtractOptions;
pub use error::{EtlError, Result};
pub use model::Table;
pub use parser::{read_directory, read_file};
pub use transform::{coerce_types, convert_units};
pub use writer::write_csv;
