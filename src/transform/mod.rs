//! Transform stages applied between extraction and loading

pub mod coerce;
pub mod units;

pub use coerce::{
    coerce_types, coerce_types_reported, coerce_types_with, CastMode, Coerced, CoercionReport,
    MalformedCell, TypeSchema,
};
pub use units::{convert_units, Conversion, Dimension, Unit, UnitConversions, UnitRegistry};
