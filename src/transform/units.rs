//! Unit registry and per-column unit conversion

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::{EtlError, Result};
use crate::model::{CellValue, ScalarType, Table};

/// Physical dimension a unit measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Length,
    Mass,
    Temperature,
    Time,
    Volume,
    Area,
    Speed,
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dimension::Length => write!(f, "length"),
            Dimension::Mass => write!(f, "mass"),
            Dimension::Temperature => write!(f, "temperature"),
            Dimension::Time => write!(f, "time"),
            Dimension::Volume => write!(f, "volume"),
            Dimension::Area => write!(f, "area"),
            Dimension::Speed => write!(f, "speed"),
        }
    }
}

/// A named unit. `base = value * scale + offset`, where the base unit of
/// each dimension is its SI unit (kelvin for temperature).
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub name: String,
    pub dimension: Dimension,
    pub scale: f64,
    pub offset: f64,
}

impl Unit {
    pub fn linear(name: impl Into<String>, dimension: Dimension, scale: f64) -> Self {
        Self {
            name: name.into(),
            dimension,
            scale,
            offset: 0.0,
        }
    }

    pub fn affine(name: impl Into<String>, dimension: Dimension, scale: f64, offset: f64) -> Self {
        Self {
            name: name.into(),
            dimension,
            scale,
            offset,
        }
    }

    pub fn is_linear(&self) -> bool {
        self.offset == 0.0
    }
}

/// Resolved conversion between two units of one dimension
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conversion {
    /// `value * factor`
    Linear { factor: f64 },
    /// `value * scale + offset` (temperature scales with shifted zeros)
    Affine { scale: f64, offset: f64 },
}

impl Conversion {
    pub fn apply(&self, value: f64) -> f64 {
        match *self {
            Conversion::Linear { factor } => value * factor,
            Conversion::Affine { scale, offset } => value * scale + offset,
        }
    }

    /// Multiplicative factor, if the conversion has one
    pub fn factor(&self) -> Option<f64> {
        match *self {
            Conversion::Linear { factor } => Some(factor),
            Conversion::Affine { .. } => None,
        }
    }
}

/// Lookup of named units grouped by dimension.
///
/// Aliases match exactly. Unit names also match case-insensitively and with
/// a trailing plural `s` removed, so `Meters` finds `meter` while `Mg` does
/// not fall back to `mg`.
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    units: Vec<Unit>,
    exact: FxHashMap<String, usize>,
    folded: FxHashMap<String, usize>,
}

impl UnitRegistry {
    /// Registry with no units
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with common length, mass, temperature, time, volume, area
    /// and speed units
    pub fn builtin() -> Self {
        use Dimension::*;

        let mut registry = Self::new();
        let linear: &[(&str, Dimension, f64, &[&str])] = &[
            ("meter", Length, 1.0, &["m", "metre"]),
            ("kilometer", Length, 1000.0, &["km", "kilometre"]),
            ("centimeter", Length, 0.01, &["cm", "centimetre"]),
            ("millimeter", Length, 0.001, &["mm", "millimetre"]),
            ("micrometer", Length, 1e-6, &["um", "micron"]),
            ("inch", Length, 0.0254, &["in", "inches"]),
            ("foot", Length, 0.3048, &["ft", "feet"]),
            ("yard", Length, 0.9144, &["yd"]),
            ("mile", Length, 1609.344, &["mi"]),
            ("nautical_mile", Length, 1852.0, &["nmi"]),
            ("kilogram", Mass, 1.0, &["kg"]),
            ("gram", Mass, 1e-3, &["g"]),
            ("milligram", Mass, 1e-6, &["mg"]),
            ("tonne", Mass, 1000.0, &["t", "metric_ton"]),
            ("pound", Mass, 0.45359237, &["lb", "lbs"]),
            ("ounce", Mass, 0.028349523125, &["oz"]),
            ("stone", Mass, 6.35029318, &["st"]),
            ("kelvin", Temperature, 1.0, &["K"]),
            ("rankine", Temperature, 5.0 / 9.0, &["degR"]),
            ("second", Time, 1.0, &["s", "sec"]),
            ("millisecond", Time, 1e-3, &["ms"]),
            ("minute", Time, 60.0, &["min"]),
            ("hour", Time, 3600.0, &["h", "hr"]),
            ("day", Time, 86400.0, &["d"]),
            ("week", Time, 604800.0, &["wk"]),
            ("cubic_meter", Volume, 1.0, &["m3", "m³"]),
            ("liter", Volume, 1e-3, &["l", "L", "litre"]),
            ("milliliter", Volume, 1e-6, &["ml", "mL", "millilitre"]),
            ("gallon", Volume, 3.785411784e-3, &["gal"]),
            ("quart", Volume, 9.46352946e-4, &["qt"]),
            ("pint", Volume, 4.73176473e-4, &["pt"]),
            ("fluid_ounce", Volume, 2.95735295625e-5, &["floz", "fl_oz"]),
            ("cubic_foot", Volume, 0.028316846592, &["ft3", "cubic_feet"]),
            ("square_meter", Area, 1.0, &["m2", "m²"]),
            ("square_kilometer", Area, 1e6, &["km2", "km²"]),
            ("square_foot", Area, 0.09290304, &["ft2", "square_feet"]),
            ("acre", Area, 4046.8564224, &["ac"]),
            ("hectare", Area, 1e4, &["ha"]),
            ("meter_per_second", Speed, 1.0, &["m/s", "mps"]),
            ("kilometer_per_hour", Speed, 1.0 / 3.6, &["km/h", "kph"]),
            ("mile_per_hour", Speed, 0.44704, &["mph"]),
            ("knot", Speed, 1852.0 / 3600.0, &["kn", "kt"]),
        ];

        for &(name, dimension, scale, aliases) in linear {
            registry.insert(Unit::linear(name, dimension, scale), aliases);
        }
        registry.insert(
            Unit::affine("celsius", Temperature, 1.0, 273.15),
            &["degC", "degree_Celsius"],
        );
        registry.insert(
            Unit::affine("fahrenheit", Temperature, 5.0 / 9.0, 273.15 - 32.0 * 5.0 / 9.0),
            &["degF", "degree_Fahrenheit"],
        );

        registry
    }

    /// Add a unit under its name and aliases; a name already taken is an error
    pub fn register(&mut self, unit: Unit, aliases: &[&str]) -> Result<()> {
        let taken = std::iter::once(unit.name.as_str())
            .chain(aliases.iter().copied())
            .find(|n| self.exact.contains_key(*n));
        if let Some(name) = taken {
            return Err(EtlError::Config {
                message: format!("unit name '{}' is already registered", name),
            });
        }
        self.insert(unit, aliases);
        Ok(())
    }

    fn insert(&mut self, unit: Unit, aliases: &[&str]) {
        let idx = self.units.len();
        self.folded.entry(unit.name.to_lowercase()).or_insert(idx);
        for name in std::iter::once(unit.name.as_str()).chain(aliases.iter().copied()) {
            self.exact.insert(name.to_string(), idx);
        }
        self.units.push(unit);
    }

    /// Look up a unit by name or alias
    pub fn get(&self, name: &str) -> Option<&Unit> {
        let name = name.trim();
        let folded = name.to_lowercase();
        self.exact
            .get(name)
            .or_else(|| self.folded.get(&folded))
            .or_else(|| {
                folded
                    .strip_suffix('s')
                    .filter(|s| !s.is_empty())
                    .and_then(|s| self.folded.get(s))
            })
            .map(|&idx| &self.units[idx])
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Resolve the conversion from one unit to another
    pub fn resolve(&self, from: &str, to: &str) -> Result<Conversion> {
        let unsupported = |reason: String| EtlError::UnsupportedConversion {
            from: from.to_string(),
            to: to.to_string(),
            reason,
        };
        let source = self
            .get(from)
            .ok_or_else(|| unsupported(format!("unknown unit '{}'", from)))?;
        let target = self
            .get(to)
            .ok_or_else(|| unsupported(format!("unknown unit '{}'", to)))?;

        if source.dimension != target.dimension {
            return Err(unsupported(format!(
                "{} is a {} unit but {} is a {} unit",
                source.name, source.dimension, target.name, target.dimension
            )));
        }

        let scale = source.scale / target.scale;
        if source.is_linear() && target.is_linear() {
            Ok(Conversion::Linear { factor: scale })
        } else {
            Ok(Conversion::Affine {
                scale,
                offset: (source.offset - target.offset) / target.scale,
            })
        }
    }
}

/// Source and target unit per column, with optional rounding of results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitConversions {
    /// Column name to `(from_unit, to_unit)`
    pub columns: IndexMap<String, (String, String)>,
    /// Decimal places kept in converted values
    pub precision: Option<u32>,
}

impl UnitConversions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a conversion for one column
    pub fn with(
        mut self,
        column: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        self.columns.insert(column.into(), (from.into(), to.into()));
        self
    }

    pub fn with_precision(mut self, decimals: u32) -> Self {
        self.precision = Some(decimals);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Convert the named columns between units.
///
/// Every conversion is resolved against the registry before any cell is
/// touched. Numeric cells become floats; null and text cells become null.
pub fn convert_units(
    mut table: Table,
    conversions: &UnitConversions,
    registry: &UnitRegistry,
) -> Result<Table> {
    if conversions.is_empty() {
        return Ok(table);
    }

    let mut plan = Vec::with_capacity(conversions.columns.len());
    for (column, (from, to)) in &conversions.columns {
        let conversion = registry.resolve(from, to)?;
        match table.column_index(column) {
            Some(idx) => plan.push((idx, conversion)),
            None => warn!(column = %column, "Unit conversion names a column that is not in the table"),
        }
    }

    for &(idx, conversion) in &plan {
        let mut nulled = 0usize;
        for row in &mut table.rows {
            let cell = &mut row.cells[idx];
            *cell = match cell.as_f64() {
                Some(v) => {
                    let converted = conversion.apply(v);
                    CellValue::Float(match conversions.precision {
                        Some(decimals) => round_to(converted, decimals),
                        None => converted,
                    })
                }
                None => {
                    if !cell.is_null() {
                        nulled += 1;
                    }
                    CellValue::Null
                }
            };
        }
        table.set_column_type(idx, ScalarType::Float);
        debug!(
            column = %table.columns[idx].name,
            ?conversion,
            nulled,
            "Converted column units"
        );
    }

    Ok(table)
}

/// Past this many places an f64 has no digits left to round.
const MAX_DECIMALS: u32 = 17;

fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals.min(MAX_DECIMALS) as i32);
    let scaled = value * scale;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn floats(table: &Table, column: &str) -> Vec<Option<f64>> {
        table
            .column_values(column)
            .unwrap()
            .into_iter()
            .map(CellValue::as_f64)
            .collect()
    }

    #[test]
    fn test_gram_to_pound_factor() {
        let registry = UnitRegistry::builtin();
        let factor = registry.resolve("gram", "pound").unwrap().factor().unwrap();
        assert!((factor - 0.00220462).abs() < 1e-8);
    }

    #[test]
    fn test_lookup_aliases_case_and_plurals() {
        let registry = UnitRegistry::builtin();
        assert_eq!(registry.get("in").unwrap().name, "inch");
        assert_eq!(registry.get("Meter").unwrap().name, "meter");
        assert_eq!(registry.get("meters").unwrap().name, "meter");
        assert_eq!(registry.get("Pounds").unwrap().name, "pound");
        assert_eq!(registry.get("L").unwrap().name, "liter");
        assert_eq!(registry.get("s").unwrap().name, "second");
        assert!(registry.get("furlong").is_none());
    }

    #[test]
    fn test_symbols_are_case_sensitive() {
        let registry = UnitRegistry::builtin();
        assert_eq!(registry.get("mg").unwrap().name, "milligram");
        assert_eq!(registry.get("K").unwrap().name, "kelvin");
        assert!(registry.get("Mg").is_none());
        assert!(registry.get("Mm").is_none());
        assert!(registry.get("k").is_none());

        for (from, to) in [("Mg", "kilogram"), ("Mm", "meter")] {
            let err = registry.resolve(from, to).unwrap_err();
            assert!(matches!(err, EtlError::UnsupportedConversion { .. }));
        }
    }

    #[test]
    fn test_dimension_mismatch_is_unsupported() {
        let registry = UnitRegistry::builtin();
        let err = registry.resolve("gram", "meter").unwrap_err();
        assert!(matches!(err, EtlError::UnsupportedConversion { .. }));
        let err = registry.resolve("gram", "smidgen").unwrap_err();
        assert!(err.to_string().contains("unknown unit 'smidgen'"));
    }

    #[test]
    fn test_temperature_is_affine() {
        let registry = UnitRegistry::builtin();
        let c_to_f = registry.resolve("celsius", "fahrenheit").unwrap();
        assert!(c_to_f.factor().is_none());
        assert_close(c_to_f.apply(100.0), 212.0);
        assert_close(c_to_f.apply(-40.0), -40.0);

        let f_to_k = registry.resolve("degF", "K").unwrap();
        assert_close(f_to_k.apply(32.0), 273.15);

        let k_to_r = registry.resolve("kelvin", "rankine").unwrap();
        assert_close(k_to_r.factor().unwrap(), 1.8);
    }

    #[test]
    fn test_register_rejects_taken_names() {
        let mut registry = UnitRegistry::new();
        registry
            .register(Unit::linear("cubit", Dimension::Length, 0.4572), &["cbt"])
            .unwrap();
        let err = registry
            .register(Unit::linear("span", Dimension::Length, 0.2286), &["cbt"])
            .unwrap_err();
        assert!(matches!(err, EtlError::Config { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_convert_inches_to_meters() {
        let table = Table::from_rows(
            &["height"],
            vec![vec![CellValue::Float(64.0)], vec![CellValue::Float(72.0)]],
        )
        .unwrap();
        let conversions = UnitConversions::new()
            .with("height", "inch", "meter")
            .with_precision(4);
        let converted = convert_units(table, &conversions, &UnitRegistry::builtin()).unwrap();
        assert_eq!(floats(&converted, "height"), vec![Some(1.6256), Some(1.8288)]);
        assert_eq!(
            converted.column("height").unwrap().data_type,
            ScalarType::Float
        );
    }

    #[test]
    fn test_rounding_never_overflows() {
        let table = Table::from_rows(
            &["length"],
            vec![vec![CellValue::Float(64.0)], vec![CellValue::Float(1e300)]],
        )
        .unwrap();
        let registry = UnitRegistry::builtin();

        for decimals in [10, 400, u32::MAX] {
            let conversions = UnitConversions::new()
                .with("length", "inch", "inch")
                .with_precision(decimals);
            let converted = convert_units(table.clone(), &conversions, &registry).unwrap();
            assert_eq!(
                floats(&converted, "length"),
                vec![Some(64.0), Some(1e300)],
                "precision {decimals}"
            );
        }

        assert_eq!(round_to(1.23456, 2), 1.23);
    }

    #[test]
    fn test_non_numeric_and_null_become_null() {
        let table = Table::from_rows(
            &["weight", "name"],
            vec![
                vec![CellValue::Int(2), CellValue::from("a")],
                vec![CellValue::from("heavy"), CellValue::from("b")],
                vec![CellValue::Null, CellValue::from("c")],
            ],
        )
        .unwrap();
        let conversions = UnitConversions::new().with("weight", "pound", "kilogram");
        let converted = convert_units(table, &conversions, &UnitRegistry::builtin()).unwrap();
        let weights = floats(&converted, "weight");
        assert_close(weights[0].unwrap(), 0.90718474);
        assert_eq!(&weights[1..], &[None, None]);
        assert_eq!(converted.rows[1].cells[1], CellValue::from("b"));
    }

    #[test]
    fn test_bad_conversion_fails_before_touching_rows() {
        let table = Table::from_rows(&["a", "b"], vec![vec![CellValue::Int(1), CellValue::Int(2)]])
            .unwrap();
        let conversions = UnitConversions::new()
            .with("a", "inch", "meter")
            .with("b", "gram", "meter");
        let err = convert_units(table, &conversions, &UnitRegistry::builtin()).unwrap_err();
        assert!(matches!(err, EtlError::UnsupportedConversion { .. }));
    }

    #[test]
    fn test_empty_conversions_is_identity() {
        let table = Table::from_rows(&["a"], vec![vec![CellValue::from("x")]]).unwrap();
        let converted =
            convert_units(table.clone(), &UnitConversions::new(), &UnitRegistry::builtin())
                .unwrap();
        assert_eq!(converted, table);
    }
}
