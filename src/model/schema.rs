//! Column metadata and scalar types

use serde::{Deserialize, Serialize};

/// Target type of a column cast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    #[default]
    #[serde(alias = "str", alias = "string", alias = "utf8")]
    Text,
    #[serde(alias = "int", alias = "i64")]
    Integer,
    #[serde(alias = "double", alias = "f64")]
    Float,
}

impl std::str::FromStr for ScalarType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "str" | "string" | "utf8" => Ok(ScalarType::Text),
            "integer" | "int" | "i64" => Ok(ScalarType::Integer),
            "float" | "double" | "f64" => Ok(ScalarType::Float),
            _ => Err(format!("Unknown scalar type: {}", s)),
        }
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarType::Text => write!(f, "text"),
            ScalarType::Integer => write!(f, "integer"),
            ScalarType::Float => write!(f, "float"),
        }
    }
}

/// Column metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared type of the values in this column
    pub data_type: ScalarType,
}

impl Column {
    /// Create a text column
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: ScalarType::Text,
        }
    }
}
