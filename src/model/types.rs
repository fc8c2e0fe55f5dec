//! Declared column types and cast rules.

use serde::{Deserialize, Serialize};

/// Semantic type of a typed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[serde(alias = "integer", alias = "bigint")]
    Int,
    #[serde(alias = "double", alias = "decimal", alias = "numeric")]
    Float,
    #[serde(alias = "string", alias = "varchar")]
    Text,
    Date,
    #[serde(alias = "boolean")]
    Bool,
}

impl DataType {
    /// Parse a data type from a string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "int" | "integer" | "bigint" => Some(DataType::Int),
            "float" | "double" | "decimal" | "numeric" => Some(DataType::Float),
            "text" | "string" | "varchar" => Some(DataType::Text),
            "date" => Some(DataType::Date),
            "bool" | "boolean" => Some(DataType::Bool),
            _ => None,
        }
    }

    /// Whether values of this type can be summed and averaged.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int | DataType::Float)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Text => "text",
            DataType::Date => "date",
            DataType::Bool => "bool",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens when a present raw value does not parse as the declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastMode {
    /// Fail the whole load.
    Strict,
    /// Substitute NULL and continue.
    #[default]
    Tolerant,
}
