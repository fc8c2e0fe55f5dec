//! Table schemas: typed columns with their cast rules, and derived columns.

use serde::{Deserialize, Serialize};

use super::expr::Expr;
use super::table::TypedColumn;
use super::types::{CastMode, DataType};

fn default_null_tokens() -> Vec<String> {
    ["", "NA", "N/A", "NULL", "null", "NaN", "nan", "None"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Schema of one table: how each raw column is cast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Declared columns, in output order.
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,

    /// Measures computed from other columns when not present in the input.
    #[serde(default)]
    pub derived: Vec<DerivedColumn>,

    /// Raw text (after trimming) treated as a missing value.
    #[serde(default = "default_null_tokens")]
    pub null_tokens: Vec<String>,
}

impl Default for TableSchema {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            derived: Vec::new(),
            null_tokens: default_null_tokens(),
        }
    }
}

impl TableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_derived(mut self, derived: DerivedColumn) -> Self {
        self.derived.push(derived);
        self
    }

    /// The typed columns a coerced table will carry: declared then derived.
    pub fn output_columns(&self) -> Vec<TypedColumn> {
        self.columns
            .iter()
            .map(|c| TypedColumn::new(&c.name, c.data_type))
            .chain(
                self.derived
                    .iter()
                    .map(|d| TypedColumn::new(&d.name, d.data_type)),
            )
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_null_token(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        self.null_tokens.iter().any(|t| t == trimmed)
    }
}

/// A declared column and its cast rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,

    #[serde(rename = "type")]
    pub data_type: DataType,

    /// Strict columns fail the load on a bad value; tolerant ones store NULL.
    #[serde(default)]
    pub cast: CastMode,

    /// Literal used when the raw value is missing (e.g. `"0"` for discount).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// chrono format for date columns (defaults to `%Y-%m-%d`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Raw header to read, when it differs from `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            cast: CastMode::default(),
            default: None,
            format: None,
            source: None,
        }
    }

    pub fn strict(mut self) -> Self {
        self.cast = CastMode::Strict;
        self
    }

    pub fn tolerant(mut self) -> Self {
        self.cast = CastMode::Tolerant;
        self
    }

    pub fn with_default(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(literal.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_source(mut self, header: impl Into<String>) -> Self {
        self.source = Some(header.into());
        self
    }

    /// Header name looked up in the raw table.
    pub fn source_name(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }
}

/// A measure computed as `COALESCE(explicit_value, expr)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedColumn {
    pub name: String,

    #[serde(rename = "type", default = "DerivedColumn::default_type")]
    pub data_type: DataType,

    pub expr: Expr,
}

impl DerivedColumn {
    fn default_type() -> DataType {
        DataType::Float
    }

    pub fn new(name: impl Into<String>, data_type: DataType, expr: Expr) -> Self {
        Self {
            name: name.into(),
            data_type,
            expr,
        }
    }
}
