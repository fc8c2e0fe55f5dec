//! Type coercion: raw text tables to typed tables.
//!
//! Each declared column is cast according to its [`ColumnSpec`]:
//!
//! - a *missing* raw value (absent, or one of the table's null tokens) takes
//!   the column default when one is configured, NULL otherwise
//! - a present value that does not parse fails the load for strict columns and
//!   becomes NULL for tolerant ones; it never falls back to the default
//! - boolean columns never fail and never hold NULL
//!
//! Derived columns are then computed once per row as
//! `COALESCE(explicit_value, expr)` over the declared columns.

pub mod cast;

pub use cast::{cast_value, parse_bool, DEFAULT_DATE_FORMAT, TRUE_TOKENS};

use thiserror::Error;

use crate::model::{
    BoundExpr, CastMode, ColumnSpec, DataType, ExprError, RawTable, TableSchema, TypedTable,
    Value,
};

/// Errors raised while coercing a raw table.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoerceError {
    #[error("type mismatch in {table}.{column} at row {row}: '{value}' is not a valid {expected}")]
    TypeMismatch {
        table: String,
        column: String,
        /// 1-based data row (the header is not counted).
        row: usize,
        value: String,
        expected: DataType,
    },

    #[error("table '{table}' has no column '{column}' and it has no default")]
    MissingColumn { table: String, column: String },

    #[error("default '{value}' of {table}.{column} is not a valid {expected}")]
    InvalidDefault {
        table: String,
        column: String,
        value: String,
        expected: DataType,
    },

    #[error("column '{column}' is declared more than once in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("derived column {table}.{column}: {source}")]
    InvalidDerived {
        table: String,
        column: String,
        #[source]
        source: ExprError,
    },

    #[error("derived column {table}.{column} is declared {declared} but its formula yields {inferred}")]
    DerivedType {
        table: String,
        column: String,
        declared: DataType,
        inferred: DataType,
    },
}

pub type CoerceResult<T> = Result<T, CoerceError>;

/// Counters reported alongside a coerced table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoerceStats {
    pub rows: usize,
    /// Present values a tolerant column could not cast.
    pub invalid_values: usize,
    /// Missing values replaced by a column default.
    pub defaults_applied: usize,
    /// Derived values computed from the formula rather than read from input.
    pub derived_computed: usize,
}

/// Coerce `raw` into a typed table described by `schema`.
pub fn coerce_table(raw: &RawTable, schema: &TableSchema) -> CoerceResult<TypedTable> {
    coerce_table_with_stats(raw, schema).map(|(table, _)| table)
}

/// Like [`coerce_table`], also returning substitution counters.
pub fn coerce_table_with_stats(
    raw: &RawTable,
    schema: &TableSchema,
) -> CoerceResult<(TypedTable, CoerceStats)> {
    let columns = plan_columns(raw, schema)?;
    let derived = plan_derived(raw, schema)?;

    let mut table = TypedTable::new(&raw.name, schema.output_columns());
    table.rows.reserve(raw.num_rows());
    let mut stats = CoerceStats {
        rows: raw.num_rows(),
        ..CoerceStats::default()
    };

    for row in 0..raw.num_rows() {
        let mut values = Vec::with_capacity(columns.len() + derived.len());

        for plan in &columns {
            let field = plan.source.and_then(|i| raw.field(row, i));
            values.push(plan.cast(&raw.name, schema, field, row, &mut stats)?);
        }

        for plan in &derived {
            let explicit = plan
                .source
                .and_then(|i| raw.field(row, i))
                .filter(|f| !schema.is_null_token(f))
                .and_then(|f| cast_value(f, plan.data_type, None));
            let value = match explicit {
                Some(v) => v,
                None => {
                    stats.derived_computed += 1;
                    plan.expr.evaluate(&values[..columns.len()])
                }
            };
            values.push(value);
        }

        table.rows.push(values);
    }

    Ok((table, stats))
}

// ============================================================================
// Column plans
// ============================================================================

struct ColumnPlan<'a> {
    spec: &'a ColumnSpec,
    source: Option<usize>,
    default: Option<Value>,
}

impl ColumnPlan<'_> {
    fn cast(
        &self,
        table: &str,
        schema: &TableSchema,
        field: Option<&str>,
        row: usize,
        stats: &mut CoerceStats,
    ) -> CoerceResult<Value> {
        let spec = self.spec;
        let present = field.filter(|f| !schema.is_null_token(f));

        if spec.data_type == DataType::Bool {
            return Ok(match (present, &self.default) {
                (None, Some(default)) => {
                    stats.defaults_applied += 1;
                    default.clone()
                }
                _ => Value::Bool(parse_bool(present)),
            });
        }

        let Some(raw) = present else {
            return Ok(match &self.default {
                Some(default) => {
                    stats.defaults_applied += 1;
                    default.clone()
                }
                None => Value::Null,
            });
        };

        match cast_value(raw, spec.data_type, spec.format.as_deref()) {
            Some(value) => Ok(value),
            None => match spec.cast {
                CastMode::Strict => Err(CoerceError::TypeMismatch {
                    table: table.to_string(),
                    column: spec.name.clone(),
                    row: row + 1,
                    value: raw.to_string(),
                    expected: spec.data_type,
                }),
                CastMode::Tolerant => {
                    stats.invalid_values += 1;
                    Ok(Value::Null)
                }
            },
        }
    }
}

/// Check a schema on its own: unique names, valid defaults and well-typed
/// derived formulas. Run by every load, and by configuration validation
/// before any data is read.
pub fn check_schema(table: &str, schema: &TableSchema) -> CoerceResult<()> {
    check_unique(table, schema)?;
    for spec in &schema.columns {
        parse_default(table, spec)?;
    }
    bind_derived(table, schema)?;
    Ok(())
}

fn check_unique(table: &str, schema: &TableSchema) -> CoerceResult<()> {
    let mut seen: Vec<&str> = Vec::new();
    let names = schema
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .chain(schema.derived.iter().map(|d| d.name.as_str()));
    for name in names {
        if seen.contains(&name) {
            return Err(CoerceError::DuplicateColumn {
                table: table.to_string(),
                column: name.to_string(),
            });
        }
        seen.push(name);
    }
    Ok(())
}

fn parse_default(table: &str, spec: &ColumnSpec) -> CoerceResult<Option<Value>> {
    spec.default
        .as_ref()
        .map(|literal| {
            cast_value(literal, spec.data_type, spec.format.as_deref()).ok_or_else(|| {
                CoerceError::InvalidDefault {
                    table: table.to_string(),
                    column: spec.name.clone(),
                    value: literal.clone(),
                    expected: spec.data_type,
                }
            })
        })
        .transpose()
}

fn plan_columns<'a>(raw: &RawTable, schema: &'a TableSchema) -> CoerceResult<Vec<ColumnPlan<'a>>> {
    check_unique(&raw.name, schema)?;

    let mut plans = Vec::with_capacity(schema.columns.len());
    for spec in &schema.columns {
        let default = parse_default(&raw.name, spec)?;

        let source = raw.header_index(spec.source_name());
        if source.is_none()
            && default.is_none()
            && spec.cast == CastMode::Strict
            && spec.data_type != DataType::Bool
        {
            return Err(CoerceError::MissingColumn {
                table: raw.name.clone(),
                column: spec.source_name().to_string(),
            });
        }

        plans.push(ColumnPlan {
            spec,
            source,
            default,
        });
    }

    Ok(plans)
}

struct DerivedPlan {
    source: Option<usize>,
    data_type: DataType,
    expr: BoundExpr,
}

fn bind_derived(table: &str, schema: &TableSchema) -> CoerceResult<Vec<BoundExpr>> {
    let declared: Vec<_> = schema
        .output_columns()
        .into_iter()
        .take(schema.columns.len())
        .collect();

    schema
        .derived
        .iter()
        .map(|d| {
            let expr = d
                .expr
                .bind(&declared)
                .map_err(|source| CoerceError::InvalidDerived {
                    table: table.to_string(),
                    column: d.name.clone(),
                    source,
                })?;

            let inferred = expr.data_type();
            if !d.data_type.is_numeric() || (d.data_type == DataType::Int && inferred == DataType::Float) {
                return Err(CoerceError::DerivedType {
                    table: table.to_string(),
                    column: d.name.clone(),
                    declared: d.data_type,
                    inferred,
                });
            }
            Ok(expr)
        })
        .collect()
}

fn plan_derived(raw: &RawTable, schema: &TableSchema) -> CoerceResult<Vec<DerivedPlan>> {
    let bound = bind_derived(&raw.name, schema)?;
    Ok(schema
        .derived
        .iter()
        .zip(bound)
        .map(|(d, expr)| DerivedPlan {
            source: raw.header_index(&d.name),
            data_type: d.data_type,
            expr,
        })
        .collect())
}
