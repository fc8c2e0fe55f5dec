//! Aggregate functions and their mergeable accumulators.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{DataType, Value};

/// Distributive and algebraic aggregates supported by the cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Sum,
    Count,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sum" => Some(Self::Sum),
            "count" => Some(Self::Count),
            "avg" | "mean" => Some(Self::Avg),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Count => "count",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Whether the function is defined over a column of `data_type`.
    pub fn accepts(&self, data_type: DataType) -> bool {
        match self {
            Self::Sum | Self::Avg => data_type.is_numeric(),
            Self::Count | Self::Min | Self::Max => true,
        }
    }

    /// Result type for an input column of `input` (`None` for `COUNT(*)`).
    pub fn output_type(&self, input: Option<DataType>) -> DataType {
        match (self, input) {
            (Self::Count, _) => DataType::Int,
            (Self::Avg, _) => DataType::Float,
            (_, Some(t)) => t,
            (_, None) => DataType::Int,
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial state of one aggregate for one group.
///
/// Every variant merges associatively, so partitions can be folded
/// independently and combined afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Integer sum, widened so intermediate totals cannot overflow.
    IntSum(i128),
    FloatSum(f64),
    /// Rows seen, NULL measures included.
    Count(u64),
    Avg { sum: f64, count: u64 },
    Min(Option<Value>),
    Max(Option<Value>),
}

impl Accumulator {
    pub fn new(function: AggregateFunction, input: Option<DataType>) -> Self {
        match function {
            AggregateFunction::Sum if input == Some(DataType::Float) => Accumulator::FloatSum(0.0),
            AggregateFunction::Sum => Accumulator::IntSum(0),
            AggregateFunction::Count => Accumulator::Count(0),
            AggregateFunction::Avg => Accumulator::Avg { sum: 0.0, count: 0 },
            AggregateFunction::Min => Accumulator::Min(None),
            AggregateFunction::Max => Accumulator::Max(None),
        }
    }

    /// Fold one input value. NULL is ignored by everything except COUNT.
    pub fn update(&mut self, value: &Value) {
        match self {
            Accumulator::Count(n) => *n += 1,
            _ if value.is_null() => {}
            Accumulator::IntSum(sum) => match value {
                Value::Int(i) => *sum += i128::from(*i),
                Value::Bool(b) => *sum += i128::from(*b),
                _ => {}
            },
            Accumulator::FloatSum(sum) => {
                if let Some(f) = value.as_f64() {
                    *sum += f;
                }
            }
            Accumulator::Avg { sum, count } => {
                if let Some(f) = value.as_f64() {
                    *sum += f;
                    *count += 1;
                }
            }
            Accumulator::Min(current) => {
                if current.as_ref().map_or(true, |c| value < c) {
                    *current = Some(value.clone());
                }
            }
            Accumulator::Max(current) => {
                if current.as_ref().map_or(true, |c| value > c) {
                    *current = Some(value.clone());
                }
            }
        }
    }

    /// Combine the state of another partition into this one.
    pub fn merge(&mut self, other: &Accumulator) {
        match (self, other) {
            (Accumulator::IntSum(a), Accumulator::IntSum(b)) => *a += *b,
            (Accumulator::FloatSum(a), Accumulator::FloatSum(b)) => *a += *b,
            (Accumulator::Count(a), Accumulator::Count(b)) => *a += *b,
            (
                Accumulator::Avg { sum, count },
                Accumulator::Avg {
                    sum: other_sum,
                    count: other_count,
                },
            ) => {
                *sum += *other_sum;
                *count += *other_count;
            }
            (Accumulator::Min(a), Accumulator::Min(Some(b))) => {
                if a.as_ref().map_or(true, |a| b < a) {
                    *a = Some(b.clone());
                }
            }
            (Accumulator::Max(a), Accumulator::Max(Some(b))) => {
                if a.as_ref().map_or(true, |a| b > a) {
                    *a = Some(b.clone());
                }
            }
            // An empty MIN/MAX partition contributes nothing; accumulators of
            // the same measure always share a variant.
            _ => {}
        }
    }

    /// The aggregate value. Empty SUM is 0; empty AVG, MIN and MAX are NULL.
    /// A float SUM or AVG that overflows is NULL.
    pub fn finish(&self) -> Value {
        match self {
            Accumulator::IntSum(sum) => match i64::try_from(*sum) {
                Ok(i) => Value::Int(i),
                Err(_) => Value::Float(*sum as f64),
            },
            Accumulator::FloatSum(sum) => finite(*sum),
            Accumulator::Count(n) => Value::Int(i64::try_from(*n).unwrap_or(i64::MAX)),
            Accumulator::Avg { count: 0, .. } => Value::Null,
            Accumulator::Avg { sum, count } => finite(*sum / *count as f64),
            Accumulator::Min(v) | Accumulator::Max(v) => v.clone().unwrap_or(Value::Null),
        }
    }
}

fn finite(f: f64) -> Value {
    if f.is_finite() {
        Value::float(f)
    } else {
        Value::Null
    }
}
