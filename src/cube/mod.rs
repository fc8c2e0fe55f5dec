//! N-dimensional cube aggregation over a denormalized row-set.
//!
//! # Overview
//!
//! ```text
//! CubeSpec ──bind(JoinedSchema)──► Cube ──compute(rows)──► CubeResult
//!                                    │
//!                                    ├─ grouping::GroupingSet   2^N subsets
//!                                    ├─ engine                  one scan, all sets
//!                                    └─ order                   union + canonical sort
//! ```
//!
//! Binding resolves every attribute and measure name against the joined
//! schema, so configuration errors surface before any row is aggregated.

pub mod accumulator;
mod engine;
pub mod grouping;
pub mod order;

pub use accumulator::{Accumulator, AggregateFunction};
pub use grouping::{GroupKey, GroupingSet, KeySlot, MAX_GROUPING_ATTRIBUTES};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::join::{DenormalizedRow, DimensionLink, JoinError, JoinedSchema, LookupError, StarJoin};
use crate::model::{DataType, TypedTable, Value};

/// Input name accepted by `COUNT` to count rows.
pub const COUNT_STAR: &str = "*";

/// Configuration errors raised while binding a cube request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CubeError {
    #[error("grouping attribute: {0}")]
    Attribute(#[source] LookupError),

    #[error("measure {measure}: {source}")]
    Measure {
        measure: String,
        #[source]
        source: LookupError,
    },

    #[error("{function} is not defined for {data_type} column '{column}'")]
    UnsupportedAggregate {
        function: AggregateFunction,
        column: String,
        data_type: DataType,
    },

    #[error("'*' is only valid as the input of count, not {0}")]
    StarInput(AggregateFunction),

    #[error("grouping attribute '{0}' is listed more than once")]
    DuplicateAttribute(String),

    #[error("measure label '{0}' is used more than once")]
    DuplicateMeasure(String),

    #[error("{count} grouping attributes requested, at most {max} are supported")]
    TooManyAttributes { count: usize, max: usize },
}

/// Errors from the one-shot [`compute_cube`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComputeError {
    #[error(transparent)]
    Join(#[from] JoinError),

    #[error(transparent)]
    Cube(#[from] CubeError),
}

// ============================================================================
// Request
// ============================================================================

/// One aggregate over one input column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureSpec {
    pub function: AggregateFunction,

    /// Input column, qualified or bare; `*` for `COUNT(*)`.
    #[serde(default = "count_star")]
    pub column: String,

    /// Output label; defaults to `<function>_<column>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

fn count_star() -> String {
    COUNT_STAR.to_string()
}

impl MeasureSpec {
    pub fn new(function: AggregateFunction, column: impl Into<String>) -> Self {
        Self {
            function,
            column: column.into(),
            alias: None,
        }
    }

    pub fn sum(column: impl Into<String>) -> Self {
        Self::new(AggregateFunction::Sum, column)
    }

    pub fn count(column: impl Into<String>) -> Self {
        Self::new(AggregateFunction::Count, column)
    }

    pub fn count_rows() -> Self {
        Self::new(AggregateFunction::Count, COUNT_STAR)
    }

    pub fn avg(column: impl Into<String>) -> Self {
        Self::new(AggregateFunction::Avg, column)
    }

    pub fn min(column: impl Into<String>) -> Self {
        Self::new(AggregateFunction::Min, column)
    }

    pub fn max(column: impl Into<String>) -> Self {
        Self::new(AggregateFunction::Max, column)
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn is_count_star(&self) -> bool {
        self.column == COUNT_STAR
    }

    /// Output column label.
    pub fn label(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        if self.is_count_star() {
            return self.function.to_string();
        }
        format!("{}_{}", self.function, self.column.replace('.', "_"))
    }
}

/// Grouping attributes and measures of one cube.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CubeSpec {
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub measures: Vec<MeasureSpec>,
}

impl CubeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_by(mut self, attribute: impl Into<String>) -> Self {
        self.group_by.push(attribute.into());
        self
    }

    pub fn measure(mut self, measure: MeasureSpec) -> Self {
        self.measures.push(measure);
        self
    }
}

/// Engine tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubeOptions {
    /// Fold row partitions on the rayon pool.
    pub parallel: bool,
    /// Rows per partition; inputs no larger than this are folded sequentially.
    pub partition_rows: usize,
}

impl Default for CubeOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            partition_rows: 65_536,
        }
    }
}

impl CubeOptions {
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Number of partitions `rows` input rows are folded in.
    pub fn partitions(&self, rows: usize) -> usize {
        if !self.parallel || self.partition_rows == 0 || rows <= self.partition_rows {
            1
        } else {
            rows.div_ceil(self.partition_rows)
        }
    }
}

// ============================================================================
// Bound cube
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) struct BoundMeasure {
    pub(crate) input: Option<usize>,
    function: AggregateFunction,
    input_type: Option<DataType>,
    label: String,
}

/// A cube request resolved against a joined schema.
#[derive(Debug, Clone)]
pub struct Cube {
    attribute_names: Vec<String>,
    pub(crate) attributes: Vec<usize>,
    pub(crate) measures: Vec<BoundMeasure>,
    pub(crate) sets: Vec<GroupingSet>,
}

impl Cube {
    /// Resolve `spec` against `schema`, failing before any aggregation.
    pub fn bind(schema: &JoinedSchema, spec: &CubeSpec) -> Result<Cube, CubeError> {
        if spec.group_by.len() > MAX_GROUPING_ATTRIBUTES {
            return Err(CubeError::TooManyAttributes {
                count: spec.group_by.len(),
                max: MAX_GROUPING_ATTRIBUTES,
            });
        }

        let mut attributes = Vec::with_capacity(spec.group_by.len());
        for name in &spec.group_by {
            let index = schema.lookup(name).map_err(CubeError::Attribute)?;
            if attributes.contains(&index) {
                return Err(CubeError::DuplicateAttribute(name.clone()));
            }
            attributes.push(index);
        }

        let mut measures: Vec<BoundMeasure> = Vec::with_capacity(spec.measures.len());
        for measure in &spec.measures {
            let label = measure.label();
            if measures.iter().any(|m| m.label == label) {
                return Err(CubeError::DuplicateMeasure(label));
            }

            let (input, input_type) = if measure.is_count_star() {
                if measure.function != AggregateFunction::Count {
                    return Err(CubeError::StarInput(measure.function));
                }
                (None, None)
            } else {
                let index = schema
                    .lookup(&measure.column)
                    .map_err(|source| CubeError::Measure {
                        measure: label.clone(),
                        source,
                    })?;
                let column = schema.column(index);
                if !measure.function.accepts(column.data_type) {
                    return Err(CubeError::UnsupportedAggregate {
                        function: measure.function,
                        column: column.name.clone(),
                        data_type: column.data_type,
                    });
                }
                (Some(index), Some(column.data_type))
            };

            measures.push(BoundMeasure {
                input,
                function: measure.function,
                input_type,
                label,
            });
        }

        Ok(Cube {
            attribute_names: attributes
                .iter()
                .map(|i| schema.column(*i).name.clone())
                .collect(),
            sets: GroupingSet::enumerate(attributes.len()).collect(),
            attributes,
            measures,
        })
    }

    /// Qualified names of the grouping attributes, in request order.
    pub fn attribute_names(&self) -> &[String] {
        &self.attribute_names
    }

    pub fn measure_labels(&self) -> Vec<String> {
        self.measures.iter().map(|m| m.label.clone()).collect()
    }

    /// Result type of each measure.
    pub fn measure_types(&self) -> Vec<DataType> {
        self.measures
            .iter()
            .map(|m| m.function.output_type(m.input_type))
            .collect()
    }

    pub fn grouping_sets(&self) -> &[GroupingSet] {
        &self.sets
    }

    pub(crate) fn new_accumulators(&self) -> Vec<Accumulator> {
        self.measures
            .iter()
            .map(|m| Accumulator::new(m.function, m.input_type))
            .collect()
    }

    /// Aggregate `rows` for every grouping set and return them in canonical order.
    pub fn compute(&self, rows: &[DenormalizedRow], options: &CubeOptions) -> CubeResult {
        let state = engine::accumulate(self, rows, options);
        CubeResult {
            attributes: self.attribute_names.clone(),
            measures: self.measure_labels(),
            rows: order::union_sets(state.finish(&self.sets)),
        }
    }
}

// ============================================================================
// Result
// ============================================================================

/// One output row: a group key and one value per measure.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeRow {
    pub key: GroupKey,
    pub set: GroupingSet,
    pub values: Vec<Value>,
}

impl CubeRow {
    /// SQL `GROUPING(a1, .., an)` for this row.
    pub fn grouping_id(&self) -> u32 {
        self.set.grouping_id(self.key.0.len())
    }
}

/// The ordered cube relation.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeResult {
    pub attributes: Vec<String>,
    pub measures: Vec<String>,
    pub rows: Vec<CubeRow>,
}

impl CubeResult {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Row with exactly this key.
    pub fn find(&self, key: &[KeySlot]) -> Option<&CubeRow> {
        self.rows
            .binary_search_by(|row| row.key.0.as_slice().cmp(key))
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn measure_index(&self, label: &str) -> Option<usize> {
        self.measures.iter().position(|m| m == label)
    }

    /// Value of measure `label` for the row with `key`.
    pub fn value(&self, key: &[KeySlot], label: &str) -> Option<&Value> {
        let index = self.measure_index(label)?;
        self.find(key).map(|row| &row.values[index])
    }

    /// Rows of one grouping set, in canonical order.
    pub fn rows_in(&self, set: GroupingSet) -> impl Iterator<Item = &CubeRow> {
        self.rows.iter().filter(move |row| row.set == set)
    }

    /// The all-ALL row; always present.
    pub fn grand_total(&self) -> Option<&CubeRow> {
        self.find(&GroupKey::all(self.attributes.len()).0)
    }
}

/// Join `fact` to `dimensions` and compute the cube of `group_by` × `measures`.
///
/// Names are resolved before the join runs, so an unknown attribute or
/// measure fails without touching the data.
pub fn compute_cube(
    fact: &TypedTable,
    dimensions: &[(&TypedTable, DimensionLink)],
    group_by: &[&str],
    measures: &[MeasureSpec],
    options: &CubeOptions,
) -> Result<CubeResult, ComputeError> {
    let join = dimensions
        .iter()
        .fold(StarJoin::new(fact), |join, (table, link)| {
            join.with_dimension(table, link.clone())
        });
    let plan = join.plan()?;

    let spec = CubeSpec {
        group_by: group_by.iter().map(|s| s.to_string()).collect(),
        measures: measures.to_vec(),
    };
    let cube = Cube::bind(&plan.schema, &spec)?;

    let (table, _) = join.execute_plan(plan)?;
    Ok(cube.compute(&table.rows, options))
}
