//! Star join: the fact table left-joined to each dimension table.
//!
//! Every fact row is kept. Each dimension is resolved independently through a
//! hash index on its key, built once per dimension, so the join is O(F + D).
//! A NULL or unmatched foreign key leaves that dimension's attributes NULL
//! without affecting the other dimensions of the row.
//!
//! Output columns are qualified: fact columns as `<fact>.<column>` and
//! dimension columns as `<alias>.<column>`, where the alias defaults to the
//! dimension table name. [`JoinedSchema::lookup`] also accepts a bare column
//! name when it is unambiguous.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{DataType, TypedColumn, TypedTable, Value};

/// Errors raised while planning or executing a star join.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum JoinError {
    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },

    #[error("foreign key {fact}.{foreign_key} ({fact_type}) does not match key {dimension}.{key} ({key_type})")]
    KeyTypeMismatch {
        fact: String,
        foreign_key: String,
        fact_type: DataType,
        dimension: String,
        key: String,
        key_type: DataType,
    },

    #[error("dimension alias '{0}' is used more than once")]
    DuplicateAlias(String),

    #[error("dimension '{table}' has duplicate key {key}")]
    DuplicateKey { table: String, key: String },
}

pub type JoinResult<T> = Result<T, JoinError>;

/// Errors raised when a column name does not resolve against a joined schema.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LookupError {
    #[error("unknown column '{0}'")]
    Unknown(String),

    #[error("column '{name}' is ambiguous, candidates: {}", .candidates.join(", "))]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },
}

// ============================================================================
// Schema
// ============================================================================

/// How a dimension table hangs off the fact table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionLink {
    /// Dimension table name.
    pub table: String,

    /// Key column of the dimension table.
    pub key: String,

    /// Column of the fact table referencing `key`.
    pub foreign_key: String,

    /// Prefix for the dimension's columns (defaults to the table name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl DimensionLink {
    pub fn new(
        table: impl Into<String>,
        key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            foreign_key: foreign_key.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }
}

/// A column of the denormalized row-set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedColumn {
    /// Qualified name, `<relation>.<column>`.
    pub name: String,
    /// Fact table name or dimension alias.
    pub relation: String,
    pub column: String,
    pub data_type: DataType,
}

/// Column layout of the denormalized row-set; known before any data is joined.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JoinedSchema {
    pub columns: Vec<JoinedColumn>,
}

impl JoinedSchema {
    fn push_relation(&mut self, relation: &str, columns: &[TypedColumn]) {
        self.columns.extend(columns.iter().map(|c| JoinedColumn {
            name: format!("{}.{}", relation, c.name),
            relation: relation.to_string(),
            column: c.name.clone(),
            data_type: c.data_type,
        }));
    }

    /// Resolve a qualified or unambiguous bare column name to its position.
    pub fn lookup(&self, name: &str) -> Result<usize, LookupError> {
        if let Some(index) = self.columns.iter().position(|c| c.name == name) {
            return Ok(index);
        }

        let matches: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.column == name)
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [] => Err(LookupError::Unknown(name.to_string())),
            [index] => Ok(*index),
            _ => Err(LookupError::Ambiguous {
                name: name.to_string(),
                candidates: matches
                    .iter()
                    .map(|i| self.columns[*i].name.clone())
                    .collect(),
            }),
        }
    }

    pub fn column(&self, index: usize) -> &JoinedColumn {
        &self.columns[index]
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A validated join layout: output schema plus key positions.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPlan {
    pub schema: JoinedSchema,
    /// Per dimension: (foreign key position in the fact, key position in the dimension).
    key_positions: Vec<(usize, usize)>,
}

/// Check the links against the table columns and lay out the joined schema.
///
/// Works on column lists only, so a star schema can be validated before any
/// data is loaded.
pub fn plan_join(
    fact_name: &str,
    fact_columns: &[TypedColumn],
    dimensions: &[(&DimensionLink, &[TypedColumn])],
) -> JoinResult<JoinPlan> {
    let mut schema = JoinedSchema::default();
    schema.push_relation(fact_name, fact_columns);

    let mut aliases: Vec<&str> = vec![fact_name];
    let mut key_positions = Vec::with_capacity(dimensions.len());

    for (link, columns) in dimensions {
        let alias = link.alias();
        if aliases.contains(&alias) {
            return Err(JoinError::DuplicateAlias(alias.to_string()));
        }
        aliases.push(alias);

        let fk = fact_columns
            .iter()
            .position(|c| c.name == link.foreign_key)
            .ok_or_else(|| JoinError::UnknownColumn {
                table: fact_name.to_string(),
                column: link.foreign_key.clone(),
            })?;
        let key = columns
            .iter()
            .position(|c| c.name == link.key)
            .ok_or_else(|| JoinError::UnknownColumn {
                table: link.table.clone(),
                column: link.key.clone(),
            })?;

        let fact_type = fact_columns[fk].data_type;
        let key_type = columns[key].data_type;
        if fact_type != key_type {
            return Err(JoinError::KeyTypeMismatch {
                fact: fact_name.to_string(),
                foreign_key: link.foreign_key.clone(),
                fact_type,
                dimension: link.table.clone(),
                key: link.key.clone(),
                key_type,
            });
        }

        key_positions.push((fk, key));
        schema.push_relation(alias, columns);
    }

    Ok(JoinPlan {
        schema,
        key_positions,
    })
}

// ============================================================================
// Execution
// ============================================================================

/// One fact row with its dimension attributes appended.
pub type DenormalizedRow = Vec<Value>;

/// The star join output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DenormalizedTable {
    pub schema: JoinedSchema,
    pub rows: Vec<DenormalizedRow>,
}

impl DenormalizedTable {
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

/// Resolution counters for one dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionStats {
    pub alias: String,
    pub dimension_rows: usize,
    /// Fact rows whose foreign key was NULL.
    pub null_keys: usize,
    /// Fact rows whose non-null foreign key matched no dimension row.
    pub unmatched_keys: usize,
}

/// Counters reported alongside a join.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JoinStats {
    pub fact_rows: usize,
    pub dimensions: Vec<DimensionStats>,
}

/// A fact table and the dimensions to join onto it.
#[derive(Debug, Clone)]
pub struct StarJoin<'a> {
    fact: &'a TypedTable,
    dimensions: Vec<(&'a TypedTable, DimensionLink)>,
}

impl<'a> StarJoin<'a> {
    pub fn new(fact: &'a TypedTable) -> Self {
        Self {
            fact,
            dimensions: Vec::new(),
        }
    }

    /// Join `table` on `link`. The link's `table` field is informational here.
    pub fn with_dimension(mut self, table: &'a TypedTable, link: DimensionLink) -> Self {
        self.dimensions.push((table, link));
        self
    }

    pub fn plan(&self) -> JoinResult<JoinPlan> {
        let dims: Vec<_> = self
            .dimensions
            .iter()
            .map(|(table, link)| (link, table.columns.as_slice()))
            .collect();
        plan_join(&self.fact.name, &self.fact.columns, &dims)
    }

    /// Run the join.
    pub fn execute(&self) -> JoinResult<(DenormalizedTable, JoinStats)> {
        let plan = self.plan()?;
        self.execute_plan(plan)
    }

    pub(crate) fn execute_plan(&self, plan: JoinPlan) -> JoinResult<(DenormalizedTable, JoinStats)> {
        let indexes = self
            .dimensions
            .iter()
            .zip(&plan.key_positions)
            .map(|((table, _), (_, key))| build_index(table, *key))
            .collect::<JoinResult<Vec<_>>>()?;

        let mut stats = JoinStats {
            fact_rows: self.fact.num_rows(),
            dimensions: self
                .dimensions
                .iter()
                .map(|(table, link)| DimensionStats {
                    alias: link.alias().to_string(),
                    dimension_rows: table.num_rows(),
                    null_keys: 0,
                    unmatched_keys: 0,
                })
                .collect(),
        };

        let width = plan.schema.len();
        let mut rows = Vec::with_capacity(self.fact.num_rows());
        for fact_row in &self.fact.rows {
            let mut row = Vec::with_capacity(width);
            row.extend(fact_row.iter().cloned());

            for (d, ((table, _), (fk, _))) in self.dimensions.iter().zip(&plan.key_positions).enumerate() {
                let matched = match &fact_row[*fk] {
                    Value::Null => {
                        stats.dimensions[d].null_keys += 1;
                        None
                    }
                    key => {
                        let found = indexes[d].get(key).copied();
                        if found.is_none() {
                            stats.dimensions[d].unmatched_keys += 1;
                        }
                        found
                    }
                };
                match matched {
                    Some(i) => row.extend(table.rows[i].iter().cloned()),
                    None => row.extend(std::iter::repeat(Value::Null).take(table.columns.len())),
                }
            }

            rows.push(row);
        }

        Ok((
            DenormalizedTable {
                schema: plan.schema,
                rows,
            },
            stats,
        ))
    }
}

/// Map each non-null key to its row; NULL keys can never match and are skipped.
fn build_index(table: &TypedTable, key: usize) -> JoinResult<HashMap<&Value, usize>> {
    let mut index = HashMap::with_capacity(table.num_rows());
    for (i, row) in table.rows.iter().enumerate() {
        let value = &row[key];
        if value.is_null() {
            continue;
        }
        if index.insert(value, i).is_some() {
            return Err(JoinError::DuplicateKey {
                table: table.name.clone(),
                key: value.to_string(),
            });
        }
    }
    Ok(index)
}
