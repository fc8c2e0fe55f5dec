// src/model/table.rs
use crate::model::types::DataType;
use crate::model::value::Value;

/// An untyped table as read from a CSV file.
///
/// Every field is raw text; `None` marks a field absent from a short row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row of present text fields.
    pub fn with_row<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.rows
            .push(fields.into_iter().map(|f| Some(f.into())).collect());
        self
    }

    pub fn header_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// The raw field at (row, column), `None` when the row is short.
    pub fn field(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|f| f.as_deref())
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.headers.len()
    }
}

/// A column of a typed table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedColumn {
    pub name: String,
    pub data_type: DataType,
}

impl TypedColumn {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A typed, row-major table. Every value conforms to its column type or is NULL.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypedTable {
    pub name: String,
    pub columns: Vec<TypedColumn>,
    pub rows: Vec<Vec<Value>>,
}

impl TypedTable {
    pub fn new(name: impl Into<String>, columns: Vec<TypedColumn>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row. Used by tests and by callers that build tables by hand.
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&TypedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate the values of one column.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |r| &r[index])
    }

    /// Check that every row has the right width and every value its column's type.
    pub fn conforms(&self) -> bool {
        self.rows.iter().all(|row| {
            row.len() == self.columns.len()
                && row
                    .iter()
                    .zip(&self.columns)
                    .all(|(v, c)| v.data_type().map_or(true, |t| t == c.data_type))
        })
    }
}
