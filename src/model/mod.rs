//! Typed tabular data: values, tables, schemas and derived-column formulas.

pub mod expr;
pub mod expr_parser;
pub mod schema;
pub mod table;
pub mod types;
pub mod value;

pub use expr::{BinaryOp, BoundExpr, Expr, ExprError, Literal};
pub use schema::{ColumnSpec, DerivedColumn, TableSchema};
pub use table::{RawTable, TypedColumn, TypedTable};
pub use types::{CastMode, DataType};
pub use value::Value;
