//! Arithmetic expressions for derived columns.
//!
//! A derived column such as `sales_amount` is declared with a formula over
//! the other columns of the same table:
//!
//! ```toml
//! derived = [
//!     { name = "sales_amount", type = "float", expr = "quantity * unit_price - discount" },
//! ]
//! ```
//!
//! The formula is parsed once (see [`super::expr_parser`]), bound against the
//! table's typed columns, and evaluated row by row during coercion. Evaluation
//! follows SQL NULL propagation: any NULL operand makes the result NULL, except
//! inside `COALESCE`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::table::TypedColumn;
use super::types::DataType;
use super::value::Value;

/// Errors raised while parsing or binding a derived-column expression.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExprError {
    #[error("syntax error in '{sql}': {message}")]
    Syntax { sql: String, message: String },

    #[error("unsupported expression in '{sql}': {feature}")]
    Unsupported { sql: String, feature: String },

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("column '{column}' has type {data_type}, expected a numeric column")]
    NonNumericColumn { column: String, data_type: DataType },
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

/// Literal constants.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Null,
}

/// An unbound derived-column expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Expr {
    Column(String),
    Literal(Literal),
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Neg(Box<Expr>),
    Coalesce(Vec<Expr>),
}

impl Expr {
    pub fn col(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    pub fn int(value: i64) -> Self {
        Expr::Literal(Literal::Int(value))
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Column names referenced by this expression, in first-seen order.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::Literal(_) => {}
            Expr::BinaryOp { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::Neg(inner) => inner.collect_columns(out),
            Expr::Coalesce(args) => args.iter().for_each(|a| a.collect_columns(out)),
        }
    }

    /// Resolve column references against `columns` and infer the result type.
    pub fn bind(&self, columns: &[TypedColumn]) -> Result<BoundExpr, ExprError> {
        let (node, data_type) = bind_node(self, columns)?;
        Ok(BoundExpr {
            node,
            data_type: data_type.unwrap_or(DataType::Int),
        })
    }
}

impl TryFrom<String> for Expr {
    type Error = ExprError;

    fn try_from(sql: String) -> Result<Self, Self::Error> {
        super::expr_parser::parse_expr(&sql)
    }
}

impl From<Expr> for String {
    fn from(expr: Expr) -> Self {
        expr.to_string()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(name) => f.write_str(name),
            Expr::Literal(Literal::Int(i)) => write!(f, "{}", i),
            Expr::Literal(Literal::Float(v)) => write!(f, "{}", ryu::Buffer::new().format(*v)),
            Expr::Literal(Literal::Null) => f.write_str("NULL"),
            Expr::BinaryOp { left, op, right } => {
                write_operand(f, left)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right)
            }
            Expr::Neg(inner) => {
                f.write_str("-")?;
                write_operand(f, inner)
            }
            Expr::Coalesce(args) => {
                f.write_str("COALESCE(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    match expr {
        Expr::BinaryOp { .. } => write!(f, "({})", expr),
        _ => write!(f, "{}", expr),
    }
}

// ============================================================================
// Bound expressions
// ============================================================================

/// An expression whose column references are row positions.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundExpr {
    node: Node,
    data_type: DataType,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Column(usize),
    Literal(Value),
    Binary {
        left: Box<Node>,
        op: BinaryOp,
        right: Box<Node>,
    },
    Neg(Box<Node>),
    Coalesce(Vec<Node>),
}

/// Returns the node and its static type; `None` means only NULL can come out.
fn bind_node(
    expr: &Expr,
    columns: &[TypedColumn],
) -> Result<(Node, Option<DataType>), ExprError> {
    match expr {
        Expr::Column(name) => {
            let index = columns
                .iter()
                .position(|c| &c.name == name)
                .ok_or_else(|| ExprError::UnknownColumn(name.clone()))?;
            let data_type = columns[index].data_type;
            if !data_type.is_numeric() {
                return Err(ExprError::NonNumericColumn {
                    column: name.clone(),
                    data_type,
                });
            }
            Ok((Node::Column(index), Some(data_type)))
        }
        Expr::Literal(Literal::Int(i)) => Ok((Node::Literal(Value::Int(*i)), Some(DataType::Int))),
        Expr::Literal(Literal::Float(v)) => {
            Ok((Node::Literal(Value::Float(*v)), Some(DataType::Float)))
        }
        Expr::Literal(Literal::Null) => Ok((Node::Literal(Value::Null), None)),
        Expr::BinaryOp { left, op, right } => {
            let (l, lt) = bind_node(left, columns)?;
            let (r, rt) = bind_node(right, columns)?;
            let data_type = if *op == BinaryOp::Div {
                Some(DataType::Float)
            } else {
                widen(lt, rt)
            };
            Ok((
                Node::Binary {
                    left: Box::new(l),
                    op: *op,
                    right: Box::new(r),
                },
                data_type,
            ))
        }
        Expr::Neg(inner) => {
            let (node, data_type) = bind_node(inner, columns)?;
            Ok((Node::Neg(Box::new(node)), data_type))
        }
        Expr::Coalesce(args) => {
            let mut nodes = Vec::with_capacity(args.len());
            let mut data_type = None;
            for arg in args {
                let (node, t) = bind_node(arg, columns)?;
                nodes.push(node);
                data_type = widen(data_type, t);
            }
            Ok((Node::Coalesce(nodes), data_type))
        }
    }
}

fn widen(a: Option<DataType>, b: Option<DataType>) -> Option<DataType> {
    match (a, b) {
        (Some(DataType::Float), _) | (_, Some(DataType::Float)) => Some(DataType::Float),
        (Some(t), _) | (None, Some(t)) => Some(t),
        (None, None) => None,
    }
}

impl BoundExpr {
    /// Static result type: `Float` if any operand is floating-point or a
    /// division is involved, `Int` otherwise.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Evaluate against one row of typed values.
    ///
    /// The result is NULL or a value of [`BoundExpr::data_type`]. Integer
    /// overflow and division by zero yield NULL.
    pub fn evaluate(&self, row: &[Value]) -> Value {
        match (eval(&self.node, row), self.data_type) {
            (Value::Int(i), DataType::Float) => Value::Float(i as f64),
            (v, _) => v,
        }
    }
}

fn eval(node: &Node, row: &[Value]) -> Value {
    match node {
        Node::Column(i) => row.get(*i).cloned().unwrap_or(Value::Null),
        Node::Literal(v) => v.clone(),
        Node::Neg(inner) => match eval(inner, row) {
            Value::Int(i) => i.checked_neg().map(Value::Int).unwrap_or(Value::Null),
            Value::Float(f) => Value::float(-f),
            _ => Value::Null,
        },
        Node::Coalesce(args) => args
            .iter()
            .map(|a| eval(a, row))
            .find(|v| !v.is_null())
            .unwrap_or(Value::Null),
        Node::Binary { left, op, right } => {
            let l = eval(left, row);
            let r = eval(right, row);
            arithmetic(&l, *op, &r)
        }
    }
}

fn arithmetic(l: &Value, op: BinaryOp, r: &Value) -> Value {
    // Integer division falls through: it is always floating-point.
    let int_result = match (l, op, r) {
        (Value::Int(a), BinaryOp::Add, Value::Int(b)) => Some(a.checked_add(*b)),
        (Value::Int(a), BinaryOp::Sub, Value::Int(b)) => Some(a.checked_sub(*b)),
        (Value::Int(a), BinaryOp::Mul, Value::Int(b)) => Some(a.checked_mul(*b)),
        _ => None,
    };
    if let Some(result) = int_result {
        return result.map(Value::Int).unwrap_or(Value::Null);
    }

    let (Some(a), Some(b)) = (l.as_f64(), r.as_f64()) else {
        return Value::Null;
    };
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Value::Null;
            }
            a / b
        }
    };
    if result.is_finite() {
        Value::float(result)
    } else {
        Value::Null
    }
}
