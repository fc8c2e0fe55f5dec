//! Derived-column formula parser.
//!
//! Formulas are plain SQL scalar expressions, so they are parsed with
//! sqlparser's `GenericDialect` and converted into our [`Expr`] AST. Only the
//! arithmetic subset is accepted: `+ - * /`, unary minus, parentheses,
//! numeric literals, `NULL`, column references and `COALESCE(...)`.

use sqlparser::ast::{
    self as sql, BinaryOperator as SqlBinaryOp, Expr as SqlExpr, UnaryOperator as SqlUnaryOp,
    Value as SqlValue,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use super::expr::{BinaryOp, Expr, ExprError, Literal};

pub type ParseResult<T> = Result<T, ExprError>;

/// Parse a formula such as `quantity * unit_price - discount`.
pub fn parse_expr(sql: &str) -> ParseResult<Expr> {
    let dialect = GenericDialect {};

    // Wrap in SELECT to make it a valid SQL statement
    let wrapped = format!("SELECT {}", sql);

    let statements = Parser::parse_sql(&dialect, &wrapped).map_err(|e| ExprError::Syntax {
        sql: sql.to_string(),
        message: e.to_string(),
    })?;

    let [sql::Statement::Query(query)] = statements.as_slice() else {
        return Err(syntax(sql, "expected a single expression"));
    };
    let sql::SetExpr::Select(select) = query.body.as_ref() else {
        return Err(syntax(sql, "expected a single expression"));
    };
    match select.projection.as_slice() {
        [sql::SelectItem::UnnamedExpr(expr)] => convert_expr(expr, sql),
        _ => Err(syntax(sql, "expected a single expression")),
    }
}

fn syntax(sql: &str, message: &str) -> ExprError {
    ExprError::Syntax {
        sql: sql.to_string(),
        message: message.to_string(),
    }
}

fn unsupported(sql: &str, feature: impl Into<String>) -> ExprError {
    ExprError::Unsupported {
        sql: sql.to_string(),
        feature: feature.into(),
    }
}

fn convert_expr(expr: &SqlExpr, original_sql: &str) -> ParseResult<Expr> {
    match expr {
        SqlExpr::Identifier(ident) => Ok(Expr::Column(ident.value.clone())),

        // A qualified name refers to a column of the table being coerced
        SqlExpr::CompoundIdentifier(idents) => idents
            .last()
            .map(|ident| Expr::Column(ident.value.clone()))
            .ok_or_else(|| syntax(original_sql, "empty identifier")),

        SqlExpr::Value(value) => convert_value(value, original_sql),

        SqlExpr::BinaryOp { left, op, right } => Ok(Expr::BinaryOp {
            left: Box::new(convert_expr(left, original_sql)?),
            op: convert_binary_op(op, original_sql)?,
            right: Box::new(convert_expr(right, original_sql)?),
        }),

        SqlExpr::UnaryOp { op, expr } => {
            let inner = convert_expr(expr, original_sql)?;
            match op {
                SqlUnaryOp::Minus => Ok(Expr::Neg(Box::new(inner))),
                SqlUnaryOp::Plus => Ok(inner),
                _ => Err(unsupported(
                    original_sql,
                    format!("unary operator {:?}", op),
                )),
            }
        }

        SqlExpr::Nested(inner) => convert_expr(inner, original_sql),

        SqlExpr::Function(func) => convert_function(func, original_sql),

        _ => Err(unsupported(original_sql, format!("expression {}", expr))),
    }
}

fn convert_value(value: &SqlValue, original_sql: &str) -> ParseResult<Expr> {
    match value {
        SqlValue::Number(n, _) => {
            // Try to parse as integer first, then float
            if let Ok(i) = n.parse::<i64>() {
                Ok(Expr::Literal(Literal::Int(i)))
            } else if let Ok(f) = n.parse::<f64>() {
                Ok(Expr::Literal(Literal::Float(f)))
            } else {
                Err(syntax(original_sql, &format!("invalid number: {}", n)))
            }
        }
        SqlValue::Null => Ok(Expr::Literal(Literal::Null)),
        _ => Err(unsupported(original_sql, format!("literal {}", value))),
    }
}

fn convert_binary_op(op: &SqlBinaryOp, original_sql: &str) -> ParseResult<BinaryOp> {
    match op {
        SqlBinaryOp::Plus => Ok(BinaryOp::Add),
        SqlBinaryOp::Minus => Ok(BinaryOp::Sub),
        SqlBinaryOp::Multiply => Ok(BinaryOp::Mul),
        SqlBinaryOp::Divide => Ok(BinaryOp::Div),
        _ => Err(unsupported(original_sql, format!("operator {}", op))),
    }
}

fn convert_function(func: &sql::Function, original_sql: &str) -> ParseResult<Expr> {
    let name = func.name.to_string().to_lowercase();
    if name != "coalesce" {
        return Err(unsupported(original_sql, format!("function {}", name)));
    }

    let args = match &func.args {
        sql::FunctionArguments::List(arg_list) => arg_list
            .args
            .iter()
            .map(|arg| match arg {
                sql::FunctionArg::Unnamed(sql::FunctionArgExpr::Expr(e)) => {
                    convert_expr(e, original_sql)
                }
                _ => Err(unsupported(original_sql, "non-positional COALESCE argument")),
            })
            .collect::<ParseResult<Vec<_>>>()?,
        _ => Vec::new(),
    };

    if args.is_empty() {
        return Err(syntax(original_sql, "COALESCE needs at least one argument"));
    }
    Ok(Expr::Coalesce(args))
}
