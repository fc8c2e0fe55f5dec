use starcube::coerce::{check_schema, coerce_table, coerce_table_with_stats, CoerceError};
use starcube::model::{
    ColumnSpec, DataType, DerivedColumn, Expr, ExprError, RawTable, TableSchema, Value,
};

fn expr(sql: &str) -> Expr {
    Expr::try_from(sql.to_string()).unwrap()
}

fn fact_schema() -> TableSchema {
    TableSchema::new()
        .with_column(ColumnSpec::new("quantity", DataType::Int))
        .with_column(ColumnSpec::new("unit_price", DataType::Float))
        .with_column(ColumnSpec::new("discount", DataType::Float).with_default("0"))
        .with_derived(DerivedColumn::new(
            "sales_amount",
            DataType::Float,
            expr("quantity * unit_price - discount"),
        ))
}

#[test]
fn test_explicit_value_wins_over_formula() {
    let raw = RawTable::new(
        "fact_sales",
        vec![
            "quantity".into(),
            "unit_price".into(),
            "discount".into(),
            "sales_amount".into(),
        ],
    )
    .with_row(["2", "10", "", ""])
    .with_row(["2", "10", "1", "99.5"])
    .with_row(["2", "10", "1", "NA"]);

    let (table, stats) = coerce_table_with_stats(&raw, &fact_schema()).unwrap();
    let amounts: Vec<_> = table.column_values(3).cloned().collect();
    assert_eq!(
        amounts,
        vec![Value::Float(20.0), Value::Float(99.5), Value::Float(19.0)]
    );
    assert_eq!(stats.derived_computed, 2);
}

#[test]
fn test_derived_column_absent_from_input() {
    let raw = RawTable::new(
        "fact_sales",
        vec!["quantity".into(), "unit_price".into(), "discount".into()],
    )
    .with_row(["3", "1.5", "0.5"]);

    let table = coerce_table(&raw, &fact_schema()).unwrap();
    assert_eq!(table.columns[3].name, "sales_amount");
    assert_eq!(table.rows[0][3], Value::Float(4.0));
}

#[test]
fn test_null_operand_propagates() {
    let raw = RawTable::new(
        "fact_sales",
        vec!["quantity".into(), "unit_price".into(), "discount".into()],
    )
    .with_row(["", "10", "0"]);

    let table = coerce_table(&raw, &fact_schema()).unwrap();
    assert_eq!(table.rows[0][3], Value::Null);
}

#[test]
fn test_coalesce_and_division_by_zero() {
    let schema = TableSchema::new()
        .with_column(ColumnSpec::new("sales", DataType::Float))
        .with_column(ColumnSpec::new("units", DataType::Int))
        .with_derived(DerivedColumn::new(
            "price",
            DataType::Float,
            expr("COALESCE(sales, 0) / units"),
        ));
    let raw = RawTable::new("fact", vec!["sales".into(), "units".into()])
        .with_row(["", "4"])
        .with_row(["10", "0"])
        .with_row(["10", "4"]);

    let table = coerce_table(&raw, &schema).unwrap();
    let prices: Vec<_> = table.column_values(2).cloned().collect();
    assert_eq!(prices, vec![Value::Float(0.0), Value::Null, Value::Float(2.5)]);
}

#[test]
fn test_integer_formula_stays_integer() {
    let schema = TableSchema::new()
        .with_column(ColumnSpec::new("a", DataType::Int))
        .with_column(ColumnSpec::new("b", DataType::Int))
        .with_derived(DerivedColumn::new("total", DataType::Int, expr("a + b * 2")));
    let raw = RawTable::new("t", vec!["a".into(), "b".into()]).with_row(["1", "3"]);

    let table = coerce_table(&raw, &schema).unwrap();
    assert_eq!(table.rows[0][2], Value::Int(7));
}

#[test]
fn test_unknown_column_rejected_before_rows() {
    let schema = TableSchema::new()
        .with_column(ColumnSpec::new("quantity", DataType::Int))
        .with_derived(DerivedColumn::new(
            "sales_amount",
            DataType::Float,
            expr("quantity * price"),
        ));

    let err = check_schema("fact_sales", &schema).unwrap_err();
    assert_eq!(
        err,
        CoerceError::InvalidDerived {
            table: "fact_sales".to_string(),
            column: "sales_amount".to_string(),
            source: ExprError::UnknownColumn("price".to_string()),
        }
    );
}

#[test]
fn test_text_operand_rejected() {
    let schema = TableSchema::new()
        .with_column(ColumnSpec::new("region", DataType::Text))
        .with_derived(DerivedColumn::new("x", DataType::Float, expr("region + 1")));
    let raw = RawTable::new("t", vec!["region".into()]).with_row(["East"]);

    assert!(matches!(
        coerce_table(&raw, &schema),
        Err(CoerceError::InvalidDerived {
            source: ExprError::NonNumericColumn { .. },
            ..
        })
    ));
}

#[test]
fn test_unsupported_syntax() {
    let err = Expr::try_from("quantity > 2".to_string()).unwrap_err();
    assert!(matches!(err, ExprError::Unsupported { .. }));
}
