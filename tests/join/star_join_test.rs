#[cfg(test)]
mod tests {
    use starcube::join::{DimensionLink, JoinError, StarJoin};
    use starcube::model::{DataType, TypedColumn, TypedTable, Value};

    fn fact() -> TypedTable {
        TypedTable::new(
            "fact_sales",
            vec![
                TypedColumn::new("customer_id", DataType::Int),
                TypedColumn::new("product_id", DataType::Text),
                TypedColumn::new("quantity", DataType::Int),
            ],
        )
        .with_row(vec![Value::Int(1), Value::from("P1"), Value::Int(2)])
        .with_row(vec![Value::Null, Value::from("P2"), Value::Int(1)])
        .with_row(vec![Value::Int(9), Value::from("P1"), Value::Int(3)])
        .with_row(vec![Value::Int(2), Value::Null, Value::Int(4)])
    }

    fn customers() -> TypedTable {
        TypedTable::new(
            "dim_customer",
            vec![
                TypedColumn::new("customer_id", DataType::Int),
                TypedColumn::new("region", DataType::Text),
            ],
        )
        .with_row(vec![Value::Int(1), Value::from("East")])
        .with_row(vec![Value::Int(2), Value::from("West")])
        .with_row(vec![Value::Null, Value::from("Nowhere")])
    }

    fn products() -> TypedTable {
        TypedTable::new(
            "dim_product",
            vec![
                TypedColumn::new("product_id", DataType::Text),
                TypedColumn::new("category", DataType::Text),
            ],
        )
        .with_row(vec![Value::from("P1"), Value::from("A")])
        .with_row(vec![Value::from("P2"), Value::from("B")])
    }

    #[test]
    fn test_left_outer_keeps_every_fact_row() {
        let fact = fact();
        let customers = customers();
        let products = products();

        let (joined, stats) = StarJoin::new(&fact)
            .with_dimension(
                &customers,
                DimensionLink::new("dim_customer", "customer_id", "customer_id").with_alias("c"),
            )
            .with_dimension(
                &products,
                DimensionLink::new("dim_product", "product_id", "product_id").with_alias("p"),
            )
            .execute()
            .unwrap();

        assert_eq!(joined.num_rows(), fact.num_rows());

        let region = joined.schema.lookup("c.region").unwrap();
        let category = joined.schema.lookup("category").unwrap();
        let attrs: Vec<(Value, Value)> = joined
            .rows
            .iter()
            .map(|r| (r[region].clone(), r[category].clone()))
            .collect();

        assert_eq!(
            attrs,
            vec![
                (Value::from("East"), Value::from("A")),
                // NULL customer key never matches the NULL-keyed dimension row
                (Value::Null, Value::from("B")),
                // unmatched customer, product still resolves
                (Value::Null, Value::from("A")),
                (Value::from("West"), Value::Null),
            ]
        );

        assert_eq!(stats.fact_rows, 4);
        assert_eq!(stats.dimensions[0].alias, "c");
        assert_eq!(stats.dimensions[0].null_keys, 1);
        assert_eq!(stats.dimensions[0].unmatched_keys, 1);
        assert_eq!(stats.dimensions[1].null_keys, 1);
        assert_eq!(stats.dimensions[1].unmatched_keys, 0);
    }

    #[test]
    fn test_fact_columns_come_first() {
        let fact = fact();
        let customers = customers();

        let (joined, _) = StarJoin::new(&fact)
            .with_dimension(
                &customers,
                DimensionLink::new("dim_customer", "customer_id", "customer_id"),
            )
            .execute()
            .unwrap();

        let names: Vec<_> = joined.schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "fact_sales.customer_id",
                "fact_sales.product_id",
                "fact_sales.quantity",
                "dim_customer.customer_id",
                "dim_customer.region",
            ]
        );
        assert_eq!(joined.rows[0][..3], fact.rows[0][..]);
    }

    #[test]
    fn test_no_dimensions() {
        let fact = fact();
        let (joined, stats) = StarJoin::new(&fact).execute().unwrap();
        assert_eq!(joined.rows, fact.rows);
        assert!(stats.dimensions.is_empty());
    }

    #[test]
    fn test_unknown_foreign_key() {
        let fact = fact();
        let customers = customers();
        let err = StarJoin::new(&fact)
            .with_dimension(
                &customers,
                DimensionLink::new("dim_customer", "customer_id", "cust_id"),
            )
            .execute()
            .unwrap_err();
        assert_eq!(
            err,
            JoinError::UnknownColumn {
                table: "fact_sales".to_string(),
                column: "cust_id".to_string(),
            }
        );
    }

    #[test]
    fn test_join_is_linear_in_fact_rows() {
        let mut fact = TypedTable::new(
            "fact",
            vec![TypedColumn::new("k", DataType::Int)],
        );
        let mut dim = TypedTable::new(
            "dim",
            vec![
                TypedColumn::new("k", DataType::Int),
                TypedColumn::new("label", DataType::Int),
            ],
        );
        for i in 0..20_000i64 {
            fact.rows.push(vec![Value::Int(i % 5_000)]);
        }
        for i in 0..5_000i64 {
            dim.rows.push(vec![Value::Int(i), Value::Int(i * 10)]);
        }

        let (joined, stats) = StarJoin::new(&fact)
            .with_dimension(&dim, DimensionLink::new("dim", "k", "k"))
            .execute()
            .unwrap();
        assert_eq!(joined.num_rows(), 20_000);
        assert_eq!(stats.dimensions[0].unmatched_keys, 0);
        assert_eq!(joined.rows[12_345][2], Value::Int((12_345 % 5_000) * 10));
    }
}
