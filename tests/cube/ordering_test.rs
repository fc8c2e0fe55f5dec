#[cfg(test)]
mod tests {
    use starcube::cube::{compute_cube, CubeOptions, KeySlot, MeasureSpec};
    use starcube::model::{DataType, TypedColumn, TypedTable, Value};

    fn fact() -> TypedTable {
        TypedTable::new(
            "fact",
            vec![
                TypedColumn::new("region", DataType::Text),
                TypedColumn::new("category", DataType::Text),
                TypedColumn::new("quantity", DataType::Int),
            ],
        )
        .with_row(vec![Value::from("West"), Value::from("A"), Value::Int(3)])
        .with_row(vec![Value::from("East"), Value::from("B"), Value::Int(1)])
        .with_row(vec![Value::from("East"), Value::from("A"), Value::Int(2)])
        .with_row(vec![Value::Null, Value::from("B"), Value::Int(7)])
    }

    fn keys() -> Vec<String> {
        compute_cube(
            &fact(),
            &[],
            &["region", "category"],
            &[MeasureSpec::sum("quantity")],
            &CubeOptions::default(),
        )
        .unwrap()
        .rows
        .iter()
        .map(|r| r.key.to_string())
        .collect()
    }

    #[test]
    fn test_canonical_order() {
        assert_eq!(
            keys(),
            vec![
                "(East, A)",
                "(East, B)",
                "(East, ALL)",
                "(West, A)",
                "(West, ALL)",
                "(NULL, B)",
                "(NULL, ALL)",
                "(ALL, A)",
                "(ALL, B)",
                "(ALL, ALL)",
            ]
        );
    }

    #[test]
    fn test_grand_total_sorts_last() {
        let result = compute_cube(
            &fact(),
            &[],
            &["region", "category"],
            &[MeasureSpec::sum("quantity")],
            &CubeOptions::default(),
        )
        .unwrap();

        let last = result.rows.last().unwrap();
        assert!(last.key.slots().iter().all(KeySlot::is_all));
        assert!(result.rows[..result.num_rows() - 1]
            .iter()
            .all(|r| r.key.slots().iter().any(|s| !s.is_all())));
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let mut reversed = fact();
        reversed.rows.reverse();
        let result = compute_cube(
            &reversed,
            &[],
            &["region", "category"],
            &[MeasureSpec::sum("quantity")],
            &CubeOptions::default(),
        )
        .unwrap();
        let reversed_keys: Vec<String> = result.rows.iter().map(|r| r.key.to_string()).collect();
        assert_eq!(reversed_keys, keys());
    }
}
