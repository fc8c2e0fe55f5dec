#[cfg(test)]
mod tests {
    use starcube::cube::{compute_cube, CubeOptions, MeasureSpec};
    use starcube::io::result_fingerprint;
    use starcube::join::DimensionLink;
    use starcube::model::{DataType, TypedColumn, TypedTable, Value};

    fn stores() -> TypedTable {
        (0..6i64).fold(
            TypedTable::new(
                "dim_store",
                vec![
                    TypedColumn::new("store_id", DataType::Int),
                    TypedColumn::new("city", DataType::Text),
                ],
            ),
            |t, id| t.with_row(vec![Value::Int(id), Value::from(format!("city{}", id % 4))]),
        )
    }

    /// Amounts are multiples of 0.5, so float sums do not depend on fold order.
    fn fact(rows: i64) -> TypedTable {
        (0..rows).fold(
            TypedTable::new(
                "fact",
                vec![
                    TypedColumn::new("store_id", DataType::Int),
                    TypedColumn::new("channel", DataType::Text),
                    TypedColumn::new("units", DataType::Int),
                    TypedColumn::new("amount", DataType::Float),
                ],
            ),
            |t, i| {
                let amount = if i % 9 == 0 {
                    Value::Null
                } else {
                    Value::Float((i % 23) as f64 * 0.5)
                };
                t.with_row(vec![
                    // store 7 has no dimension row
                    Value::Int(i % 8),
                    Value::from(if i % 3 == 0 { "web" } else { "shop" }),
                    Value::Int(i % 5),
                    amount,
                ])
            },
        )
    }

    fn measures() -> Vec<MeasureSpec> {
        vec![
            MeasureSpec::sum("units"),
            MeasureSpec::sum("amount"),
            MeasureSpec::count_rows(),
            MeasureSpec::count("amount"),
            MeasureSpec::avg("amount"),
            MeasureSpec::min("amount"),
            MeasureSpec::max("units"),
        ]
    }

    fn run(fact: &TypedTable, options: CubeOptions) -> starcube::CubeResult {
        let stores = stores();
        compute_cube(
            fact,
            &[(&stores, DimensionLink::new("dim_store", "store_id", "store_id"))],
            &["city", "channel"],
            &measures(),
            &options,
        )
        .unwrap()
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let fact = fact(1_000);
        let parallel = CubeOptions {
            parallel: true,
            partition_rows: 7,
        };
        assert!(parallel.partitions(fact.num_rows()) > 1);

        let sequential = run(&fact, CubeOptions::sequential());
        let partitioned = run(&fact, parallel);
        assert_eq!(partitioned, sequential);
        assert_eq!(
            result_fingerprint(&partitioned).unwrap(),
            result_fingerprint(&sequential).unwrap()
        );
    }

    #[test]
    fn test_partition_size_does_not_change_result() {
        let fact = fact(257);
        let baseline = run(&fact, CubeOptions::sequential());
        for partition_rows in [1, 2, 64, 256, 257, 10_000] {
            let options = CubeOptions {
                parallel: true,
                partition_rows,
            };
            assert_eq!(run(&fact, options), baseline, "partition_rows = {}", partition_rows);
        }
    }

    #[test]
    fn test_parallel_empty_input() {
        let fact = fact(0);
        let result = run(
            &fact,
            CubeOptions {
                parallel: true,
                partition_rows: 1,
            },
        );
        assert_eq!(result.num_rows(), 1);
        assert_eq!(result.grand_total().unwrap().values[2], Value::Int(0));
    }
}
