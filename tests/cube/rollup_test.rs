use std::collections::{BTreeSet, HashMap};

use starcube::cube::{Cube, CubeOptions, CubeSpec, GroupingSet, KeySlot, MeasureSpec};
use starcube::join::StarJoin;
use starcube::model::{DataType, TypedColumn, TypedTable, Value};

const REGIONS: [&str; 3] = ["East", "West", "North"];
const CATEGORIES: [&str; 4] = ["A", "B", "C", "D"];

/// 500 rows over three attributes, with NULL regions and quantities mixed in.
fn fact() -> TypedTable {
    let mut table = TypedTable::new(
        "fact",
        vec![
            TypedColumn::new("region", DataType::Text),
            TypedColumn::new("category", DataType::Text),
            TypedColumn::new("year", DataType::Int),
            TypedColumn::new("quantity", DataType::Int),
        ],
    );
    for i in 0..500usize {
        let region = if i % 11 == 0 {
            Value::Null
        } else {
            Value::from(REGIONS[i % 3])
        };
        let quantity = if i % 13 == 0 {
            Value::Null
        } else {
            Value::Int((i * 7 % 19) as i64)
        };
        table.rows.push(vec![
            region,
            Value::from(CATEGORIES[(i / 3) % 4]),
            Value::Int(2020 + (i % 5) as i64),
            quantity,
        ]);
    }
    table
}

fn spec() -> CubeSpec {
    CubeSpec::new()
        .group_by("region")
        .group_by("category")
        .group_by("year")
        .measure(MeasureSpec::sum("quantity"))
        .measure(MeasureSpec::count_rows())
}

fn int(value: &Value) -> i64 {
    match value {
        Value::Int(i) => *i,
        other => panic!("expected an int, got {:?}", other),
    }
}

#[test]
fn test_row_count_invariant() {
    let fact = fact();
    let (joined, _) = StarJoin::new(&fact).execute().unwrap();
    let cube = Cube::bind(&joined.schema, &spec()).unwrap();
    let result = cube.compute(&joined.rows, &CubeOptions::default());

    let expected: usize = GroupingSet::enumerate(3)
        .into_iter()
        .map(|set| {
            fact.rows
                .iter()
                .map(|row| {
                    set.indices(3)
                        .map(|i| row[i].clone())
                        .collect::<Vec<_>>()
                })
                .collect::<BTreeSet<_>>()
                .len()
        })
        .sum();

    assert_eq!(result.num_rows(), expected);
    assert_eq!(result.rows_in(GroupingSet::empty()).count(), 1);
}

#[test]
fn test_grand_total_matches_direct_sum() {
    let fact = fact();
    let (joined, _) = StarJoin::new(&fact).execute().unwrap();
    let cube = Cube::bind(&joined.schema, &spec()).unwrap();
    let result = cube.compute(&joined.rows, &CubeOptions::default());

    let direct: i64 = fact.column_values(3).filter(|v| !v.is_null()).map(int).sum();
    let total = result.grand_total().unwrap();
    assert_eq!(total.values[0], Value::Int(direct));
    assert_eq!(total.values[1], Value::Int(500));
}

#[test]
fn test_rollup_from_finest_set() {
    let fact = fact();
    let (joined, _) = StarJoin::new(&fact).execute().unwrap();
    let cube = Cube::bind(&joined.schema, &spec()).unwrap();
    let result = cube.compute(&joined.rows, &CubeOptions::default());

    let finest: Vec<_> = result.rows_in(GroupingSet::full(3)).collect();

    for set in GroupingSet::enumerate(3) {
        let mut rolled: HashMap<Vec<KeySlot>, (i64, i64)> = HashMap::new();
        for row in &finest {
            let key = row
                .key
                .slots()
                .iter()
                .enumerate()
                .map(|(i, slot)| if set.contains(i) { slot.clone() } else { KeySlot::All })
                .collect();
            let entry = rolled.entry(key).or_default();
            entry.0 += int(&row.values[0]);
            entry.1 += int(&row.values[1]);
        }

        let rows: Vec<_> = result.rows_in(set).collect();
        assert_eq!(rows.len(), rolled.len(), "row count for {:?}", set);
        for row in rows {
            let (sum, count) = rolled[row.key.slots()];
            assert_eq!(int(&row.values[0]), sum, "sum for {}", row.key);
            assert_eq!(int(&row.values[1]), count, "count for {}", row.key);
        }
    }
}
