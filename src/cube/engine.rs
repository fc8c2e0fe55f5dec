//! Single-pass multi-set aggregation.
//!
//! Each denormalized row is projected onto every grouping set and folded into
//! that set's accumulators in the same pass, so the input is scanned once
//! regardless of N. With partitioning enabled the rows are split into chunks,
//! each chunk folded on the rayon pool, and the partial states merged in
//! chunk order.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use rayon::prelude::*;

use super::accumulator::Accumulator;
use super::grouping::{GroupKey, GroupingSet};
use super::{Cube, CubeOptions, CubeRow};
use crate::join::DenormalizedRow;
use crate::model::Value;

type Groups = HashMap<GroupKey, Vec<Accumulator>>;

/// Per-set group tables for one partition of the input.
pub(crate) struct CubeState {
    groups: Vec<Groups>,
}

impl CubeState {
    /// Empty state with the grand-total group already present, so an empty
    /// input still produces its single grand-total row.
    pub(crate) fn new(cube: &Cube) -> Self {
        let mut groups: Vec<Groups> = cube.sets.iter().map(|_| HashMap::new()).collect();
        let n = cube.attributes.len();
        for (set, table) in cube.sets.iter().zip(groups.iter_mut()) {
            if set.is_empty() {
                table.insert(GroupKey::all(n), cube.new_accumulators());
            }
        }
        Self { groups }
    }

    pub(crate) fn update(&mut self, cube: &Cube, row: &[Value]) {
        let attributes: Vec<&Value> = cube.attributes.iter().map(|i| &row[*i]).collect();

        for (set, table) in cube.sets.iter().zip(self.groups.iter_mut()) {
            let accumulators = table
                .entry(set.project(&attributes))
                .or_insert_with(|| cube.new_accumulators());
            for (acc, measure) in accumulators.iter_mut().zip(&cube.measures) {
                let value = measure.input.map_or(&Value::Null, |i| &row[i]);
                acc.update(value);
            }
        }
    }

    pub(crate) fn merge(&mut self, other: CubeState) {
        for (table, other_table) in self.groups.iter_mut().zip(other.groups) {
            for (key, accumulators) in other_table {
                match table.entry(key) {
                    Entry::Occupied(mut entry) => {
                        for (acc, other_acc) in entry.get_mut().iter_mut().zip(&accumulators) {
                            acc.merge(other_acc);
                        }
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(accumulators);
                    }
                }
            }
        }
    }

    /// Finalize every group, one row vector per grouping set.
    pub(crate) fn finish(self, sets: &[GroupingSet]) -> Vec<Vec<CubeRow>> {
        self.groups
            .into_iter()
            .zip(sets)
            .map(|(table, set)| {
                table
                    .into_iter()
                    .map(|(key, accumulators)| CubeRow {
                        key,
                        set: *set,
                        values: accumulators.iter().map(Accumulator::finish).collect(),
                    })
                    .collect()
            })
            .collect()
    }
}

/// Fold all rows into a single state.
pub(crate) fn accumulate(cube: &Cube, rows: &[DenormalizedRow], options: &CubeOptions) -> CubeState {
    if options.partitions(rows.len()) <= 1 {
        return fold(cube, rows);
    }

    let partials: Vec<CubeState> = rows
        .par_chunks(options.partition_rows)
        .map(|chunk| fold(cube, chunk))
        .collect();

    let mut partials = partials.into_iter();
    let mut state = partials.next().unwrap_or_else(|| CubeState::new(cube));
    for partial in partials {
        state.merge(partial);
    }
    state
}

fn fold(cube: &Cube, rows: &[DenormalizedRow]) -> CubeState {
    let mut state = CubeState::new(cube);
    for row in rows {
        state.update(cube, row);
    }
    state
}
