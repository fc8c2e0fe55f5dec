//! Union of per-set results in canonical order.
//!
//! Rows are sorted lexicographically by group key. Within a key position,
//! concrete values sort by their natural order (NULL last among them) and the
//! ALL sentinel sorts after every value, so a roll-up row follows the rows it
//! summarizes. Rows from different grouping sets never share a key, so the
//! union needs no deduplication.

use super::CubeRow;

/// Concatenate the per-set rows and sort them canonically.
pub fn union_sets(per_set: Vec<Vec<CubeRow>>) -> Vec<CubeRow> {
    let mut rows: Vec<CubeRow> = per_set.into_iter().flatten().collect();
    sort_rows(&mut rows);
    rows
}

pub fn sort_rows(rows: &mut [CubeRow]) {
    rows.sort_unstable_by(|a, b| a.key.cmp(&b.key));
}
