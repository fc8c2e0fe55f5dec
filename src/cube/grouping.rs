//! Grouping sets and group keys.
//!
//! A cube over N grouping attributes aggregates every subset of those
//! attributes. A subset is a [`GroupingSet`] bitmask (bit `i` set when
//! attribute `i` is grouped), so enumerating `0..2^N` visits each subset once:
//! mask `0` is the grand total and mask `2^N - 1` the finest grouping.

use std::fmt;

use crate::model::Value;

/// Largest supported N; 2^16 grouping sets.
pub const MAX_GROUPING_ATTRIBUTES: usize = 16;

/// One subset of the grouping attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupingSet {
    mask: u32,
}

impl GroupingSet {
    /// All 2^n subsets of `n` attributes, grand total first.
    ///
    /// # Panics
    /// Panics if `n` exceeds [`MAX_GROUPING_ATTRIBUTES`]; callers validate `n`
    /// when binding a cube.
    pub fn enumerate(n: usize) -> impl Iterator<Item = GroupingSet> {
        assert!(n <= MAX_GROUPING_ATTRIBUTES, "too many grouping attributes");
        (0..1u32 << n).map(|mask| GroupingSet { mask })
    }

    pub fn from_mask(mask: u32) -> Self {
        Self { mask }
    }

    /// The grand total: no attribute grouped.
    pub fn empty() -> Self {
        Self { mask: 0 }
    }

    /// The finest grouping over `n` attributes.
    pub fn full(n: usize) -> Self {
        Self {
            mask: (1u32 << n) - 1,
        }
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn contains(&self, attribute: usize) -> bool {
        self.mask & (1 << attribute) != 0
    }

    /// Number of grouped attributes.
    pub fn len(&self) -> usize {
        self.mask.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    /// Whether every attribute grouped here is also grouped in `other`.
    pub fn is_subset_of(&self, other: &GroupingSet) -> bool {
        self.mask & !other.mask == 0
    }

    /// Grouped attribute positions, ascending.
    pub fn indices(&self, n: usize) -> impl Iterator<Item = usize> + '_ {
        (0..n).filter(move |i| self.contains(*i))
    }

    /// Project attribute values onto this set, rolling the others up to ALL.
    pub fn project(&self, values: &[&Value]) -> GroupKey {
        GroupKey(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    if self.contains(i) {
                        KeySlot::Value((*v).clone())
                    } else {
                        KeySlot::All
                    }
                })
                .collect(),
        )
    }

    /// SQL `GROUPING(a1, .., an)`: one bit per rolled-up attribute, the
    /// first attribute in the most significant position.
    pub fn grouping_id(&self, n: usize) -> u32 {
        (0..n).fold(0, |id, i| (id << 1) | u32::from(!self.contains(i)))
    }
}

/// One position of a group key.
///
/// Variant order gives the canonical sort: every concrete value (including a
/// NULL that came from the data) before the ALL sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeySlot {
    /// A value observed in the data; may be NULL.
    Value(Value),
    /// Rolled up: the attribute is not part of this grouping set.
    All,
}

impl KeySlot {
    pub fn value(value: impl Into<Value>) -> Self {
        KeySlot::Value(value.into())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, KeySlot::All)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            KeySlot::Value(v) => Some(v),
            KeySlot::All => None,
        }
    }
}

impl fmt::Display for KeySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySlot::Value(Value::Null) => f.write_str("NULL"),
            KeySlot::Value(v) => write!(f, "{}", v),
            KeySlot::All => f.write_str("ALL"),
        }
    }
}

/// A tuple of N key slots; ordered lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey(pub Vec<KeySlot>);

impl GroupKey {
    /// The grand-total key over `n` attributes.
    pub fn all(n: usize) -> Self {
        GroupKey(vec![KeySlot::All; n])
    }

    pub fn slots(&self) -> &[KeySlot] {
        &self.0
    }

    /// The grouping set this key belongs to.
    pub fn grouping_set(&self) -> GroupingSet {
        let mask = self
            .0
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_all())
            .fold(0u32, |m, (i, _)| m | (1 << i));
        GroupingSet::from_mask(mask)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, slot) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", slot)?;
        }
        f.write_str(")")
    }
}
