use std::cmp::Ordering;

use ordered_float::OrderedFloat;

use crate::vector::Label;

/// One reference sample scored against a query.
///
/// Ordered by distance first and then by position in the reference set, so
/// equal distances never compare equal and selection is deterministic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Neighbor {
    pub distance: OrderedFloat<f64>,
    pub label: Label,
    pub index: usize,
}

impl Neighbor {
    pub fn new(distance: f64, label: Label, index: usize) -> Self {
        Neighbor {
            distance: OrderedFloat(distance),
            label,
            index,
        }
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .cmp(&other.distance)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
