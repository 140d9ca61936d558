use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Position of a round in one protocol run, `0..num_rounds`.
pub type RoundIndex = usize;

/// Indices of rounds a party claims support its committed value ($Σ$).
///
/// Order is kept as sent: the adversarial split is a concatenation of two
/// buckets and is not sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSet(Vec<RoundIndex>);

impl CheckSet {
    pub fn new(indices: Vec<RoundIndex>) -> Self {
        Self(indices)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = RoundIndex> + '_ {
        self.0.iter().copied()
    }

    pub(crate) fn push(&mut self, index: RoundIndex) {
        self.0.push(index)
    }

    /// True when every index is below `num_rounds` and none repeats.
    pub fn is_well_formed(&self, num_rounds: usize) -> bool {
        let mut seen = BTreeSet::new();
        self.iter().all(|i| i < num_rounds && seen.insert(i))
    }

    pub fn is_disjoint(&self, other: &CheckSet) -> bool {
        let ours = BTreeSet::from_iter(self.iter());
        other.iter().all(|i| !ours.contains(&i))
    }
}

impl FromIterator<RoundIndex> for CheckSet {
    fn from_iter<I: IntoIterator<Item = RoundIndex>>(iter: I) -> Self {
        Self(Vec::from_iter(iter))
    }
}

impl From<Vec<RoundIndex>> for CheckSet {
    fn from(indices: Vec<RoundIndex>) -> Self {
        Self(indices)
    }
}
