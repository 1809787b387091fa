use bitvec::vec::BitVec;

use crate::arena::ArenaId;
use crate::id::SolvableId;

/// A fixed-width bitmap indexed by solvable id.
///
/// All set operations treat bits beyond either operand's width as unset;
/// the receiver grows as needed so ids allocated after the map was created
/// can still be stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Map {
    bits: BitVec,
}

impl Map {
    /// An empty map sized for `n` solvables.
    pub fn with_capacity(n: usize) -> Map {
        Map {
            bits: BitVec::repeat(false, n),
        }
    }

    fn grow(&mut self, index: usize) {
        if index >= self.bits.len() {
            self.bits.resize(index + 1, false);
        }
    }

    /// Sets the bit for `id`.
    pub fn set(&mut self, id: SolvableId) {
        let index = id.to_usize();
        self.grow(index);
        self.bits.set(index, true);
    }

    /// Clears the bit for `id`.
    pub fn clear(&mut self, id: SolvableId) {
        let index = id.to_usize();
        if index < self.bits.len() {
            self.bits.set(index, false);
        }
    }

    /// Tests the bit for `id`.
    pub fn contains(&self, id: SolvableId) -> bool {
        self.bits.get(id.to_usize()).map(|b| *b).unwrap_or(false)
    }

    /// The number of set bits.
    pub fn len(&self) -> usize {
        self.bits.count_ones()
    }

    /// True when no bit is set.
    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// `self ∪ other`.
    pub fn union_with(&mut self, other: &Map) {
        self.grow(other.bits.len().saturating_sub(1));
        for index in other.bits.iter_ones() {
            self.bits.set(index, true);
        }
    }

    /// `self ∩ other`.
    pub fn intersect_with(&mut self, other: &Map) {
        for index in self.bits.iter_ones().collect::<Vec<_>>() {
            if !other.bits.get(index).map(|b| *b).unwrap_or(false) {
                self.bits.set(index, false);
            }
        }
    }

    /// `self − other`.
    pub fn subtract(&mut self, other: &Map) {
        for index in other.bits.iter_ones() {
            if index < self.bits.len() {
                self.bits.set(index, false);
            }
        }
    }

    /// Iterates over the set ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = SolvableId> + '_ {
        self.bits.iter_ones().map(SolvableId::from_usize)
    }
}

impl FromIterator<SolvableId> for Map {
    fn from_iter<T: IntoIterator<Item = SolvableId>>(iter: T) -> Self {
        let mut map = Map::default();
        for id in iter {
            map.set(id);
        }
        map
    }
}
