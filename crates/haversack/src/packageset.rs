use haversack_solve::{Map, SolvableId};

use crate::package::Package;
use crate::sack::Sack;

/// A bitmap-backed set of solvable ids with the usual set algebra.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSet {
    map: Map,
}

impl PackageSet {
    /// An empty set sized for `sack`'s pool.
    pub fn new(sack: &Sack) -> PackageSet {
        PackageSet {
            map: Map::with_capacity(sack.pool().nsolvables()),
        }
    }

    pub(crate) fn from_map(map: Map) -> PackageSet {
        PackageSet { map }
    }

    pub(crate) fn as_map(&self) -> &Map {
        &self.map
    }

    pub(crate) fn into_map(self) -> Map {
        self.map
    }

    /// Adds a package.
    pub fn add(&mut self, pkg: &Package<'_>) {
        self.map.set(pkg.id());
    }

    /// Adds a solvable by id.
    pub fn add_id(&mut self, id: SolvableId) {
        self.map.set(id);
    }

    /// Removes a solvable by id.
    pub fn remove_id(&mut self, id: SolvableId) {
        self.map.clear(id);
    }

    /// Membership test.
    pub fn contains(&self, pkg: &Package<'_>) -> bool {
        self.map.contains(pkg.id())
    }

    /// Membership test by id.
    pub fn contains_id(&self, id: SolvableId) -> bool {
        self.map.contains(id)
    }

    /// The number of packages in the set.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when the set is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// `self ∪ other`.
    pub fn union_with(&mut self, other: &PackageSet) {
        self.map.union_with(&other.map);
    }

    /// `self ∩ other`.
    pub fn intersect_with(&mut self, other: &PackageSet) {
        self.map.intersect_with(&other.map);
    }

    /// `self − other`.
    pub fn subtract(&mut self, other: &PackageSet) {
        self.map.subtract(&other.map);
    }

    /// Iterates the member ids in ascending order.
    pub fn iter_ids(&self) -> impl Iterator<Item = SolvableId> + '_ {
        self.map.iter()
    }
}

impl FromIterator<SolvableId> for PackageSet {
    fn from_iter<T: IntoIterator<Item = SolvableId>>(iter: T) -> Self {
        PackageSet {
            map: iter.into_iter().collect(),
        }
    }
}
