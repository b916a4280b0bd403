//! Sets of memory locations and the lattice value built on top of them.
//!
//! `LocationSet` answers two kinds of questions. `contains` is exact membership and backs
//! every must-style query. `overlap` asks the alias oracle and backs every may-style query;
//! it errs towards "yes" whenever disjointness can't be proven.

use crate::memory::location::{AliasOracle, MemoryLocation};
use rustc_hash::FxHashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationSet {
    locations: FxHashSet<MemoryLocation>,
}

impl LocationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryLocation> {
        self.locations.iter()
    }

    /// Members in a stable order, for reports and tests.
    pub fn sorted(&self) -> Vec<MemoryLocation> {
        let mut locations = self.locations.iter().copied().collect::<Vec<_>>();
        locations.sort();
        locations
    }

    pub fn contains(&self, location: &MemoryLocation) -> bool {
        self.locations.contains(location)
    }

    /// True if one member alone covers every byte of `location`.
    pub fn covers(&self, location: &MemoryLocation) -> bool {
        self.locations.iter().any(|member| member.covers(location))
    }

    /// Returns true if the set changed.
    pub fn insert(&mut self, location: MemoryLocation) -> bool {
        self.locations.insert(location)
    }

    /// True if any member may overlap `location`.
    pub fn overlap(&self, location: &MemoryLocation, aliases: &dyn AliasOracle) -> bool {
        self.locations
            .iter()
            .any(|member| aliases.alias(member, location).may_overlap())
    }

    /// Keeps only members that `other` also contains. Returns true if the set changed.
    pub fn intersect(&mut self, other: &LocationSet) -> bool {
        let before = self.locations.len();
        self.locations.retain(|location| other.locations.contains(location));
        before != self.locations.len()
    }

    /// Adds every member of `other`. Returns true if the set changed.
    pub fn merge(&mut self, other: &LocationSet) -> bool {
        let before = self.locations.len();
        self.locations.extend(other.locations.iter().copied());
        before != self.locations.len()
    }

    pub fn retain(&mut self, keep: impl FnMut(&MemoryLocation) -> bool) {
        self.locations.retain(keep);
    }
}

impl FromIterator<MemoryLocation> for LocationSet {
    fn from_iter<I: IntoIterator<Item = MemoryLocation>>(iter: I) -> Self {
        Self {
            locations: iter.into_iter().collect(),
        }
    }
}

impl Extend<MemoryLocation> for LocationSet {
    fn extend<I: IntoIterator<Item = MemoryLocation>>(&mut self, iter: I) {
        self.locations.extend(iter);
    }
}

/// A location set that can also stand for "every location".
///
/// `Full` is the identity of `intersect`, which makes it the top element of the MustReach
/// lattice. It only survives solving on nodes that no path reaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationLattice {
    Full,
    Locations(LocationSet),
}

impl Default for LocationLattice {
    fn default() -> Self {
        Self::empty()
    }
}

impl LocationLattice {
    pub fn full() -> Self {
        Self::Full
    }

    pub fn empty() -> Self {
        Self::Locations(LocationSet::new())
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }

    /// The explicit members, or `None` for `Full`.
    pub fn known_locations(&self) -> Option<&LocationSet> {
        match self {
            Self::Full => None,
            Self::Locations(set) => Some(set),
        }
    }

    pub fn contains(&self, location: &MemoryLocation) -> bool {
        match self {
            Self::Full => true,
            Self::Locations(set) => set.contains(location),
        }
    }

    /// Membership that treats `Full` as "nothing is known". Used where a value read off an
    /// unreached node must not be trusted.
    pub fn definitely_contains(&self, location: &MemoryLocation) -> bool {
        match self {
            Self::Full => false,
            Self::Locations(set) => set.contains(location),
        }
    }

    /// True if some member covers every byte of `location`. `Full` covers nothing, for the
    /// same reason as [`LocationLattice::definitely_contains`].
    pub fn covers(&self, location: &MemoryLocation) -> bool {
        match self {
            Self::Full => false,
            Self::Locations(set) => set.covers(location),
        }
    }

    pub fn insert(&mut self, location: MemoryLocation) -> bool {
        match self {
            Self::Full => false,
            Self::Locations(set) => set.insert(location),
        }
    }

    pub fn insert_all(&mut self, locations: &LocationSet) -> bool {
        match self {
            Self::Full => false,
            Self::Locations(set) => set.merge(locations),
        }
    }

    /// Meet for MustReach. Returns true if the value changed.
    pub fn intersect(&mut self, other: &LocationLattice) -> bool {
        let Self::Locations(other_set) = other else {
            return false;
        };

        match self {
            Self::Full => {
                *self = Self::Locations(other_set.clone());
                true
            }
            Self::Locations(set) => set.intersect(other_set),
        }
    }

    /// Meet for MayReach. Returns true if the value changed.
    pub fn merge(&mut self, other: &LocationLattice) -> bool {
        let Self::Locations(set) = self else {
            return false;
        };

        match other {
            Self::Full => {
                *self = Self::Full;
                true
            }
            Self::Locations(other_set) => set.merge(other_set),
        }
    }

    /// Drops every member that overlaps one of `definitions` without being identical to it.
    pub fn kill_overlapping(&mut self, definitions: &LocationSet, aliases: &dyn AliasOracle) {
        let Self::Locations(set) = self else {
            return;
        };

        if definitions.is_empty() {
            return;
        }

        set.retain(|member| {
            definitions.contains(member)
                || !definitions
                    .iter()
                    .any(|definition| aliases.alias(definition, member).may_overlap())
        });
    }
}
