//! Groups locations into classes of mutually aliasing accesses.
//!
//! Adding a location merges every existing class that may overlap it, so a class is the
//! transitive closure of "may alias". Privatization has to judge a whole class at once:
//! writing `*p` is an implicit write to everything `p` may point to.

use crate::memory::location::{AliasOracle, MemoryLocation};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasSet {
    locations: Vec<MemoryLocation>,
}

impl AliasSet {
    pub fn locations(&self) -> &[MemoryLocation] {
        &self.locations
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    fn may_alias(&self, location: &MemoryLocation, aliases: &dyn AliasOracle) -> bool {
        self.locations
            .iter()
            .any(|member| aliases.alias(member, location).may_overlap())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasSetTracker {
    sets: Vec<AliasSet>,
}

impl AliasSetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sets(&self) -> &[AliasSet] {
        &self.sets
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn locations(&self) -> impl Iterator<Item = &MemoryLocation> {
        self.sets.iter().flat_map(|set| set.locations.iter())
    }

    /// Returns true if a new alias set was created.
    pub fn add(&mut self, location: MemoryLocation, aliases: &dyn AliasOracle) -> bool {
        let mut matching = Vec::new();
        for (index, set) in self.sets.iter().enumerate() {
            if set.may_alias(&location, aliases) {
                matching.push(index);
            }
        }

        let Some((&target, rest)) = matching.split_first() else {
            self.sets.push(AliasSet {
                locations: vec![location],
            });
            return true;
        };

        // Fold the other matching classes into the first one, back to front so indices hold.
        for &index in rest.iter().rev() {
            let merged = self.sets.remove(index);
            self.sets[target].locations.extend(merged.locations);
        }

        let target_set = &mut self.sets[target];
        if !target_set.locations.contains(&location) {
            target_set.locations.push(location);
        }

        false
    }

    /// Adds every location tracked by `other`.
    pub fn add_all(&mut self, other: &AliasSetTracker, aliases: &dyn AliasOracle) {
        for location in other.locations() {
            self.add(*location, aliases);
        }
    }

    /// The class `location` would join, if any.
    pub fn alias_set_for(
        &self,
        location: &MemoryLocation,
        aliases: &dyn AliasOracle,
    ) -> Option<&AliasSet> {
        self.sets.iter().find(|set| set.may_alias(location, aliases))
    }

    /// True if some tracked access went through the same base and touches part of `location`.
    pub fn has_explicit_access(&self, location: &MemoryLocation, aliases: &dyn AliasOracle) -> bool {
        self.locations().any(|member| {
            member.base == location.base && aliases.alias(member, location).may_overlap()
        })
    }
}
