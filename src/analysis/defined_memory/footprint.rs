//! Per-node footprints: what a block of straight-line instructions defines and uses.
//!
//! The builder walks instructions in program order and asks the access enumerator what each
//! one touches. It only ever widens toward the conservative side:
//!   - a read is outward-exposed unless an earlier must-definition in the same block covers it
//!   - a write through a location that may have escaped is never a must-definition
//!   - an instruction with no resolved effect may read and may write anything seen before it

use crate::analysis_messages::analysis_errors::{AnalysisError, ErrorLocation};
use crate::memory::{AliasOracle, AliasSetTracker, LocationSet, MemoryLocation, PointerId};
use crate::routine::{
    AccessEnumerator, AccessInfo, EscapeOracle, InstId, MemoryAccess, UnknownAccess,
};
use crate::settings::AnalysisConfig;
use crate::{footprint_log, return_contract_error};
use rustc_hash::{FxHashMap, FxHashSet};

/// Memory footprint of one node or one collapsed region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefUseSet {
    defs: LocationSet,
    may_defs: LocationSet,
    uses: LocationSet,
    explicit_accesses: AliasSetTracker,
    address_accesses: FxHashSet<PointerId>,
    unknown_insts: FxHashMap<InstId, UnknownAccess>,
}

impl DefUseSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defs(&self) -> &LocationSet {
        &self.defs
    }

    pub fn may_defs(&self) -> &LocationSet {
        &self.may_defs
    }

    pub fn uses(&self) -> &LocationSet {
        &self.uses
    }

    pub fn explicit_accesses(&self) -> &AliasSetTracker {
        &self.explicit_accesses
    }

    pub fn address_accesses(&self) -> &FxHashSet<PointerId> {
        &self.address_accesses
    }

    pub fn unknown_insts(&self) -> &FxHashMap<InstId, UnknownAccess> {
        &self.unknown_insts
    }

    pub fn has_def(&self, location: &MemoryLocation) -> bool {
        self.defs.contains(location)
    }

    pub fn has_may_def(&self, location: &MemoryLocation) -> bool {
        self.may_defs.contains(location)
    }

    pub fn has_use(&self, location: &MemoryLocation) -> bool {
        self.uses.contains(location)
    }

    pub fn has_explicit_access(&self, location: &MemoryLocation, aliases: &dyn AliasOracle) -> bool {
        self.explicit_accesses.has_explicit_access(location, aliases)
    }

    pub fn has_address_access(&self, pointer: PointerId) -> bool {
        self.address_accesses.contains(&pointer)
    }

    pub fn has_unknown_inst(&self, inst: InstId) -> bool {
        self.unknown_insts.contains_key(&inst)
    }

    pub fn has_unknown_insts(&self) -> bool {
        !self.unknown_insts.is_empty()
    }

    pub fn has_unknown_writes(&self) -> bool {
        self.unknown_insts.values().any(|access| access.write.is_any())
    }

    pub fn add_def(&mut self, location: MemoryLocation) -> bool {
        self.defs.insert(location)
    }

    pub fn add_may_def(&mut self, location: MemoryLocation) -> bool {
        self.may_defs.insert(location)
    }

    pub fn add_use(&mut self, location: MemoryLocation) -> bool {
        self.uses.insert(location)
    }

    pub fn add_explicit_access(&mut self, location: MemoryLocation, aliases: &dyn AliasOracle) {
        self.explicit_accesses.add(location, aliases);
    }

    pub fn add_address_access(&mut self, pointer: PointerId) -> bool {
        self.address_accesses.insert(pointer)
    }

    /// Records an instruction whose effect couldn't be pinned to locations.
    /// An unknown access must read or write something.
    pub fn add_unknown_inst(
        &mut self,
        inst: InstId,
        access: UnknownAccess,
        location: &ErrorLocation,
    ) -> Result<(), AnalysisError> {
        if !access.read.is_any() && !access.write.is_any() {
            return_contract_error!(
                format!("{} was reported as an unknown access that neither reads nor writes", inst),
                location.clone(),
                {
                    AnalysisStage => "Footprint",
                    PrimarySuggestion => "Report instructions without memory effects as having no accesses",
                }
            );
        }

        let entry = self.unknown_insts.entry(inst).or_insert(UnknownAccess {
            read: AccessInfo::No,
            write: AccessInfo::No,
        });
        entry.read = entry.read.max(access.read);
        entry.write = entry.write.max(access.write);
        Ok(())
    }

    /// True if a must-definition already recorded here covers all of `location`.
    pub fn is_defined_locally(&self, location: &MemoryLocation) -> bool {
        self.defs.covers(location)
    }

    /// Moves every must-definition to the may-definitions.
    pub fn downgrade_defs(&mut self) {
        let defs = std::mem::take(&mut self.defs);
        self.may_defs.merge(&defs);
    }

    /// Every location this footprint has seen so far.
    fn tracked_locations(&self) -> Vec<MemoryLocation> {
        self.explicit_accesses
            .locations()
            .chain(self.defs.iter())
            .chain(self.may_defs.iter())
            .copied()
            .collect()
    }

    /// Applies one unknown instruction at its place in program order.
    ///
    /// An unknown read may observe any location seen so far that no earlier must-definition
    /// covers. An unknown write may clobber any of them, so the must-definitions made so far
    /// become may-definitions. Accesses after the instruction are untouched: a later Must
    /// write defines its location again.
    pub fn apply_unknown_access(&mut self, access: UnknownAccess) {
        let tracked = self.tracked_locations();

        if access.read.is_any() {
            for location in &tracked {
                if !self.is_defined_locally(location) {
                    self.uses.insert(*location);
                }
            }
        }

        if access.write.is_any() {
            self.downgrade_defs();
            self.may_defs.extend(tracked);
        }
    }

    /// Widens a collapsed region for the unknown instructions inside it.
    ///
    /// Must-definitions are left alone: they already had to survive every unknown write to
    /// reach the region exit. When the region repeats, each unknown instruction also runs
    /// before every access of the next iteration, so an unknown read exposes every tracked
    /// location.
    pub fn widen_for_unknown_insts(&mut self, repeats: bool) {
        let (reads, writes) = self
            .unknown_insts
            .values()
            .fold((false, false), |(reads, writes), access| {
                (reads || access.read.is_any(), writes || access.write.is_any())
            });

        let tracked = self.tracked_locations();

        if writes {
            for location in &tracked {
                if !self.defs.contains(location) {
                    self.may_defs.insert(*location);
                }
            }
        }

        if reads && repeats {
            self.uses.extend(tracked);
        }
    }

    /// Adds everything `other` touched as explicit, address and unknown accesses.
    pub fn merge_accesses(&mut self, other: &DefUseSet, aliases: &dyn AliasOracle) {
        self.explicit_accesses.add_all(&other.explicit_accesses, aliases);
        self.address_accesses
            .extend(other.address_accesses.iter().copied());
        for (inst, access) in &other.unknown_insts {
            let entry = self.unknown_insts.entry(*inst).or_insert(*access);
            entry.read = entry.read.max(access.read);
            entry.write = entry.write.max(access.write);
        }
    }
}

/// Read-only collaborators needed to build footprints for one routine.
pub struct FootprintBuilder<'a> {
    pub accesses: &'a dyn AccessEnumerator,
    pub aliases: &'a dyn AliasOracle,
    pub escapes: &'a dyn EscapeOracle,
    pub config: &'a AnalysisConfig,
    pub location: ErrorLocation,
}

impl<'a> FootprintBuilder<'a> {
    /// Footprint of one block. Each instruction is enumerated exactly once.
    pub fn build_block(&self, instructions: &[InstId]) -> Result<DefUseSet, AnalysisError> {
        let mut footprint = DefUseSet::new();

        for inst in instructions {
            match self.accesses.memory_effects(*inst) {
                Some(effects) => {
                    for access in &effects.accesses {
                        self.record_access(&mut footprint, access);
                    }

                    if let Some(unknown) = effects.unknown {
                        footprint.add_unknown_inst(*inst, unknown, &self.location)?;
                        footprint.apply_unknown_access(unknown);
                    }
                }

                // Unresolved instructions get the most conservative reading
                None => {
                    footprint_log!(Yellow "Unresolved effect for ", inst, ", treating as unknown memory");
                    let unknown = UnknownAccess::conservative();
                    footprint.add_unknown_inst(*inst, unknown, &self.location)?;
                    footprint.apply_unknown_access(unknown);
                }
            }
        }

        footprint_log!(
            "Footprint: defs ", {footprint.defs.len()},
            ", may defs ", {footprint.may_defs.len()},
            ", uses ", {footprint.uses.len()}
        );

        Ok(footprint)
    }

    fn record_access(&self, footprint: &mut DefUseSet, access: &MemoryAccess) {
        let location = access.location;

        if access.is_address_only() {
            footprint.add_address_access(location.base);
            return;
        }

        footprint.add_explicit_access(location, self.aliases);

        let escaped = self.escapes.may_escape(&location);
        if escaped {
            footprint.add_address_access(location.base);
        }

        // Reads come first: `x = x + 1` uses the incoming value of x
        if access.read.is_any() && !footprint.is_defined_locally(&location) {
            footprint.add_use(location);
        }

        let write = if escaped && self.config.downgrade_escaped_writes {
            access.write.at_most_may()
        } else {
            access.write
        };

        match write {
            AccessInfo::Must => {
                footprint.add_def(location);
            }
            AccessInfo::May => {
                footprint.add_may_def(location);
            }
            AccessInfo::No => {}
        }
    }
}
