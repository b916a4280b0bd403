//! Privatization Classification
//!
//! Decides, for every location explicitly accessed in a solved loop, whether each iteration
//! could work on its own copy:
//! - Unknown instructions or evaluated addresses → shared
//! - Never written → read only
//! - Read before written (value crosses iterations) → dependency
//! - Otherwise private, with the copy-out flavour picked by must/may definition and liveness
//!
//! Only the result interface of [`DefinedMemoryInfo`] is used. Reductions and induction
//! variables need instruction semantics and aren't recognised here.

use crate::analysis::defined_memory::DefinedMemoryInfo;
use crate::analysis_messages::analysis_errors::AnalysisError;
use crate::memory::{AliasOracle, LocationSet, MemoryLocation};
use crate::return_contract_error;
use crate::routine::{RegionId, RegionTree};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivatizationKind {
    /// Must-defined every iteration, dead after the loop.
    Private,

    /// Must-defined every iteration and live after the loop: copy out the last iteration.
    LastPrivate,

    /// Only conditionally defined and live after the loop: copy out the last iteration
    /// that wrote it.
    SecondToLastPrivate,

    /// Only conditionally defined, dead after the loop.
    DynamicPrivate,

    ReadOnly,
    Dependency,
    Shared,
}

impl PrivatizationKind {
    pub fn is_private(self) -> bool {
        matches!(
            self,
            Self::Private | Self::LastPrivate | Self::SecondToLastPrivate | Self::DynamicPrivate
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::LastPrivate => "last_private",
            Self::SecondToLastPrivate => "second_to_last_private",
            Self::DynamicPrivate => "dynamic_private",
            Self::ReadOnly => "read_only",
            Self::Dependency => "dependency",
            Self::Shared => "shared",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrivatizationTraits {
    pub kind: PrivatizationKind,

    /// Only part of a larger explicitly accessed object is written, so the private copy must
    /// start from the value before the loop.
    pub first_private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivatizationCandidate {
    pub location: MemoryLocation,
    pub traits: PrivatizationTraits,
}

/// Classifies every explicitly accessed location of loop `region`.
///
/// `live_out` holds the locations that may be read after the loop finishes.
pub fn classify_loop(
    tree: &RegionTree,
    info: &DefinedMemoryInfo,
    region: RegionId,
    live_out: &LocationSet,
    aliases: &dyn AliasOracle,
) -> Result<Vec<PrivatizationCandidate>, AnalysisError> {
    let loop_region = tree.region_or_error(region)?;
    if !loop_region.is_loop() {
        return_contract_error!(
            format!("Only loops can be privatized, '{}' is the routine body", loop_region.name),
            tree.error_location(),
            {
                AnalysisStage => "Privatization",
                Region => "routine body",
            }
        );
    }

    let footprint = info.region_footprint(region)?;

    // Must-defined at the end of one iteration, regardless of whether the loop runs at all
    let iteration_end = &info.node_definitions(loop_region.exit)?.output;

    let mut candidates = Vec::new();
    for set in footprint.explicit_accesses().sets() {
        let mut class = Vec::with_capacity(set.len());

        for location in set.locations() {
            let kind = if footprint.has_unknown_insts() || footprint.has_address_access(location.base)
            {
                PrivatizationKind::Shared
            } else if !footprint.defs().overlap(location, aliases)
                && !footprint.may_defs().overlap(location, aliases)
            {
                PrivatizationKind::ReadOnly
            } else if footprint.uses().overlap(location, aliases) {
                PrivatizationKind::Dependency
            } else {
                let must = iteration_end.must_reach.covers(location);
                let live = live_out.overlap(location, aliases);
                match (must, live) {
                    (true, true) => PrivatizationKind::LastPrivate,
                    (true, false) => PrivatizationKind::Private,
                    (false, true) => PrivatizationKind::SecondToLastPrivate,
                    (false, false) => PrivatizationKind::DynamicPrivate,
                }
            };

            class.push((*location, kind));
        }

        // A whole alias class shares the most restrictive blocking verdict
        let blocking = class
            .iter()
            .map(|(_, kind)| *kind)
            .filter(|kind| matches!(kind, PrivatizationKind::Shared | PrivatizationKind::Dependency))
            .max();

        for (location, kind) in class {
            let kind = match blocking {
                Some(blocking) if kind.is_private() => blocking,
                _ => kind,
            };

            let first_private = kind.is_private()
                && footprint
                    .explicit_accesses()
                    .locations()
                    .any(|other| *other != location && other.covers(&location));

            candidates.push(PrivatizationCandidate {
                location,
                traits: PrivatizationTraits {
                    kind,
                    first_private,
                },
            });
        }
    }

    candidates.sort_by_key(|candidate| candidate.location);
    Ok(candidates)
}

#[cfg(test)]
mod tests;
