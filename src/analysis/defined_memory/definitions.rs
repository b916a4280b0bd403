use crate::analysis::defined_memory::dataflow::DataFlowProblem;
use crate::analysis::defined_memory::footprint::DefUseSet;
use crate::analysis_messages::analysis_errors::{AnalysisError, ErrorLocation};
use crate::memory::{AliasOracle, LocationLattice};
use crate::return_contract_error;
use crate::routine::NodeId;
use rustc_hash::FxHashMap;
use std::fmt;

/// Locations defined on every path (`must_reach`) and on some path (`may_reach`) to a point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionInfo {
    pub must_reach: LocationLattice,
    pub may_reach: LocationLattice,
}

impl DefinitionInfo {
    /// Identity of the meet: every location must-reaches, none may-reach.
    pub fn top() -> Self {
        Self {
            must_reach: LocationLattice::full(),
            may_reach: LocationLattice::empty(),
        }
    }

    /// Nothing is assumed defined on entry to a region.
    pub fn boundary() -> Self {
        Self {
            must_reach: LocationLattice::empty(),
            may_reach: LocationLattice::empty(),
        }
    }

    /// Returns true if the value changed.
    pub fn meet(&mut self, incoming: &DefinitionInfo) -> bool {
        let must_changed = self.must_reach.intersect(&incoming.must_reach);
        let may_changed = self.may_reach.merge(&incoming.may_reach);
        must_changed || may_changed
    }
}

impl fmt::Display for DefinitionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "must {} / may {}",
            LatticeDisplay(&self.must_reach),
            LatticeDisplay(&self.may_reach)
        )
    }
}

pub(crate) struct LatticeDisplay<'a>(pub &'a LocationLattice);

impl fmt::Display for LatticeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(set) = self.0.known_locations() else {
            return write!(f, "{{*}}");
        };

        write!(f, "{{")?;
        for (index, location) in set.sorted().iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{location}")?;
        }
        write!(f, "}}")
    }
}

/// IN and OUT values of one node, or of one region as seen from its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateDFValue {
    pub input: DefinitionInfo,
    pub output: DefinitionInfo,
}

/// Must/may reaching definitions over one region's graph.
///
/// Transfer, for a node with footprint `F`:
///   - `must' = (must - anything overlapping F.defs) + F.defs`
///   - `may'  = may + F.defs + F.may_defs`
///
/// A node that may write unknown memory clears `must` first. Uses are recorded on the
/// footprint and never flow through the lattice.
pub struct ReachingDefinitions<'a> {
    pub footprints: &'a FxHashMap<NodeId, DefUseSet>,
    pub aliases: &'a dyn AliasOracle,
    pub location: ErrorLocation,
}

impl DataFlowProblem for ReachingDefinitions<'_> {
    type Value = DefinitionInfo;

    fn top_element(&self) -> DefinitionInfo {
        DefinitionInfo::top()
    }

    fn boundary_condition(&self) -> DefinitionInfo {
        DefinitionInfo::boundary()
    }

    fn meet(&self, incoming: &DefinitionInfo, accumulated: &mut DefinitionInfo) {
        accumulated.meet(incoming);
    }

    fn transfer(&self, node: NodeId, input: &DefinitionInfo) -> Result<DefinitionInfo, AnalysisError> {
        let Some(footprint) = self.footprints.get(&node) else {
            return_contract_error!(
                format!("{} has no footprint to solve with", node),
                self.location.clone(),
                {
                    AnalysisStage => "Reaching Definitions",
                    PrimarySuggestion => "Build footprints for every node of a region before solving it",
                }
            );
        };

        let mut output = input.clone();
        if footprint.has_unknown_writes() {
            output.must_reach = LocationLattice::empty();
        }
        output.must_reach.kill_overlapping(footprint.defs(), self.aliases);
        output.must_reach.insert_all(footprint.defs());
        output.may_reach.insert_all(footprint.defs());
        output.may_reach.insert_all(footprint.may_defs());

        Ok(output)
    }
}
