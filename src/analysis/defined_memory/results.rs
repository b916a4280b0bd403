//! Per-routine attribute store.
//!
//! Every node and region carries typed optional slots, filled in as the driver walks the tree
//! bottom-up. Reading an empty slot is a contract violation: it means someone asked for a
//! result that was never computed.

use crate::analysis::defined_memory::dataflow::SolverStats;
use crate::analysis::defined_memory::definitions::PrivateDFValue;
use crate::analysis::defined_memory::footprint::DefUseSet;
use crate::analysis_messages::analysis_errors::{AnalysisError, ErrorLocation};
use crate::memory::{AliasOracle, LocationSet, MemoryLocation, PointerId};
use crate::return_contract_error;
use crate::routine::{InstId, NodeId, RegionId, RegionTree};

#[derive(Debug, Clone, Default)]
pub struct NodeAttributes {
    pub def_use: Option<DefUseSet>,
    pub definitions: Option<PrivateDFValue>,
}

#[derive(Debug, Clone, Default)]
pub struct RegionAttributes {
    /// Collapsed footprint of the whole region.
    pub summary: Option<DefUseSet>,

    /// IN/OUT of the region's node in its parent graph. For the routine body, the boundary
    /// value and the value at its exit.
    pub definitions: Option<PrivateDFValue>,

    pub stats: Option<SolverStats>,
}

#[derive(Debug, Clone)]
pub struct DefinedMemoryInfo {
    routine: String,
    nodes: Vec<NodeAttributes>,
    regions: Vec<RegionAttributes>,
}

impl DefinedMemoryInfo {
    pub fn new(tree: &RegionTree) -> Self {
        Self {
            routine: tree.routine().to_owned(),
            nodes: vec![NodeAttributes::default(); tree.nodes().len()],
            regions: vec![RegionAttributes::default(); tree.regions().len()],
        }
    }

    pub fn routine(&self) -> &str {
        &self.routine
    }

    fn error_location(&self) -> ErrorLocation {
        ErrorLocation::new(self.routine.clone())
    }

    fn node_slot(&self, node: NodeId) -> Result<&NodeAttributes, AnalysisError> {
        match self.nodes.get(node.index()) {
            Some(slot) => Ok(slot),
            None => return_contract_error!(
                format!("{} doesn't belong to routine '{}'", node, self.routine),
                self.error_location(),
                {
                    AnalysisStage => "Result Lookup",
                }
            ),
        }
    }

    fn region_slot(&self, region: RegionId) -> Result<&RegionAttributes, AnalysisError> {
        match self.regions.get(region.index()) {
            Some(slot) => Ok(slot),
            None => return_contract_error!(
                format!("{} doesn't belong to routine '{}'", region, self.routine),
                self.error_location(),
                {
                    AnalysisStage => "Result Lookup",
                }
            ),
        }
    }

    pub fn node_footprint(&self, node: NodeId) -> Result<&DefUseSet, AnalysisError> {
        match &self.node_slot(node)?.def_use {
            Some(def_use) => Ok(def_use),
            None => return_contract_error!(
                format!("{} has no footprint yet", node),
                self.error_location(),
                {
                    AnalysisStage => "Result Lookup",
                }
            ),
        }
    }

    pub fn node_definitions(&self, node: NodeId) -> Result<&PrivateDFValue, AnalysisError> {
        match &self.node_slot(node)?.definitions {
            Some(value) => Ok(value),
            None => return_contract_error!(
                format!("{} hasn't been solved", node),
                self.error_location(),
                {
                    AnalysisStage => "Result Lookup",
                    PrimarySuggestion => "Query results only after the routine has been analysed",
                }
            ),
        }
    }

    pub fn region_footprint(&self, region: RegionId) -> Result<&DefUseSet, AnalysisError> {
        match &self.region_slot(region)?.summary {
            Some(summary) => Ok(summary),
            None => return_contract_error!(
                format!("{} hasn't been collapsed", region),
                self.error_location(),
                {
                    AnalysisStage => "Result Lookup",
                }
            ),
        }
    }

    pub fn region_definitions(&self, region: RegionId) -> Result<&PrivateDFValue, AnalysisError> {
        match &self.region_slot(region)?.definitions {
            Some(value) => Ok(value),
            None => return_contract_error!(
                format!("{} hasn't been solved in its parent", region),
                self.error_location(),
                {
                    AnalysisStage => "Result Lookup",
                    PrimarySuggestion => "Query results only after the routine has been analysed",
                }
            ),
        }
    }

    pub fn region_stats(&self, region: RegionId) -> Option<SolverStats> {
        self.regions.get(region.index()).and_then(|slot| slot.stats)
    }

    pub fn defs(&self, region: RegionId) -> Result<&LocationSet, AnalysisError> {
        Ok(self.region_footprint(region)?.defs())
    }

    pub fn may_defs(&self, region: RegionId) -> Result<&LocationSet, AnalysisError> {
        Ok(self.region_footprint(region)?.may_defs())
    }

    pub fn uses(&self, region: RegionId) -> Result<&LocationSet, AnalysisError> {
        Ok(self.region_footprint(region)?.uses())
    }

    pub fn has_explicit_access(
        &self,
        region: RegionId,
        location: &MemoryLocation,
        aliases: &dyn AliasOracle,
    ) -> Result<bool, AnalysisError> {
        Ok(self
            .region_footprint(region)?
            .has_explicit_access(location, aliases))
    }

    pub fn has_address_access(&self, region: RegionId, pointer: PointerId) -> Result<bool, AnalysisError> {
        Ok(self.region_footprint(region)?.has_address_access(pointer))
    }

    pub fn has_unknown_inst(&self, region: RegionId, inst: InstId) -> Result<bool, AnalysisError> {
        Ok(self.region_footprint(region)?.has_unknown_inst(inst))
    }

    pub(crate) fn set_node_footprint(&mut self, node: NodeId, def_use: DefUseSet) {
        if let Some(slot) = self.nodes.get_mut(node.index()) {
            slot.def_use = Some(def_use);
        }
    }

    pub(crate) fn set_node_definitions(&mut self, node: NodeId, value: PrivateDFValue) {
        if let Some(slot) = self.nodes.get_mut(node.index()) {
            slot.definitions = Some(value);
        }
    }

    pub(crate) fn set_region_summary(&mut self, region: RegionId, summary: DefUseSet, stats: SolverStats) {
        if let Some(slot) = self.regions.get_mut(region.index()) {
            slot.summary = Some(summary);
            slot.stats = Some(stats);
        }
    }

    pub(crate) fn set_region_definitions(&mut self, region: RegionId, value: PrivateDFValue) {
        if let Some(slot) = self.regions.get_mut(region.index()) {
            slot.definitions = Some(value);
        }
    }
}
