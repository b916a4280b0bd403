//! # Defined Memory Analysis
//!
//! Hierarchical must/may-defined-memory analysis over a routine's region tree.
//!
//! Regions are processed children first. For each region:
//! 1. **Footprints**: every block gets a [`DefUseSet`] from the access enumerator, and every
//!    nested loop node reuses the summary collapsed from that loop.
//! 2. **Solve**: [`ReachingDefinitions`] is run to a fixed point over the region's graph.
//! 3. **Collapse**: the solved region is folded into a single summary for its parent.
//!
//! Solver cost is the sum of region sizes, never the size of the flattened routine.
//! Results live in a [`DefinedMemoryInfo`] owned by the caller and dropped with it.

pub mod collapse;
pub mod dataflow;
pub mod definitions;
pub mod footprint;
pub mod results;

pub use collapse::collapse_region;
pub use dataflow::{DataFlowProblem, RegionSolution, SolverStats, solve_forward, solve_forward_observed};
pub use definitions::{DefinitionInfo, PrivateDFValue, ReachingDefinitions};
pub use footprint::{DefUseSet, FootprintBuilder};
pub use results::DefinedMemoryInfo;

use crate::analysis_messages::analysis_errors::{AnalysisError, ErrorLocation};
use crate::memory::AliasOracle;
use crate::routine::{AccessEnumerator, EscapeOracle, NodeId, NodeKind, Region, RegionTree};
use crate::settings::AnalysisConfig;
use crate::{return_contract_error, timer_log};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::time::Instant;

/// Everything needed to analyse one routine. All collaborators are read-only.
#[derive(Clone, Copy)]
pub struct RoutineInput<'a> {
    pub tree: &'a RegionTree,
    pub accesses: &'a dyn AccessEnumerator,
    pub aliases: &'a dyn AliasOracle,
    pub escapes: &'a dyn EscapeOracle,
}

pub fn analyze_defined_memory(
    input: &RoutineInput<'_>,
    config: &AnalysisConfig,
) -> Result<DefinedMemoryInfo, AnalysisError> {
    let time = Instant::now();
    let tree = input.tree;
    let location = tree.error_location();

    tree.validate()?;

    let mut info = DefinedMemoryInfo::new(tree);
    let builder = FootprintBuilder {
        accesses: input.accesses,
        aliases: input.aliases,
        escapes: input.escapes,
        config,
        location: location.clone(),
    };

    for region_id in tree.post_order() {
        let region = tree.region_or_error(region_id)?;

        // ----------------------------------
        //            Footprints
        // ----------------------------------
        let footprints = build_region_footprints(tree, region, &builder, &info)?;

        // ----------------------------------
        //              Solve
        // ----------------------------------
        let problem = ReachingDefinitions {
            footprints: &footprints,
            aliases: input.aliases,
            location: location.clone(),
        };
        let solution = solve_forward(tree, region, &problem)?;

        // ----------------------------------
        //             Collapse
        // ----------------------------------
        let summary = collapse_region(
            region,
            &footprints,
            &solution,
            input.aliases,
            config,
            &location,
        )?;

        record_solution(tree, region, footprints, &solution, &mut info)?;
        info.set_region_summary(region_id, summary, solution.stats);
    }

    timer_log!(time, "Defined memory analysed in: ");

    Ok(info)
}

/// Analyses independent routines, on the rayon pool when the config allows it.
/// Routines share nothing mutable, so no locking is needed.
pub fn analyze_routines(
    inputs: &[RoutineInput<'_>],
    config: &AnalysisConfig,
) -> Vec<Result<DefinedMemoryInfo, AnalysisError>> {
    if config.parallel_routines {
        inputs
            .par_iter()
            .map(|input| analyze_defined_memory(input, config))
            .collect()
    } else {
        inputs
            .iter()
            .map(|input| analyze_defined_memory(input, config))
            .collect()
    }
}

fn build_region_footprints(
    tree: &RegionTree,
    region: &Region,
    builder: &FootprintBuilder<'_>,
    info: &DefinedMemoryInfo,
) -> Result<FxHashMap<NodeId, DefUseSet>, AnalysisError> {
    let mut footprints =
        FxHashMap::with_capacity_and_hasher(region.nodes.len(), Default::default());

    for node_id in &region.nodes {
        let node = tree.node_or_error(*node_id)?;
        let footprint = match &node.kind {
            NodeKind::Entry | NodeKind::Exit => DefUseSet::new(),
            NodeKind::Block { instructions } => builder.build_block(instructions)?,
            NodeKind::Region(child) => info.region_footprint(*child)?.clone(),
        };

        footprints.insert(*node_id, footprint);
    }

    Ok(footprints)
}

fn record_solution(
    tree: &RegionTree,
    region: &Region,
    mut footprints: FxHashMap<NodeId, DefUseSet>,
    solution: &RegionSolution<DefinitionInfo>,
    info: &mut DefinedMemoryInfo,
) -> Result<(), AnalysisError> {
    for node_id in &region.nodes {
        let (Some(input), Some(output)) = (solution.input(*node_id), solution.output(*node_id))
        else {
            return_contract_error!(
                format!("{} of region '{}' was never solved", node_id, region.name),
                tree.error_location(),
                {
                    AnalysisStage => "Reaching Definitions",
                }
            );
        };

        let value = PrivateDFValue {
            input: input.clone(),
            output: output.clone(),
        };

        if let NodeKind::Region(child) = tree.node_or_error(*node_id)?.kind {
            info.set_region_definitions(child, value.clone());
        }

        info.set_node_definitions(*node_id, value);
        if let Some(footprint) = footprints.remove(node_id) {
            info.set_node_footprint(*node_id, footprint);
        }
    }

    if region.parent.is_none() {
        let Some(exiting) = solution.output(region.exit) else {
            return_contract_error!(
                format!("Exit of routine body '{}' was never solved", region.name),
                ErrorLocation::new(tree.routine())
            );
        };

        info.set_region_definitions(
            region.id,
            PrivateDFValue {
                input: DefinitionInfo::boundary(),
                output: exiting.clone(),
            },
        );
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests;
