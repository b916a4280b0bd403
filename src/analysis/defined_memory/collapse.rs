//! Folding a solved region into one footprint for its parent's graph.
//!
//! The summary keeps only what the parent can observe:
//!   - `defs`: locations a node must-defines that still must-reach the region exit
//!   - `may_defs`: every other write in the region
//!   - `uses`: node uses not covered by the must-reaching value at that node's input
//!
//! A loop that may run zero times can't promise any definition, so all of its defs are
//! downgraded. Sub-range definitions stay sub-range: defining 2 bytes of a 4 byte variable
//! never becomes a definition of the whole variable.

use crate::analysis::defined_memory::dataflow::RegionSolution;
use crate::analysis::defined_memory::definitions::DefinitionInfo;
use crate::analysis::defined_memory::footprint::DefUseSet;
use crate::analysis_messages::analysis_errors::{AnalysisError, ErrorLocation};
use crate::memory::AliasOracle;
use crate::routine::{NodeId, Region, RegionKind};
use crate::settings::AnalysisConfig;
use crate::{collapse_log, return_contract_error};
use rustc_hash::FxHashMap;

pub fn collapse_region(
    region: &Region,
    footprints: &FxHashMap<NodeId, DefUseSet>,
    solution: &RegionSolution<DefinitionInfo>,
    aliases: &dyn AliasOracle,
    config: &AnalysisConfig,
    location: &ErrorLocation,
) -> Result<DefUseSet, AnalysisError> {
    let Some(exiting) = solution.output(region.exit) else {
        return_contract_error!(
            format!("Region '{}' was collapsed before its exit was solved", region.name),
            location.clone(),
            {
                AnalysisStage => "Collapse",
            }
        );
    };

    let mut summary = DefUseSet::new();

    for node_id in &region.nodes {
        let (Some(footprint), Some(input)) = (footprints.get(node_id), solution.input(*node_id))
        else {
            return_contract_error!(
                format!("{} of region '{}' has no footprint or solved input", node_id, region.name),
                location.clone(),
                {
                    AnalysisStage => "Collapse",
                    PrimarySuggestion => "Solve a region completely before collapsing it",
                }
            );
        };

        for used in footprint.uses().iter() {
            if !input.must_reach.covers(used) {
                summary.add_use(*used);
            }
        }

        for defined in footprint.defs().iter() {
            if exiting.must_reach.covers(defined) {
                summary.add_def(*defined);
            } else {
                summary.add_may_def(*defined);
            }
        }

        for defined in footprint.may_defs().iter() {
            summary.add_may_def(*defined);
        }

        summary.merge_accesses(footprint, aliases);
    }

    if !executes_at_least_once(region, config) {
        summary.downgrade_defs();
    }

    summary.widen_for_unknown_insts(region.is_loop());

    collapse_log!(
        "Collapsed ", Dark Magenta {region.name.as_str()}, ": defs ", {summary.defs().len()},
        ", may defs ", {summary.may_defs().len()}, ", uses ", {summary.uses().len()}
    );

    Ok(summary)
}

fn executes_at_least_once(region: &Region, config: &AnalysisConfig) -> bool {
    match region.kind {
        RegionKind::Routine => true,
        RegionKind::Loop {
            executes_at_least_once,
        } => executes_at_least_once || config.assume_loops_execute,
    }
}
