//! # Forward Data-Flow Solver
//!
//! Generic worklist solver over one region's graph. The problem supplies the lattice
//! (top element, boundary condition, meet) and the transfer function; the solver only knows
//! the graph shape.
//!
//! Every OUT value starts at top and is only ever lowered by meet, so each node changes a
//! bounded number of times and the loop terminates on any finite lattice.

use crate::analysis_messages::analysis_errors::AnalysisError;
use crate::routine::{NodeId, Region, RegionTree};
use crate::settings::NODES_PER_REGION_GUESS;
use crate::solver_log;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::fmt;

pub trait DataFlowProblem {
    type Value: Clone + PartialEq + fmt::Debug;

    /// Initial value of every node that isn't the entry. Identity of `meet`.
    fn top_element(&self) -> Self::Value;

    /// Value entering the region at its entry node.
    fn boundary_condition(&self) -> Self::Value;

    /// Folds a predecessor's OUT value into the value being accumulated.
    fn meet(&self, incoming: &Self::Value, accumulated: &mut Self::Value);

    fn transfer(&self, node: NodeId, input: &Self::Value) -> Result<Self::Value, AnalysisError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub nodes: usize,
    pub transfers: usize,
    pub changed_outputs: usize,
}

#[derive(Debug, Clone)]
pub struct RegionSolution<V> {
    pub inputs: FxHashMap<NodeId, V>,
    pub outputs: FxHashMap<NodeId, V>,
    pub stats: SolverStats,
}

impl<V> RegionSolution<V> {
    pub fn input(&self, node: NodeId) -> Option<&V> {
        self.inputs.get(&node)
    }

    pub fn output(&self, node: NodeId) -> Option<&V> {
        self.outputs.get(&node)
    }
}

pub fn solve_forward<P: DataFlowProblem>(
    tree: &RegionTree,
    region: &Region,
    problem: &P,
) -> Result<RegionSolution<P::Value>, AnalysisError> {
    solve_forward_observed(tree, region, problem, |_, _| {})
}

/// Same as [`solve_forward`], calling `observe` with every new OUT value as it's stored.
pub fn solve_forward_observed<P: DataFlowProblem>(
    tree: &RegionTree,
    region: &Region,
    problem: &P,
    mut observe: impl FnMut(NodeId, &P::Value),
) -> Result<RegionSolution<P::Value>, AnalysisError> {
    let capacity = region.nodes.len().max(NODES_PER_REGION_GUESS);
    let mut inputs = FxHashMap::with_capacity_and_hasher(capacity, Default::default());
    let mut outputs = FxHashMap::with_capacity_and_hasher(capacity, Default::default());
    let mut stats = SolverStats {
        nodes: region.nodes.len(),
        ..SolverStats::default()
    };

    for node_id in &region.nodes {
        let top = problem.top_element();
        observe(*node_id, &top);
        outputs.insert(*node_id, top);
    }

    let mut worklist: VecDeque<NodeId> = region.nodes.iter().copied().collect();
    let mut queued: FxHashSet<NodeId> = region.nodes.iter().copied().collect();

    while let Some(node_id) = worklist.pop_front() {
        queued.remove(&node_id);
        let node = tree.node_or_error(node_id)?;

        let input = if node_id == region.entry {
            problem.boundary_condition()
        } else {
            let mut accumulated = problem.top_element();
            for predecessor in &node.predecessors {
                if let Some(incoming) = outputs.get(predecessor) {
                    problem.meet(incoming, &mut accumulated);
                }
            }
            accumulated
        };

        let output = problem.transfer(node_id, &input)?;
        stats.transfers += 1;
        inputs.insert(node_id, input);

        if outputs.get(&node_id) == Some(&output) {
            continue;
        }

        observe(node_id, &output);
        outputs.insert(node_id, output);
        stats.changed_outputs += 1;

        for successor in &node.successors {
            if queued.insert(*successor) {
                worklist.push_back(*successor);
            }
        }
    }

    solver_log!(
        "Solved ", Dark Magenta {region.name.as_str()}, ": ",
        {stats.transfers}, " transfers over ", {stats.nodes}, " nodes"
    );

    Ok(RegionSolution {
        inputs,
        outputs,
        stats,
    })
}
