//! ============================================================
//!                       Region Tree
//! ============================================================
//! Regions are the routine body and every natural loop inside it. Each region owns a small
//! forward data-flow graph:
//!   - a synthetic `Entry` node, where the boundary value enters
//!   - `Block` nodes holding straight-line instructions
//!   - `Region` nodes, each standing for a whole nested loop
//!   - a synthetic `Exit` node, which sees the value at the end of the region
//!
//! Loop regions also get a back edge from `Exit` to the loop header, so the value at the end
//! of one iteration flows into the next.
//!
//! Regions and nodes live in two arenas addressed by index. Parent/child links are ids, not
//! owning pointers, which lets collapse rewrite what a parent sees without aliasing issues.

use crate::analysis_messages::analysis_errors::{AnalysisError, ErrorLocation};
use crate::return_contract_error;
use crate::routine::ids::{InstId, NodeId, RegionId};
use rustc_hash::FxHashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Routine,
    Loop { executes_at_least_once: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Entry,
    Exit,
    Block { instructions: Vec<InstId> },
    Region(RegionId),
}

#[derive(Debug, Clone)]
pub struct DataFlowNode {
    pub id: NodeId,
    pub region: RegionId,
    pub kind: NodeKind,
    pub successors: Vec<NodeId>,
    pub predecessors: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub kind: RegionKind,
    pub parent: Option<RegionId>,
    pub children: Vec<RegionId>,
    pub entry: NodeId,
    pub exit: NodeId,

    /// Every node of this region's graph, entry first.
    pub nodes: Vec<NodeId>,

    /// The node that stands for this region inside its parent's graph.
    pub node_in_parent: Option<NodeId>,
}

impl Region {
    pub fn is_loop(&self) -> bool {
        matches!(self.kind, RegionKind::Loop { .. })
    }
}

#[derive(Debug, Clone)]
pub struct RegionTree {
    routine: String,
    regions: Vec<Region>,
    nodes: Vec<DataFlowNode>,
}

impl RegionTree {
    pub const ROOT: RegionId = RegionId(0);

    /// Takes raw arenas from an external region provider. Predecessor lists are rebuilt from
    /// the successor lists; nothing else is checked until [`RegionTree::validate`].
    pub fn from_parts(routine: impl Into<String>, regions: Vec<Region>, mut nodes: Vec<DataFlowNode>) -> Self {
        for node in &mut nodes {
            node.predecessors.clear();
        }

        let edges = nodes
            .iter()
            .flat_map(|node| node.successors.iter().map(move |successor| (node.id, *successor)))
            .collect::<Vec<_>>();

        for (from, to) in edges {
            if let Some(target) = nodes.get_mut(to.index()) {
                if !target.predecessors.contains(&from) {
                    target.predecessors.push(from);
                }
            }
        }

        Self {
            routine: routine.into(),
            regions,
            nodes,
        }
    }

    pub fn routine(&self) -> &str {
        &self.routine
    }

    pub fn root(&self) -> RegionId {
        Self::ROOT
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn nodes(&self) -> &[DataFlowNode] {
        &self.nodes
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id.index())
    }

    pub fn node(&self, id: NodeId) -> Option<&DataFlowNode> {
        self.nodes.get(id.index())
    }

    pub fn region_by_name(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|region| region.name == name)
    }

    pub(crate) fn error_location(&self) -> ErrorLocation {
        ErrorLocation::new(self.routine.clone())
    }

    pub(crate) fn region_or_error(&self, id: RegionId) -> Result<&Region, AnalysisError> {
        match self.regions.get(id.index()) {
            Some(region) => Ok(region),
            None => return_contract_error!(
                format!("Region tree of '{}' has no region {}", self.routine, id),
                self.error_location(),
                {
                    AnalysisStage => "Region Lookup",
                }
            ),
        }
    }

    pub(crate) fn node_or_error(&self, id: NodeId) -> Result<&DataFlowNode, AnalysisError> {
        match self.nodes.get(id.index()) {
            Some(node) => Ok(node),
            None => return_contract_error!(
                format!("Region tree of '{}' has no node {}", self.routine, id),
                self.error_location(),
                {
                    AnalysisStage => "Region Lookup",
                }
            ),
        }
    }

    /// Checks every structural precondition the solver relies on.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let location = self.error_location();

        let Some(root) = self.regions.first() else {
            return_contract_error!(
                format!("Region tree of '{}' has no root region", self.routine),
                location,
                {
                    AnalysisStage => "Region Validation",
                }
            );
        };

        if root.kind != RegionKind::Routine || root.parent.is_some() || root.node_in_parent.is_some() {
            return_contract_error!(
                format!("Root region '{}' must be the routine body with no parent", root.name),
                location,
                {
                    AnalysisStage => "Region Validation",
                }
            );
        }

        for (index, region) in self.regions.iter().enumerate() {
            if region.id.index() != index {
                return_contract_error!(
                    format!("Region '{}' is stored at index {} but claims id {}", region.name, index, region.id),
                    location,
                    {
                        AnalysisStage => "Region Validation",
                    }
                );
            }

            if index != 0 && region.kind == RegionKind::Routine {
                return_contract_error!(
                    format!("Region '{}' is a nested routine body", region.name),
                    location,
                    {
                        AnalysisStage => "Region Validation",
                    }
                );
            }

            self.validate_parent_link(region)?;
            self.validate_children(region)?;
            self.validate_graph(region)?;
        }

        for (index, node) in self.nodes.iter().enumerate() {
            if node.id.index() != index {
                return_contract_error!(
                    format!("Node stored at index {} claims id {}", index, node.id),
                    location,
                    {
                        AnalysisStage => "Region Validation",
                    }
                );
            }

            let owner = self.region_or_error(node.region)?;
            if !owner.nodes.contains(&node.id) {
                return_contract_error!(
                    format!("{} claims region '{}' but isn't part of its graph", node.id, owner.name),
                    location,
                    {
                        AnalysisStage => "Region Validation",
                    }
                );
            }
        }

        self.validate_acyclic()
    }

    fn validate_parent_link(&self, region: &Region) -> Result<(), AnalysisError> {
        let location = self.error_location();

        let Some(parent_id) = region.parent else {
            if region.id != Self::ROOT {
                return_contract_error!(
                    format!("Region '{}' has no parent", region.name),
                    location,
                    {
                        AnalysisStage => "Region Validation",
                        PrimarySuggestion => "Every loop region must be nested in the routine body or another loop",
                    }
                );
            }
            return Ok(());
        };

        let parent = self.region_or_error(parent_id)?;
        if !parent.children.contains(&region.id) {
            return_contract_error!(
                format!("Region '{}' names '{}' as parent, but the parent doesn't list it", region.name, parent.name),
                location,
                {
                    AnalysisStage => "Region Validation",
                }
            );
        }

        let Some(node_id) = region.node_in_parent else {
            return_contract_error!(
                format!("Region '{}' has no node in its parent's graph", region.name),
                location,
                {
                    AnalysisStage => "Region Validation",
                }
            );
        };

        let node = self.node_or_error(node_id)?;
        if node.kind != NodeKind::Region(region.id) || node.region != parent_id {
            return_contract_error!(
                format!("{} doesn't stand for region '{}' inside '{}'", node_id, region.name, parent.name),
                location,
                {
                    AnalysisStage => "Region Validation",
                }
            );
        }

        Ok(())
    }

    fn validate_children(&self, region: &Region) -> Result<(), AnalysisError> {
        for child_id in &region.children {
            let child = self.region_or_error(*child_id)?;
            if child.parent != Some(region.id) {
                return_contract_error!(
                    format!("Region '{}' lists '{}' as a child with a different parent", region.name, child.name),
                    self.error_location(),
                    {
                        AnalysisStage => "Region Validation",
                    }
                );
            }
        }

        Ok(())
    }

    fn validate_graph(&self, region: &Region) -> Result<(), AnalysisError> {
        let location = self.error_location();

        let entry = self.node_or_error(region.entry)?;
        let exit = self.node_or_error(region.exit)?;
        if entry.kind != NodeKind::Entry || exit.kind != NodeKind::Exit {
            return_contract_error!(
                format!("Region '{}' has a malformed entry or exit node", region.name),
                location,
                {
                    AnalysisStage => "Region Validation",
                }
            );
        }

        if region.nodes.first() != Some(&region.entry) || !region.nodes.contains(&region.exit) {
            return_contract_error!(
                format!("Region '{}' must list its entry first and include its exit", region.name),
                location,
                {
                    AnalysisStage => "Region Validation",
                }
            );
        }

        if !entry.predecessors.is_empty() {
            return_contract_error!(
                format!("Entry of region '{}' has predecessors", region.name),
                location,
                {
                    AnalysisStage => "Region Validation",
                }
            );
        }

        for node_id in &region.nodes {
            let node = self.node_or_error(*node_id)?;
            if node.region != region.id {
                return_contract_error!(
                    format!("{} is listed by region '{}' but owned by {}", node.id, region.name, node.region),
                    location,
                    {
                        AnalysisStage => "Region Validation",
                        Node => "graph membership",
                    }
                );
            }

            for successor in &node.successors {
                let target = self.node_or_error(*successor)?;
                if target.region != region.id {
                    return_contract_error!(
                        format!("Edge {} -> {} leaves region '{}'", node.id, successor, region.name),
                        location,
                        {
                            AnalysisStage => "Region Validation",
                            PrimarySuggestion => "Route edges out of a loop through its exit node",
                        }
                    );
                }
            }
        }

        Ok(())
    }

    fn validate_acyclic(&self) -> Result<(), AnalysisError> {
        let mut visited = FxHashSet::default();
        let mut stack = vec![Self::ROOT];

        while let Some(region_id) = stack.pop() {
            if !visited.insert(region_id) {
                return_contract_error!(
                    format!("Region {} is reachable twice in the region tree of '{}'", region_id, self.routine),
                    self.error_location(),
                    {
                        AnalysisStage => "Region Validation",
                    }
                );
            }

            let region = self.region_or_error(region_id)?;
            stack.extend(region.children.iter().copied());
        }

        if visited.len() != self.regions.len() {
            return_contract_error!(
                format!("Region tree of '{}' has regions unreachable from the routine body", self.routine),
                self.error_location(),
                {
                    AnalysisStage => "Region Validation",
                }
            );
        }

        Ok(())
    }

    /// Regions with every child before its parent, root last.
    pub fn post_order(&self) -> Vec<RegionId> {
        let mut order = Vec::with_capacity(self.regions.len());
        // (region, children already pushed)
        let mut stack = vec![(Self::ROOT, false)];

        while let Some((region_id, expanded)) = stack.pop() {
            if expanded {
                order.push(region_id);
                continue;
            }

            stack.push((region_id, true));
            if let Some(region) = self.region(region_id) {
                for child in region.children.iter().rev() {
                    stack.push((*child, false));
                }
            }
        }

        order
    }
}

/// Builds a well-formed [`RegionTree`].
///
/// Ids handed out by the builder are always valid; passing ids from another builder panics.
#[derive(Debug)]
pub struct RegionTreeBuilder {
    routine: String,
    regions: Vec<Region>,
    nodes: Vec<DataFlowNode>,
}

impl RegionTreeBuilder {
    pub fn new(routine: impl Into<String>) -> Self {
        let routine = routine.into();
        let mut builder = Self {
            routine: routine.clone(),
            regions: Vec::new(),
            nodes: Vec::new(),
        };
        builder.push_region(routine, RegionKind::Routine, None);
        builder
    }

    pub fn root(&self) -> RegionId {
        RegionTree::ROOT
    }

    pub fn entry(&self, region: RegionId) -> NodeId {
        self.regions[region.index()].entry
    }

    pub fn exit(&self, region: RegionId) -> NodeId {
        self.regions[region.index()].exit
    }

    /// The node standing for `region` in its parent's graph.
    pub fn region_node(&self, region: RegionId) -> Option<NodeId> {
        self.regions[region.index()].node_in_parent
    }

    pub fn region_of_node(&self, node: NodeId) -> RegionId {
        self.nodes[node.index()].region
    }

    /// Adds a loop nested in `parent`. Connect the loop's node in the parent graph with
    /// [`RegionTreeBuilder::region_node`].
    pub fn add_loop(
        &mut self,
        parent: RegionId,
        name: impl Into<String>,
        executes_at_least_once: bool,
    ) -> RegionId {
        let region = self.push_region(
            name.into(),
            RegionKind::Loop {
                executes_at_least_once,
            },
            Some(parent),
        );

        let node = self.push_node(parent, NodeKind::Region(region));
        self.regions[region.index()].node_in_parent = Some(node);
        self.regions[parent.index()].children.push(region);
        region
    }

    pub fn add_block(&mut self, region: RegionId, instructions: Vec<InstId>) -> NodeId {
        self.push_node(region, NodeKind::Block { instructions })
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        let successors = &mut self.nodes[from.index()].successors;
        if !successors.contains(&to) {
            successors.push(to);
        }
    }

    /// Chains `nodes` one after another, from the region's entry to its exit.
    pub fn add_path(&mut self, region: RegionId, nodes: &[NodeId]) {
        let mut previous = self.entry(region);
        for node in nodes {
            self.add_edge(previous, *node);
            previous = *node;
        }
        let exit = self.exit(region);
        self.add_edge(previous, exit);
    }

    /// Nodes left without successors fall through to their region's exit, and every loop
    /// exit gets a back edge to the loop header(s).
    pub fn finish(mut self) -> RegionTree {
        for index in 0..self.nodes.len() {
            let node = &self.nodes[index];
            if node.successors.is_empty() && node.kind != NodeKind::Exit {
                let exit = self.regions[node.region.index()].exit;
                self.nodes[index].successors.push(exit);
            }
        }

        for region_index in 0..self.regions.len() {
            let region = &self.regions[region_index];
            if !region.is_loop() {
                continue;
            }

            let (entry, exit) = (region.entry, region.exit);
            let headers = self.nodes[entry.index()]
                .successors
                .iter()
                .copied()
                .filter(|header| *header != exit)
                .collect::<Vec<_>>();

            for header in headers {
                self.add_edge(exit, header);
            }
        }

        RegionTree::from_parts(self.routine, self.regions, self.nodes)
    }

    fn push_region(&mut self, name: String, kind: RegionKind, parent: Option<RegionId>) -> RegionId {
        let id = RegionId(self.regions.len() as u32);
        self.regions.push(Region {
            id,
            name,
            kind,
            parent,
            children: Vec::new(),
            entry: NodeId(0),
            exit: NodeId(0),
            nodes: Vec::new(),
            node_in_parent: None,
        });

        let entry = self.push_node(id, NodeKind::Entry);
        let exit = self.push_node(id, NodeKind::Exit);
        let region = &mut self.regions[id.index()];
        region.entry = entry;
        region.exit = exit;
        id
    }

    fn push_node(&mut self, region: RegionId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(DataFlowNode {
            id,
            region,
            kind,
            successors: Vec::new(),
            predecessors: Vec::new(),
        });
        self.regions[region.index()].nodes.push(id);
        id
    }
}
