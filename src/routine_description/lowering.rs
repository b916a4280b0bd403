//! Turns a [`RoutineDescription`] into a region tree and table-backed collaborators.

use crate::analysis_messages::analysis_errors::{AnalysisError, ErrorLocation};
use crate::memory::{LocationSet, MemoryLocation, PointerId, RangeAliasOracle};
use crate::return_description_error;
use crate::routine::{
    AccessEnumerator, AccessInfo, EscapeOracle, InstId, InstructionEffects, MemoryAccess, NodeId,
    RegionId, RegionTree, RegionTreeBuilder, UnknownAccess,
};
use crate::routine_description::format::{
    BlockDescription, EXIT_NODE_NAME, InstructionDescription, OpKind, RegionExpectation,
    RoutineDescription,
};
use crate::routine_description::names::LocationNames;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

/// A routine ready to analyse: its region tree plus every collaborator, backed by tables.
#[derive(Debug)]
pub struct DescribedRoutine {
    pub name: String,
    pub tree: RegionTree,
    pub effects: EffectTable,
    pub aliases: RangeAliasOracle,
    pub escapes: EscapedVariables,
    pub names: LocationNames,
    pub live_out: FxHashMap<RegionId, LocationSet>,
    pub expectations: BTreeMap<String, RegionExpectation>,
}

/// Instruction effects by id. `None` marks an instruction whose effect is unresolved.
#[derive(Debug, Default)]
pub struct EffectTable {
    effects: Vec<Option<InstructionEffects>>,
}

impl EffectTable {
    fn push(&mut self, effects: Option<InstructionEffects>) -> InstId {
        let inst = InstId(self.effects.len() as u32);
        self.effects.push(effects);
        inst
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

impl AccessEnumerator for EffectTable {
    fn memory_effects(&self, inst: InstId) -> Option<InstructionEffects> {
        self.effects.get(inst.0 as usize).cloned().flatten()
    }
}

#[derive(Debug, Default)]
pub struct EscapedVariables {
    bases: FxHashSet<PointerId>,
}

impl EscapeOracle for EscapedVariables {
    fn may_escape(&self, location: &MemoryLocation) -> bool {
        self.bases.contains(&location.base)
    }
}

struct Lowering<'a> {
    description: &'a RoutineDescription,
    location: ErrorLocation,
    builder: RegionTreeBuilder,
    effects: EffectTable,
    names: LocationNames,

    // Region name → region, the routine body under its own name
    regions: FxHashMap<&'a str, RegionId>,

    // Block or loop name → node in its enclosing region
    nodes: FxHashMap<&'a str, NodeId>,
}

pub fn lower_routine(
    description: &RoutineDescription,
    location: ErrorLocation,
) -> Result<DescribedRoutine, AnalysisError> {
    let mut lowering = Lowering {
        description,
        location,
        builder: RegionTreeBuilder::new(description.name.clone()),
        effects: EffectTable::default(),
        names: LocationNames::default(),
        regions: FxHashMap::default(),
        nodes: FxHashMap::default(),
    };

    let (aliases, escapes) = lowering.declare_variables()?;
    lowering.declare_loops()?;
    lowering.declare_blocks()?;
    lowering.connect_nodes()?;
    let live_out = lowering.live_out()?;
    let tree = lowering.builder.finish();
    check_reachable(&tree, &lowering.nodes, &lowering.location)?;

    Ok(DescribedRoutine {
        name: description.name.clone(),
        tree,
        effects: lowering.effects,
        aliases,
        escapes,
        names: lowering.names,
        live_out,
        expectations: description.expect.clone(),
    })
}

/// Every declared block and loop must be reachable from its region's entry.
fn check_reachable(
    tree: &RegionTree,
    names: &FxHashMap<&str, NodeId>,
    location: &ErrorLocation,
) -> Result<(), AnalysisError> {
    for region in tree.regions() {
        let mut reached = FxHashSet::default();
        let mut stack = vec![region.entry];

        while let Some(node_id) = stack.pop() {
            if !reached.insert(node_id) {
                continue;
            }
            if let Some(node) = tree.node(node_id) {
                stack.extend(node.successors.iter().copied());
            }
        }

        let unreached = names
            .iter()
            .find(|(_, node)| tree.node(**node).is_some_and(|node| node.region == region.id) && !reached.contains(*node));

        if let Some((name, _)) = unreached {
            return_description_error!(
                format!("Node '{}' can't be reached from the entry of '{}'", name, region.name),
                location.clone(),
                {
                    AnalysisStage => "Edges",
                    PrimarySuggestion => "List the node as a successor of another node in its region",
                }
            );
        }
    }

    Ok(())
}

impl<'a> Lowering<'a> {
    fn declare_variables(&mut self) -> Result<(RangeAliasOracle, EscapedVariables), AnalysisError> {
        let mut aliases = RangeAliasOracle::new();
        let mut escapes = EscapedVariables::default();

        for variable in &self.description.variable {
            if variable.name == EXIT_NODE_NAME || self.names.base_of(&variable.name).is_some() {
                return_description_error!(
                    format!("Variable '{}' is declared twice or uses a reserved name", variable.name),
                    self.location.clone(),
                    {
                        AnalysisStage => "Variables",
                    }
                );
            }

            let base = self.names.declare(&variable.name, variable.size);
            if variable.escapes {
                escapes.bases.insert(base);
            }
            if variable.opaque {
                aliases.add_opaque_base(base);
            }
        }

        for alias in &self.description.alias {
            let [lhs, rhs] = &alias.pair;
            let lhs = self.variable_base(lhs)?;
            let rhs = self.variable_base(rhs)?;
            aliases.add_may_alias(lhs, rhs);
        }

        Ok((aliases, escapes))
    }

    fn variable_base(&self, name: &str) -> Result<PointerId, AnalysisError> {
        match self.names.base_of(name) {
            Some(base) => Ok(base),
            None => return_description_error!(
                format!("Unknown variable '{}'", name),
                self.location.clone(),
                {
                    AnalysisStage => "Variables",
                    PrimarySuggestion => "Declare the variable in a [[routine.variable]] table",
                }
            ),
        }
    }

    /// Loops may be listed in any order, so parents are resolved in passes.
    fn declare_loops(&mut self) -> Result<(), AnalysisError> {
        let description = self.description;
        let root = self.builder.root();
        self.regions.insert(description.name.as_str(), root);

        let mut pending = description.loops.iter().collect::<Vec<_>>();
        while !pending.is_empty() {
            let before = pending.len();
            let mut waiting = Vec::new();

            for loop_description in pending {
                let parent = match &loop_description.parent {
                    None => Some(root),
                    Some(parent) => self.regions.get(parent.as_str()).copied(),
                };

                let Some(parent) = parent else {
                    waiting.push(loop_description);
                    continue;
                };

                let name = loop_description.name.as_str();
                if self.regions.contains_key(name) || name == EXIT_NODE_NAME {
                    return_description_error!(
                        format!("Loop '{}' is declared twice or uses a reserved name", name),
                        self.location.clone(),
                        {
                            AnalysisStage => "Loops",
                        }
                    );
                }

                let region =
                    self.builder
                        .add_loop(parent, name, loop_description.executes_at_least_once);
                self.regions.insert(name, region);

                if let Some(node) = self.builder.region_node(region) {
                    self.nodes.insert(name, node);
                }
            }

            if waiting.len() == before {
                let names = waiting
                    .iter()
                    .map(|description| description.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");

                return_description_error!(
                    format!("Loops with an unknown or cyclic parent: {}", names),
                    self.location.clone(),
                    {
                        AnalysisStage => "Loops",
                        PrimarySuggestion => "A loop's parent must be another declared loop, or omitted for the routine body",
                    }
                );
            }

            pending = waiting;
        }

        Ok(())
    }

    fn region_of(&self, name: Option<&String>) -> Result<RegionId, AnalysisError> {
        let Some(name) = name else {
            return Ok(self.builder.root());
        };

        match self.regions.get(name.as_str()) {
            Some(region) => Ok(*region),
            None => return_description_error!(
                format!("Unknown region '{}'", name),
                self.location.clone(),
                {
                    AnalysisStage => "Blocks",
                    PrimarySuggestion => "Declare the loop in a [[routine.loop]] table",
                }
            ),
        }
    }

    fn declare_blocks(&mut self) -> Result<(), AnalysisError> {
        let description = self.description;
        for block in &description.block {
            let name = block.name.as_str();
            if self.nodes.contains_key(name) || name == EXIT_NODE_NAME {
                return_description_error!(
                    format!("Node '{}' is declared twice or uses a reserved name", name),
                    self.location.clone(),
                    {
                        AnalysisStage => "Blocks",
                    }
                );
            }

            let region = self.region_of(block.region.as_ref())?;
            let instructions = self.lower_instructions(block)?;
            let node = self.builder.add_block(region, instructions);
            self.nodes.insert(name, node);
        }

        Ok(())
    }

    fn lower_instructions(&mut self, block: &BlockDescription) -> Result<Vec<InstId>, AnalysisError> {
        let mut instructions = Vec::with_capacity(block.instructions.len());

        for instruction in &block.instructions {
            let effects = self.lower_instruction(instruction)?;
            instructions.push(self.effects.push(effects));
        }

        Ok(instructions)
    }

    fn lower_instruction(
        &self,
        instruction: &InstructionDescription,
    ) -> Result<Option<InstructionEffects>, AnalysisError> {
        let (read, write) = match instruction.op {
            OpKind::Load => (AccessInfo::Must, AccessInfo::No),
            OpKind::Store => (AccessInfo::No, AccessInfo::Must),
            OpKind::Update => (AccessInfo::Must, AccessInfo::Must),
            OpKind::MayLoad => (AccessInfo::May, AccessInfo::No),
            OpKind::MayStore => (AccessInfo::No, AccessInfo::May),
            OpKind::Address => (AccessInfo::No, AccessInfo::No),
            OpKind::Call => return self.lower_call(instruction).map(Some),
            OpKind::Opaque => return Ok(None),
        };

        let Some(target) = &instruction.target else {
            return_description_error!(
                format!("{:?} instruction has no target", instruction.op),
                self.location.clone(),
                {
                    AnalysisStage => "Instructions",
                    PrimarySuggestion => "Add target = \"<variable>\" to the instruction",
                }
            );
        };

        let location = self.target_location(target, instruction.offset, instruction.size)?;
        Ok(Some(InstructionEffects {
            accesses: vec![MemoryAccess {
                location,
                operand: 0,
                read,
                write,
            }],
            unknown: None,
        }))
    }

    fn lower_call(&self, call: &InstructionDescription) -> Result<InstructionEffects, AnalysisError> {
        let mut accesses = Vec::with_capacity(call.reads.len() + call.writes.len());

        for (operand, name) in call.reads.iter().enumerate() {
            accesses.push(MemoryAccess {
                location: self.target_location(name, 0, None)?,
                operand: operand as u32,
                read: AccessInfo::May,
                write: AccessInfo::No,
            });
        }

        for (operand, name) in call.writes.iter().enumerate() {
            accesses.push(MemoryAccess {
                location: self.target_location(name, 0, None)?,
                operand: (call.reads.len() + operand) as u32,
                read: AccessInfo::No,
                write: AccessInfo::May,
            });
        }

        Ok(InstructionEffects {
            accesses,
            unknown: call.opaque.then(UnknownAccess::conservative),
        })
    }

    fn target_location(
        &self,
        name: &str,
        offset: i64,
        size: Option<u64>,
    ) -> Result<MemoryLocation, AnalysisError> {
        let base = self.variable_base(name)?;
        if offset < 0 {
            return_description_error!(
                format!("Access to '{}' has a negative offset", name),
                self.location.clone(),
                {
                    AnalysisStage => "Instructions",
                    Variable => "offset",
                }
            );
        }

        let size = size.or_else(|| {
            self.names
                .size_of(base)
                .map(|total| total.saturating_sub(offset as u64))
        });

        Ok(match size {
            Some(size) => MemoryLocation::new(base, offset, size),
            None => MemoryLocation::unknown_size(base, offset),
        })
    }

    fn node_named(&self, name: &str, region: RegionId) -> Result<NodeId, AnalysisError> {
        if name == EXIT_NODE_NAME {
            return Ok(self.builder.exit(region));
        }

        let Some(node) = self.nodes.get(name).copied() else {
            return_description_error!(
                format!("Unknown node '{}'", name),
                self.location.clone(),
                {
                    AnalysisStage => "Edges",
                    PrimarySuggestion => "Successors must name a block, a loop, or \"exit\"",
                }
            );
        };

        if self.builder.region_of_node(node) != region {
            return_description_error!(
                format!("Node '{}' isn't in the same region as its predecessor", name),
                self.location.clone(),
                {
                    AnalysisStage => "Edges",
                    PrimarySuggestion => "Leave a loop through its exit, by listing successors on the loop itself",
                }
            );
        }

        Ok(node)
    }

    /// First declared node of a region: blocks before loops, in file order.
    fn default_entry(&self, region: RegionId) -> Option<NodeId> {
        let region_name = |name: &Option<String>| match name {
            None => Some(self.builder.root()),
            Some(name) => self.regions.get(name.as_str()).copied(),
        };

        let block = self
            .description
            .block
            .iter()
            .find(|block| region_name(&block.region) == Some(region))
            .and_then(|block| self.nodes.get(block.name.as_str()).copied());

        block.or_else(|| {
            self.description
                .loops
                .iter()
                .find(|loop_description| region_name(&loop_description.parent) == Some(region))
                .and_then(|loop_description| self.nodes.get(loop_description.name.as_str()).copied())
        })
    }

    fn connect_entry(&mut self, region: RegionId, entry: Option<&String>) -> Result<(), AnalysisError> {
        let first = match entry {
            Some(name) => Some(self.node_named(name, region)?),
            None => self.default_entry(region),
        };

        let entry_node = self.builder.entry(region);
        let target = first.unwrap_or_else(|| self.builder.exit(region));
        self.builder.add_edge(entry_node, target);
        Ok(())
    }

    fn connect_nodes(&mut self) -> Result<(), AnalysisError> {
        let description = self.description;
        let root = self.builder.root();
        self.connect_entry(root, description.entry.as_ref())?;

        for loop_description in &description.loops {
            let region = self.region_of(Some(&loop_description.name))?;
            self.connect_entry(region, loop_description.entry.as_ref())?;

            let parent = self.region_of(loop_description.parent.as_ref())?;
            let Some(from) = self.builder.region_node(region) else {
                continue;
            };

            for successor in &loop_description.successors {
                let to = self.node_named(successor, parent)?;
                self.builder.add_edge(from, to);
            }
        }

        for block in &description.block {
            let region = self.region_of(block.region.as_ref())?;
            let Some(from) = self.nodes.get(block.name.as_str()).copied() else {
                continue;
            };

            for successor in &block.successors {
                let to = self.node_named(successor, region)?;
                self.builder.add_edge(from, to);
            }
        }

        Ok(())
    }

    fn live_out(&self) -> Result<FxHashMap<RegionId, LocationSet>, AnalysisError> {
        let mut live_out = FxHashMap::default();

        for loop_description in &self.description.loops {
            let region = self.region_of(Some(&loop_description.name))?;
            let mut locations = LocationSet::new();
            for name in &loop_description.live_out {
                locations.insert(self.target_location(name, 0, None)?);
            }
            live_out.insert(region, locations);
        }

        Ok(live_out)
    }
}
