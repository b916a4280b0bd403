use crate::analysis::defined_memory::tests::test_support::{
    EffectTable, analyze, is_subset, load, loc, may_store, store, update,
};
use crate::analysis::defined_memory::{
    DefUseSet, DefinitionInfo, ReachingDefinitions, solve_forward, solve_forward_observed,
};
use crate::analysis_messages::analysis_errors::ErrorLocation;
use crate::memory::{MemoryLocation, RangeAliasOracle};
use crate::routine::{InstId, InstructionEffects, NodeId, RegionTree, RegionTreeBuilder};
use proptest::prelude::*;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy)]
enum Op {
    Store(usize),
    MayStore(usize),
    Load(usize),
    Update(usize),
}

// Overlapping pool: exercises overlap-aware kills
fn overlapping_pool() -> Vec<MemoryLocation> {
    vec![loc(1, 0, 4), loc(1, 0, 2), loc(1, 2, 2), loc(1, 8, 4), loc(2, 0, 8)]
}

// Pairwise identical-or-disjoint pool: no definition ever kills another
fn disjoint_pool() -> Vec<MemoryLocation> {
    vec![loc(1, 0, 4), loc(1, 8, 4), loc(2, 0, 4), loc(3, 0, 4)]
}

fn op_strategy(pool_size: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..pool_size).prop_map(Op::Store),
        (0..pool_size).prop_map(Op::MayStore),
        (0..pool_size).prop_map(Op::Load),
        (0..pool_size).prop_map(Op::Update),
    ]
}

fn blocks_strategy(pool_size: usize, max_blocks: usize) -> impl Strategy<Value = Vec<Vec<Op>>> {
    prop::collection::vec(prop::collection::vec(op_strategy(pool_size), 0..4), 1..max_blocks)
}

fn effects_of(op: Op, pool: &[MemoryLocation]) -> InstructionEffects {
    match op {
        Op::Store(index) => store(pool[index]),
        Op::MayStore(index) => may_store(pool[index]),
        Op::Load(index) => load(pool[index]),
        Op::Update(index) => update(pool[index]),
    }
}

fn add_instructions(effects: &mut EffectTable, ops: &[Op], pool: &[MemoryLocation]) -> Vec<InstId> {
    ops.iter().map(|op| effects.add(effects_of(*op, pool))).collect()
}

/// One region: a chain of blocks plus arbitrary extra edges, which may form loops.
fn random_graph(
    blocks: &[Vec<Op>],
    extra_edges: &[(usize, usize)],
    pool: &[MemoryLocation],
) -> (RegionTree, FxHashMap<NodeId, DefUseSet>) {
    let mut effects = EffectTable::new();
    let mut builder = RegionTreeBuilder::new("random");
    let root = builder.root();

    let nodes = blocks
        .iter()
        .map(|ops| {
            let instructions = add_instructions(&mut effects, ops, pool);
            builder.add_block(root, instructions)
        })
        .collect::<Vec<_>>();

    builder.add_path(root, &nodes);
    for (from, to) in extra_edges {
        builder.add_edge(nodes[from % nodes.len()], nodes[to % nodes.len()]);
    }
    let tree = builder.finish();

    let info = analyze(&tree, &effects);
    let footprints = tree
        .nodes()
        .iter()
        .map(|node| {
            let footprint = info.node_footprint(node.id).expect("footprint").clone();
            (node.id, footprint)
        })
        .collect();

    (tree, footprints)
}

fn outer_exit_value(tree: &RegionTree, effects: &EffectTable) -> DefinitionInfo {
    let info = analyze(tree, effects);
    info.region_definitions(tree.root())
        .expect("routine solved")
        .output
        .clone()
}

proptest! {
    /// Every OUT value only moves down: MustReach shrinks, MayReach grows.
    #[test]
    fn prop_solver_converges_monotonically(
        blocks in blocks_strategy(5, 6),
        extra_edges in prop::collection::vec((0..6usize, 0..6usize), 0..4),
    ) {
        let pool = overlapping_pool();
        let (tree, footprints) = random_graph(&blocks, &extra_edges, &pool);
        let aliases = RangeAliasOracle::new();
        let problem = ReachingDefinitions {
            footprints: &footprints,
            aliases: &aliases,
            location: ErrorLocation::new("random"),
        };
        let root = tree.region(tree.root()).expect("root");

        let mut history: FxHashMap<NodeId, Vec<DefinitionInfo>> = FxHashMap::default();
        let solution = solve_forward_observed(&tree, root, &problem, |node, value| {
            history.entry(node).or_default().push(value.clone());
        });
        prop_assert!(solution.is_ok());

        for values in history.values() {
            for pair in values.windows(2) {
                prop_assert!(is_subset(&pair[1].must_reach, &pair[0].must_reach));
                prop_assert!(is_subset(&pair[0].may_reach, &pair[1].may_reach));
            }
        }
    }

    /// Solving a converged region again changes nothing.
    #[test]
    fn prop_re_solving_is_idempotent(
        blocks in blocks_strategy(5, 6),
        extra_edges in prop::collection::vec((0..6usize, 0..6usize), 0..4),
    ) {
        let pool = overlapping_pool();
        let (tree, footprints) = random_graph(&blocks, &extra_edges, &pool);
        let aliases = RangeAliasOracle::new();
        let problem = ReachingDefinitions {
            footprints: &footprints,
            aliases: &aliases,
            location: ErrorLocation::new("random"),
        };
        let root = tree.region(tree.root()).expect("root");

        let first = solve_forward(&tree, root, &problem).expect("first solve");
        let second = solve_forward(&tree, root, &problem).expect("second solve");

        prop_assert_eq!(first.inputs, second.inputs);
        prop_assert_eq!(first.outputs, second.outputs);
    }

    /// Inlining a loop that always runs into its parent gives the same value at the
    /// parent's exit as collapsing it first.
    #[test]
    fn prop_collapse_matches_flattened_solve(
        before in prop::collection::vec(op_strategy(4), 0..4),
        inner in blocks_strategy(4, 4),
        after in prop::collection::vec(op_strategy(4), 0..4),
        may_skip in any::<bool>(),
    ) {
        let pool = disjoint_pool();

        // Collapsed: entry -> before -> loop -> after -> exit
        let mut collapsed_effects = EffectTable::new();
        let mut collapsed = RegionTreeBuilder::new("collapsed");
        let root = collapsed.root();
        let before_block = collapsed.add_block(root, add_instructions(&mut collapsed_effects, &before, &pool));
        let body = collapsed.add_loop(root, "inner", true);
        let inner_blocks = inner
            .iter()
            .map(|ops| {
                let instructions = add_instructions(&mut collapsed_effects, ops, &pool);
                collapsed.add_block(body, instructions)
            })
            .collect::<Vec<_>>();
        collapsed.add_path(body, &inner_blocks);
        let after_block = collapsed.add_block(root, add_instructions(&mut collapsed_effects, &after, &pool));
        let loop_node = collapsed.region_node(body).expect("loop node");
        collapsed.add_path(root, &[before_block, loop_node, after_block]);
        if may_skip {
            collapsed.add_edge(before_block, after_block);
        }
        let collapsed = collapsed.finish();

        // Flattened: the loop's blocks inlined, with the back edge kept
        let mut flat_effects = EffectTable::new();
        let mut flat = RegionTreeBuilder::new("flattened");
        let root = flat.root();
        let before_block = flat.add_block(root, add_instructions(&mut flat_effects, &before, &pool));
        let inlined = inner
            .iter()
            .map(|ops| {
                let instructions = add_instructions(&mut flat_effects, ops, &pool);
                flat.add_block(root, instructions)
            })
            .collect::<Vec<_>>();
        let after_block = flat.add_block(root, add_instructions(&mut flat_effects, &after, &pool));
        let mut path = vec![before_block];
        path.extend(inlined.iter().copied());
        path.push(after_block);
        flat.add_path(root, &path);
        if let (Some(first), Some(last)) = (inlined.first(), inlined.last()) {
            flat.add_edge(*last, *first);
        }
        if may_skip {
            flat.add_edge(before_block, after_block);
        }
        let flat = flat.finish();

        let collapsed_value = outer_exit_value(&collapsed, &collapsed_effects);
        let flat_value = outer_exit_value(&flat, &flat_effects);

        prop_assert_eq!(collapsed_value, flat_value);
    }
}
