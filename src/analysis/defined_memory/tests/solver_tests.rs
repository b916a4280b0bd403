use crate::analysis::defined_memory::tests::test_support::{
    EffectTable, analyze, is_subset, lattice_of, load, loc, store, x, y,
};
use crate::analysis::defined_memory::{
    DefUseSet, DefinedMemoryInfo, DefinitionInfo, ReachingDefinitions, solve_forward,
    solve_forward_observed,
};
use crate::analysis_messages::analysis_errors::{ErrorLocation, ErrorType};
use crate::memory::{LocationLattice, RangeAliasOracle};
use crate::routine::{NodeId, RegionTreeBuilder};
use rustc_hash::FxHashMap;

#[test]
fn entry_sees_the_boundary_value() {
    let mut effects = EffectTable::new();
    let mut builder = RegionTreeBuilder::new("boundary");
    let root = builder.root();
    let block = builder.add_block(root, vec![effects.add(store(x()))]);
    builder.add_path(root, &[block]);
    let tree = builder.finish();

    let info = analyze(&tree, &effects);
    let entry = tree.region(root).expect("root").entry;

    assert_eq!(
        info.node_definitions(entry).expect("entry solved").input,
        DefinitionInfo::boundary()
    );
    assert_eq!(
        info.node_definitions(block).expect("block solved").output.must_reach,
        lattice_of(&[x()])
    );
}

#[test]
fn meet_keeps_must_only_when_every_path_agrees() {
    // entry -> writes_x -> join, entry -> skips -> join
    let mut effects = EffectTable::new();
    let mut builder = RegionTreeBuilder::new("diamond");
    let root = builder.root();
    let writes_x = builder.add_block(root, vec![effects.add(store(x()))]);
    let skips = builder.add_block(root, Vec::new());
    let join = builder.add_block(root, Vec::new());
    let entry = builder.entry(root);
    builder.add_edge(entry, writes_x);
    builder.add_edge(entry, skips);
    builder.add_edge(writes_x, join);
    builder.add_edge(skips, join);
    let tree = builder.finish();

    let info = analyze(&tree, &effects);
    let at_join = &info.node_definitions(join).expect("join solved").input;

    assert!(!at_join.must_reach.contains(&x()));
    assert!(at_join.may_reach.contains(&x()));
}

#[test]
fn must_definition_kills_overlapping_locations_only() {
    let a = loc(1, 0, 4);
    let b = loc(1, 0, 2);
    let c = loc(1, 8, 4);

    let mut effects = EffectTable::new();
    let mut builder = RegionTreeBuilder::new("kill");
    let root = builder.root();
    let first = builder.add_block(
        root,
        vec![effects.add(store(b)), effects.add(store(c))],
    );
    let second = builder.add_block(root, vec![effects.add(store(a))]);
    builder.add_path(root, &[first, second]);
    let tree = builder.finish();

    let info = analyze(&tree, &effects);
    let out = &info.node_definitions(second).expect("solved").output;

    assert!(out.must_reach.contains(&a));
    assert!(!out.must_reach.contains(&b));
    assert!(out.must_reach.contains(&c));
    assert!(out.may_reach.contains(&b));
}

#[test]
fn uses_dont_flow_through_the_lattice() {
    let mut effects = EffectTable::new();
    let mut builder = RegionTreeBuilder::new("uses");
    let root = builder.root();
    let block = builder.add_block(root, vec![effects.add(load(y()))]);
    builder.add_path(root, &[block]);
    let tree = builder.finish();

    let info = analyze(&tree, &effects);
    let out = &info.node_definitions(block).expect("solved").output;

    assert_eq!(out, &DefinitionInfo::boundary());
    assert!(info.node_footprint(block).expect("footprint").has_use(&y()));
}

fn single_loop_footprints() -> (crate::routine::RegionTree, FxHashMap<NodeId, DefUseSet>) {
    let mut builder = RegionTreeBuilder::new("solver");
    let root = builder.root();
    let header = builder.add_block(root, Vec::new());
    let body = builder.add_block(root, Vec::new());
    let entry = builder.entry(root);
    let exit = builder.exit(root);
    builder.add_edge(entry, header);
    builder.add_edge(header, body);
    builder.add_edge(body, header);
    builder.add_edge(header, exit);
    let tree = builder.finish();

    let mut footprints = FxHashMap::default();
    for node in tree.nodes() {
        footprints.insert(node.id, DefUseSet::new());
    }

    if let Some(footprint) = footprints.get_mut(&header) {
        footprint.add_def(x());
    }
    if let Some(footprint) = footprints.get_mut(&body) {
        footprint.add_def(y());
        footprint.add_may_def(loc(3, 0, 4));
    }

    (tree, footprints)
}

#[test]
fn re_solving_a_converged_region_is_idempotent() {
    let (tree, footprints) = single_loop_footprints();
    let aliases = RangeAliasOracle::new();
    let problem = ReachingDefinitions {
        footprints: &footprints,
        aliases: &aliases,
        location: ErrorLocation::new("solver"),
    };
    let root = tree.region(tree.root()).expect("root");

    let first = solve_forward(&tree, root, &problem).expect("first solve");
    let second = solve_forward(&tree, root, &problem).expect("second solve");

    assert_eq!(first.inputs, second.inputs);
    assert_eq!(first.outputs, second.outputs);
    assert!(first.stats.transfers >= first.stats.nodes);
}

#[test]
fn outputs_only_move_down_the_lattice() {
    let (tree, footprints) = single_loop_footprints();
    let aliases = RangeAliasOracle::new();
    let problem = ReachingDefinitions {
        footprints: &footprints,
        aliases: &aliases,
        location: ErrorLocation::new("solver"),
    };
    let root = tree.region(tree.root()).expect("root");

    let mut history: FxHashMap<NodeId, Vec<DefinitionInfo>> = FxHashMap::default();
    let solution = solve_forward_observed(&tree, root, &problem, |node, value| {
        history.entry(node).or_default().push(value.clone());
    })
    .expect("solve");

    for values in history.values() {
        for pair in values.windows(2) {
            assert!(is_subset(&pair[1].must_reach, &pair[0].must_reach));
            assert!(is_subset(&pair[0].may_reach, &pair[1].may_reach));
        }
    }

    let exit = solution.output(root.exit).expect("exit solved");
    assert_eq!(exit.must_reach, lattice_of(&[x()]));
    assert_eq!(exit.may_reach, lattice_of(&[x(), y(), loc(3, 0, 4)]));
}

#[test]
fn missing_footprint_is_a_contract_violation() {
    let (tree, mut footprints) = single_loop_footprints();
    let root = tree.region(tree.root()).expect("root");
    footprints.remove(&root.exit);

    let aliases = RangeAliasOracle::new();
    let problem = ReachingDefinitions {
        footprints: &footprints,
        aliases: &aliases,
        location: ErrorLocation::new("solver"),
    };

    let error = solve_forward(&tree, root, &problem).expect_err("exit has no footprint");
    assert_eq!(error.error_type, ErrorType::Contract);
}

#[test]
fn querying_an_unsolved_node_is_a_contract_violation() {
    let (tree, _) = single_loop_footprints();
    let info = DefinedMemoryInfo::new(&tree);

    let error = info
        .node_definitions(NodeId(0))
        .expect_err("nothing was solved");
    assert_eq!(error.error_type, ErrorType::Contract);

    let error = info
        .node_definitions(NodeId(999))
        .expect_err("node doesn't exist");
    assert_eq!(error.error_type, ErrorType::Contract);

    assert!(info.region_footprint(tree.root()).is_err());
}

#[test]
fn full_lattice_only_survives_on_unreached_nodes() {
    let mut effects = EffectTable::new();
    let mut builder = RegionTreeBuilder::new("unreached");
    let root = builder.root();
    let reached = builder.add_block(root, vec![effects.add(store(x()))]);
    let orphan = builder.add_block(root, Vec::new());
    builder.add_path(root, &[reached]);
    let tree = builder.finish();

    let info = analyze(&tree, &effects);

    assert!(info.node_definitions(orphan).expect("solved").input.must_reach.is_full());
    assert!(!info
        .node_definitions(reached)
        .expect("solved")
        .output
        .must_reach
        .is_full());

    // The exit meets the orphan's Full with the reached path, which leaves x
    let root_value = info.region_definitions(root).expect("root solved");
    assert_eq!(root_value.output.must_reach, lattice_of(&[x()]));
    assert_eq!(root_value.input.must_reach, LocationLattice::empty());
}
