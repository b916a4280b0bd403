use crate::analysis::defined_memory::tests::test_support::{
    EffectTable, address_of, analyze, load, loc, may_store, store, update, x, y,
};
use crate::analysis::privatization::{PrivatizationKind, classify_loop};
use crate::analysis_messages::analysis_errors::ErrorType;
use crate::memory::{LocationSet, MemoryLocation, RangeAliasOracle};
use crate::routine::{InstructionEffects, RegionId, RegionTree, RegionTreeBuilder};

/// routine: entry -> loop -> exit, with the loop body as a single block.
fn single_block_loop(body_effects: Vec<InstructionEffects>) -> (RegionTree, EffectTable, RegionId) {
    let mut effects = EffectTable::new();
    let mut builder = RegionTreeBuilder::new("privatize");
    let root = builder.root();
    let body = builder.add_loop(root, "body", true);
    let instructions = body_effects
        .into_iter()
        .map(|effect| effects.add(effect))
        .collect();
    let block = builder.add_block(body, instructions);
    builder.add_path(body, &[block]);
    let loop_node = builder.region_node(body).expect("loop node");
    builder.add_path(root, &[loop_node]);
    (builder.finish(), effects, body)
}

fn kind_of(
    tree: &RegionTree,
    effects: &EffectTable,
    body: RegionId,
    live_out: &LocationSet,
    location: MemoryLocation,
) -> (PrivatizationKind, bool) {
    let info = analyze(tree, effects);
    let aliases = RangeAliasOracle::new();
    let candidates = classify_loop(tree, &info, body, live_out, &aliases).expect("classified");
    let candidate = candidates
        .iter()
        .find(|candidate| candidate.location == location)
        .expect("location is a candidate");
    (candidate.traits.kind, candidate.traits.first_private)
}

#[test]
fn written_before_read_and_dead_after_is_private() {
    let (tree, effects, body) = single_block_loop(vec![store(x()), load(x())]);

    let (kind, first_private) = kind_of(&tree, &effects, body, &LocationSet::new(), x());

    assert_eq!(kind, PrivatizationKind::Private);
    assert!(!first_private);
}

#[test]
fn live_after_the_loop_is_last_private() {
    let (tree, effects, body) = single_block_loop(vec![store(x())]);
    let live_out = [x()].into_iter().collect::<LocationSet>();

    let (kind, _) = kind_of(&tree, &effects, body, &live_out, x());

    assert_eq!(kind, PrivatizationKind::LastPrivate);
}

#[test]
fn conditionally_written_values_are_dynamic_or_second_to_last() {
    let (tree, effects, body) = single_block_loop(vec![may_store(x())]);

    let (dead, _) = kind_of(&tree, &effects, body, &LocationSet::new(), x());
    let live_out = [x()].into_iter().collect::<LocationSet>();
    let (live, _) = kind_of(&tree, &effects, body, &live_out, x());

    assert_eq!(dead, PrivatizationKind::DynamicPrivate);
    assert_eq!(live, PrivatizationKind::SecondToLastPrivate);
}

#[test]
fn read_only_locations_are_left_alone() {
    let (tree, effects, body) = single_block_loop(vec![load(y()), store(x())]);

    let (kind, _) = kind_of(&tree, &effects, body, &LocationSet::new(), y());

    assert_eq!(kind, PrivatizationKind::ReadOnly);
}

#[test]
fn loop_carried_values_are_dependencies() {
    let (tree, effects, body) = single_block_loop(vec![update(x())]);

    let (kind, _) = kind_of(&tree, &effects, body, &LocationSet::new(), x());

    assert_eq!(kind, PrivatizationKind::Dependency);
}

#[test]
fn evaluated_addresses_make_a_location_shared() {
    let (tree, effects, body) = single_block_loop(vec![store(x()), address_of(x())]);

    let (kind, _) = kind_of(&tree, &effects, body, &LocationSet::new(), x());

    assert_eq!(kind, PrivatizationKind::Shared);
}

#[test]
fn partial_write_of_a_wider_access_is_first_private() {
    // x is written as a whole only maybe, but its low half is always written
    let low_half = loc(1, 0, 2);
    let (tree, effects, body) = single_block_loop(vec![store(low_half), may_store(x())]);

    let (kind, first_private) = kind_of(&tree, &effects, body, &LocationSet::new(), low_half);

    assert!(kind.is_private());
    assert!(first_private);
}

#[test]
fn dependency_spreads_across_an_alias_class() {
    // Both halves of x alias the whole, so the read-modify-write of x blocks all of them
    let low_half = loc(1, 0, 2);
    let (tree, effects, body) = single_block_loop(vec![store(low_half), update(x())]);

    let (kind, _) = kind_of(&tree, &effects, body, &LocationSet::new(), low_half);

    assert_eq!(kind, PrivatizationKind::Dependency);
}

#[test]
fn routine_body_cannot_be_privatized() {
    let (tree, effects, _) = single_block_loop(vec![store(x())]);
    let info = analyze(&tree, &effects);
    let aliases = RangeAliasOracle::new();

    let error = classify_loop(&tree, &info, tree.root(), &LocationSet::new(), &aliases)
        .expect_err("routine body isn't a loop");

    assert_eq!(error.error_type, ErrorType::Contract);
}
