#![cfg(test)]

use crate::memory::{
    AliasOracle, AliasResult, LocationLattice, LocationSet, MemoryLocation, PointerId,
    RangeAliasOracle,
};

fn loc(base: u32, offset: i64, size: u64) -> MemoryLocation {
    MemoryLocation::new(PointerId(base), offset, size)
}

#[test]
fn insert_reports_whether_the_set_changed() {
    let mut set = LocationSet::new();

    assert!(set.insert(loc(1, 0, 4)));
    assert!(!set.insert(loc(1, 0, 4)));
    assert!(set.insert(loc(1, 4, 4)));
    assert_eq!(set.len(), 2);
}

#[test]
fn contains_is_exact_but_overlap_is_conservative() {
    let aliases = RangeAliasOracle::new();
    let set = [loc(1, 0, 8)].into_iter().collect::<LocationSet>();

    assert!(set.contains(&loc(1, 0, 8)));
    assert!(!set.contains(&loc(1, 0, 4)));
    assert!(set.overlap(&loc(1, 0, 4), &aliases));
    assert!(set.overlap(&loc(1, 6, 4), &aliases));
    assert!(!set.overlap(&loc(1, 8, 4), &aliases));
    assert!(!set.overlap(&loc(2, 0, 8), &aliases));
}

#[test]
fn overlap_never_misses_a_may_alias_pair() {
    let mut aliases = RangeAliasOracle::new();
    aliases.add_may_alias(PointerId(1), PointerId(2));
    let set = [loc(1, 0, 4)].into_iter().collect::<LocationSet>();

    assert_eq!(
        aliases.alias(&loc(2, 100, 4), &loc(1, 0, 4)),
        AliasResult::MayAlias
    );
    assert!(set.overlap(&loc(2, 100, 4), &aliases));
}

#[test]
fn unknown_sizes_overlap_everything_past_their_offset() {
    let aliases = RangeAliasOracle::new();
    let set = [MemoryLocation::unknown_size(PointerId(1), 16)]
        .into_iter()
        .collect::<LocationSet>();

    assert!(set.overlap(&loc(1, 1024, 4), &aliases));
    assert!(!set.overlap(&loc(1, 0, 16), &aliases));
}

#[test]
fn sizes_past_i64_still_overlap_later_ranges() {
    let aliases = RangeAliasOracle::new();
    let huge = loc(1, 0, u64::MAX);

    assert_eq!(huge.end(), None);
    assert!(aliases.alias(&huge, &loc(1, 8, 4)).may_overlap());
    assert!(aliases.alias(&loc(1, 8, 4), &huge).may_overlap());
    assert!(huge.covers(&loc(1, 8, 4)));

    let near_the_end = loc(1, i64::MAX - 2, 8);
    assert_eq!(near_the_end.end(), None);
    assert!(aliases.alias(&near_the_end, &loc(1, i64::MAX - 1, 1)).may_overlap());
}

#[test]
fn alias_tags_separate_locations_on_different_bases() {
    let mut aliases = RangeAliasOracle::new();
    aliases.add_opaque_base(PointerId(9));

    let int_access = loc(9, 0, 4).with_alias_tag(1);
    let float_access = loc(3, 0, 4).with_alias_tag(2);

    assert_eq!(aliases.alias(&int_access, &float_access), AliasResult::NoAlias);
    assert!(aliases.alias(&loc(9, 0, 4), &loc(3, 0, 4)).may_overlap());
}

#[test]
fn intersect_and_merge_are_idempotent() {
    let left = [loc(1, 0, 4), loc(2, 0, 4)].into_iter().collect::<LocationSet>();
    let right = [loc(2, 0, 4), loc(3, 0, 4)].into_iter().collect::<LocationSet>();

    let mut intersected = left.clone();
    assert!(intersected.intersect(&right));
    assert_eq!(intersected.sorted(), vec![loc(2, 0, 4)]);
    assert!(!intersected.intersect(&right));

    let mut merged = left.clone();
    assert!(merged.merge(&right));
    assert_eq!(merged.len(), 3);
    assert!(!merged.merge(&right));
}

#[test]
fn full_lattice_is_the_identity_of_intersect() {
    let set = [loc(1, 0, 4)].into_iter().collect::<LocationSet>();

    let mut must = LocationLattice::full();
    assert!(must.contains(&loc(7, 0, 1)));
    assert!(!must.definitely_contains(&loc(7, 0, 1)));

    assert!(must.intersect(&LocationLattice::Locations(set.clone())));
    assert_eq!(must, LocationLattice::Locations(set.clone()));

    let mut unchanged = LocationLattice::Locations(set.clone());
    assert!(!unchanged.intersect(&LocationLattice::full()));
    assert_eq!(unchanged, LocationLattice::Locations(set));
}

#[test]
fn merging_full_absorbs_everything() {
    let mut may = LocationLattice::empty();
    assert!(may.merge(&LocationLattice::full()));
    assert!(may.is_full());
    assert!(!may.merge(&LocationLattice::empty()));
    assert!(!may.insert(loc(1, 0, 4)));
}

#[test]
fn kill_clears_overlapping_but_not_identical_or_disjoint_members() {
    let aliases = RangeAliasOracle::new();
    let a = loc(1, 0, 4);
    let b = loc(1, 0, 2);
    let c = loc(1, 8, 4);

    let mut must = LocationLattice::Locations([a, b, c].into_iter().collect());
    let definitions = [a].into_iter().collect::<LocationSet>();
    must.kill_overlapping(&definitions, &aliases);

    assert!(must.contains(&a));
    assert!(!must.contains(&b));
    assert!(must.contains(&c));
}
