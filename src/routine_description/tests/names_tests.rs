use crate::memory::{LocationLattice, LocationSet, MemoryLocation, PointerId};
use crate::routine_description::LocationNames;

fn names() -> LocationNames {
    let mut names = LocationNames::default();
    names.declare("x", Some(8));
    names.declare("buffer", None);
    names
}

#[test]
fn variables_get_consecutive_bases_from_one() {
    let names = names();

    assert_eq!(names.base_of("x"), Some(PointerId(1)));
    assert_eq!(names.base_of("buffer"), Some(PointerId(2)));
    assert_eq!(names.base_of("missing"), None);
    assert_eq!(names.name_of(PointerId(0)), None);
}

#[test]
fn whole_variables_print_as_their_name() {
    let names = names();

    assert_eq!(names.name(&MemoryLocation::new(PointerId(1), 0, 8)), "x");
    assert_eq!(names.name(&MemoryLocation::unknown_size(PointerId(2), 0)), "buffer");
}

#[test]
fn partial_ranges_print_with_bounds() {
    let names = names();

    assert_eq!(names.name(&MemoryLocation::new(PointerId(1), 2, 4)), "x[2..6]");
    assert_eq!(names.name(&MemoryLocation::unknown_size(PointerId(1), 4)), "x[4..]");
    assert_eq!(names.name(&MemoryLocation::new(PointerId(2), 0, 16)), "buffer[0..16]");
}

#[test]
fn undeclared_bases_fall_back_to_the_raw_location() {
    let names = names();

    assert_eq!(names.name(&MemoryLocation::new(PointerId(9), 0, 4)), "<%9, 0, 4>");
}

#[test]
fn parsing_accepts_every_printed_form() {
    let names = names();

    assert_eq!(names.parse("x"), Some(MemoryLocation::new(PointerId(1), 0, 8)));
    assert_eq!(names.parse("x[2..6]"), Some(MemoryLocation::new(PointerId(1), 2, 4)));
    assert_eq!(names.parse(" x[4..] "), Some(MemoryLocation::unknown_size(PointerId(1), 4)));
    assert_eq!(names.parse("buffer"), Some(MemoryLocation::unknown_size(PointerId(2), 0)));
}

#[test]
fn parsing_rejects_malformed_names() {
    let names = names();

    assert_eq!(names.parse("y"), None);
    assert_eq!(names.parse("x[6..2]"), None);
    assert_eq!(names.parse("x[a..b]"), None);
    assert_eq!(names.parse("x[0..4"), None);
}

#[test]
fn lattices_name_every_member_in_order() {
    let names = names();
    let set = [
        MemoryLocation::new(PointerId(2), 0, 4),
        MemoryLocation::new(PointerId(1), 0, 8),
    ]
    .into_iter()
    .collect::<LocationSet>();

    assert_eq!(names.names(&set), vec!["buffer[0..4]", "x"]);

    let mut lattice = LocationLattice::empty();
    lattice.insert_all(&set);
    assert_eq!(
        names.lattice_names(&lattice),
        Some(vec![String::from("buffer[0..4]"), String::from("x")])
    );
    assert_eq!(names.lattice_names(&LocationLattice::full()), None);
}
