use super::*;
use crate::models::common::ValueRange;

#[test]
fn can_allocate_and_narrow_domains() {
    let mut arena = VariableArena::default();
    let first = arena.allocate(ValueRange::new(0, 10));
    let group = arena.allocate_many(3, ValueRange::new(-5, 5));

    assert_eq!(arena.len(), 4);
    assert_eq!(arena.domain(first), ValueRange::new(0, 10));
    assert_eq!(arena.domain(group[2]), ValueRange::new(-5, 5));

    assert!(arena.intersect_domain(first, ValueRange::new(5, 20)));
    assert_eq!(arena.domain(first), ValueRange::new(5, 10));
    assert!(!arena.intersect_domain(first, ValueRange::new(11, 20)));
}

#[test]
fn can_shadow_committed_values_with_delta() {
    let mut arena = VariableArena::default();
    let variables = arena.allocate_many(3, ValueRange::whole());

    let mut assignment = Assignment::new(arena.len());
    assignment.set(variables[0], 7);
    assignment.set(variables[1], 8);

    let mut delta = Delta::default();
    delta.set(variables[1], 9);
    delta.set(variables[1], 10);
    delta.set(variables[2], 1);

    assert_eq!(delta.len(), 2);
    assert_eq!(delta.value(variables[1]), Some(10));

    assignment.merge(&delta);
    assert_eq!(assignment.value(variables[0]), Some(7));
    assert_eq!(assignment.value(variables[1]), Some(10));
    assert_eq!(assignment.value(variables[2]), Some(1));
    assert_eq!(assignment.bound_count(), 3);
}

#[test]
fn can_round_trip_through_text() {
    let mut arena = VariableArena::default();
    let variables = arena.allocate_many(4, ValueRange::whole());

    let mut assignment = Assignment::new(arena.len());
    assignment.set(variables[0], 3);
    assignment.set(variables[2], -1);
    assignment.set_objective(42);

    let mut buffer = Vec::new();
    assignment.write(&mut buffer).unwrap();

    let read = Assignment::read(buffer.as_slice()).unwrap();
    assert_eq!(read.value(variables[0]), Some(3));
    assert_eq!(read.value(variables[1]), None);
    assert_eq!(read.value(variables[2]), Some(-1));
    assert_eq!(read.objective(), Some(42));
}

#[test]
fn can_reject_malformed_text() {
    assert!(Assignment::read("0 1\nbroken".as_bytes()).is_err());
    assert!(Assignment::read("0 x".as_bytes()).is_err());
}
