use super::*;

#[test]
fn can_cap_arithmetic_at_bounds() {
    assert_eq!(cap_add(MAX_VALUE, MAX_VALUE), MAX_VALUE);
    assert_eq!(cap_add(1, 2), 3);
    assert_eq!(cap_sub(-MAX_VALUE, MAX_VALUE), -MAX_VALUE);
    assert_eq!(cap_mul(MAX_VALUE, 2), MAX_VALUE);
    assert_eq!(cap_mul(-MAX_VALUE, 2), -MAX_VALUE);
    assert_eq!(cap_mul(7, -3), -21);
}

#[test]
fn can_intersect_and_shift_ranges() {
    let lhs = ValueRange::new(0, 10);
    let rhs = ValueRange::new(5, 20);

    assert_eq!(lhs.intersect(&rhs), ValueRange::new(5, 10));
    assert!(ValueRange::new(0, 2).intersect(&ValueRange::new(3, 4)).is_empty());
    assert_eq!(lhs.shift_by(3), ValueRange::new(3, 13));
    assert!(lhs.contains(10));
    assert!(!lhs.contains(11));
    assert_eq!(ValueRange::fixed(7), ValueRange::new(7, 7));
}
