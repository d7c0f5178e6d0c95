use super::*;

#[test]
fn can_validate_breakpoints() {
    assert!(PiecewiseLinearFunction::new(vec![]).is_err());
    assert!(PiecewiseLinearFunction::new(vec![(0, -1)]).is_err());
    assert!(PiecewiseLinearFunction::new(vec![(0, 0), (0, 1)]).is_err());
    assert!(PiecewiseLinearFunction::new(vec![(0, 5), (10, 0)]).is_err());
    // slope 1/3 is not integral
    assert!(PiecewiseLinearFunction::new(vec![(0, 0), (3, 1)]).is_err());

    assert!(PiecewiseLinearFunction::new(vec![(0, 0), (5, 5), (10, 20)]).is_ok());
    // flattening slopes are fine: only monotonicity is required
    assert!(PiecewiseLinearFunction::new(vec![(0, 0), (5, 10), (10, 15)]).is_ok());
}

#[test]
fn can_evaluate_across_segments() {
    let function = PiecewiseLinearFunction::new(vec![(10, 2), (20, 12), (30, 42)]).unwrap();

    assert_eq!(function.value(0), 2);
    assert_eq!(function.value(10), 2);
    assert_eq!(function.value(15), 7);
    assert_eq!(function.value(20), 12);
    assert_eq!(function.value(25), 27);
    assert_eq!(function.value(40), 72);
    assert_eq!(function.slopes(), &[1, 3]);
}

#[test]
fn can_evaluate_flattening_segments() {
    let function = PiecewiseLinearFunction::new(vec![(0, 0), (10, 50), (20, 60)]).unwrap();

    assert_eq!(function.slopes(), &[5, 1]);
    assert_eq!(function.value(-5), 0);
    assert_eq!(function.value(4), 20);
    assert_eq!(function.value(15), 55);
    assert_eq!(function.value(30), 70);
}
