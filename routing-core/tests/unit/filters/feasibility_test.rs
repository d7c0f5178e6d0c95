use super::*;
use crate::filters::LocalSearchFilter;
use crate::helpers::create_cvrp_model;
use crate::models::assignment::Delta;

#[test]
fn can_validate_complete_assignments() {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();

    let mut filter = CpFeasibilityFilter::new(&model);
    let committed = model.routes_to_assignment(&[vec![0, 1], vec![2, 3]]).unwrap();
    filter.synchronize(&model, &committed);

    // reversing the first route keeps its load untouched
    let mut delta = Delta::default();
    delta.set(model.next_var(model.start(0)), 1);
    delta.set(model.next_var(1), 0);
    delta.set(model.next_var(0), model.end(0) as i64);
    assert!(filter.accept(&model, &committed, &delta));

    // sending index 2 to the first route overloads it
    let mut delta = Delta::default();
    delta.set(model.next_var(1), 2);
    delta.set(model.next_var(2), model.end(0) as i64);
    delta.set(model.next_var(model.start(1)), 3);
    delta.set(model.vehicle_var(2), 0);
    assert!(!filter.accept(&model, &committed, &delta));
}

#[test]
fn can_relax_partial_assignments_per_path() {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();

    let mut filter = CpFeasibilityFilter::new(&model);
    let committed = model.new_assignment();
    filter.synchronize(&model, &committed);

    let mut delta = Delta::default();
    delta.set(model.next_var(model.start(0)), 0);
    delta.set(model.vehicle_var(0), 0);
    assert!(filter.accept(&model, &committed, &delta));
}
