use super::*;
use crate::filters::LocalSearchFilter;
use crate::helpers::{create_cvrp_model, create_vrptw_model};
use crate::models::assignment::Delta;

#[test]
fn can_reject_capacity_overflows() {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();
    let dimension = model.dimension_index("load").unwrap();

    let mut filter = PathCumulFilter::new(&model, dimension);
    let committed = model.routes_to_assignment(&[vec![0, 1], vec![2, 3]]).unwrap();
    filter.synchronize(&model, &committed);

    // moving index 3 (demand 3) onto the first route overflows 5 + 4 + 3
    let mut delta = Delta::default();
    delta.set(model.next_var(1), 3);
    delta.set(model.next_var(3), model.end(0) as i64);
    delta.set(model.next_var(2), model.end(1) as i64);
    delta.set(model.vehicle_var(3), 0);
    assert!(!filter.accept(&model, &committed, &delta));
}

#[test]
fn can_accept_partial_routes_within_windows() {
    let mut model = create_vrptw_model();
    model.close_model().unwrap();
    let dimension = model.dimension_index("time").unwrap();

    let mut filter = PathCumulFilter::new(&model, dimension);
    let committed = model.new_assignment();
    filter.synchronize(&model, &committed);

    // an open chain: start -> index 0, its window is reachable
    let mut delta = Delta::default();
    delta.set(model.next_var(model.start(0)), 0);
    delta.set(model.vehicle_var(0), 0);
    assert!(filter.accept(&model, &committed, &delta));
}

#[test]
fn can_reject_unreachable_windows() {
    let mut model = create_vrptw_model();
    {
        // index 3 (node 4) must be reached before time 2, which is impossible
        let dimension = model.dimension_mut("time").unwrap();
        dimension.set_cumul_range(3, crate::models::common::ValueRange::new(0, 2));
    }
    model.close_model().unwrap();
    let dimension = model.dimension_index("time").unwrap();

    let mut filter = PathCumulFilter::new(&model, dimension);
    let committed = model.new_assignment();
    filter.synchronize(&model, &committed);

    let mut delta = Delta::default();
    delta.set(model.next_var(model.start(0)), 3);
    delta.set(model.vehicle_var(3), 0);
    assert!(!filter.accept(&model, &committed, &delta));
}
