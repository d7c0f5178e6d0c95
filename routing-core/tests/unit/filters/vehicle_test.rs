use super::*;
use crate::filters::LocalSearchFilter;
use crate::helpers::create_cvrp_model;
use crate::models::assignment::Delta;

#[test]
fn can_enforce_allowed_vehicles() {
    let mut model = create_cvrp_model();
    model.set_allowed_vehicles_for_index(vec![1], 0).unwrap();
    model.close_model().unwrap();

    let mut filter = VehicleVarFilter::new(&model);
    let committed = model.new_assignment();
    filter.synchronize(&model, &committed);

    let mut delta = Delta::default();
    delta.set(model.vehicle_var(0), 0);
    assert!(!filter.accept(&model, &committed, &delta));

    let mut delta = Delta::default();
    delta.set(model.vehicle_var(0), 1);
    assert!(filter.accept(&model, &committed, &delta));
}

#[test]
fn can_reject_malformed_paths() {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();

    let mut filter = VehicleVarFilter::new(&model);
    let committed = model.routes_to_assignment(&[vec![0, 1], vec![2, 3]]).unwrap();
    filter.synchronize(&model, &committed);

    // a successor loop between two indices never reaches the route end
    let mut delta = Delta::default();
    delta.set(model.next_var(0), 1);
    delta.set(model.next_var(1), 0);
    assert!(!filter.accept(&model, &committed, &delta));
}

#[test]
fn can_keep_amortized_route_costs_in_sync() {
    let mut model = create_cvrp_model();
    model.set_amortized_cost_factors_of_all_vehicles(100, 2).unwrap();
    model.close_model().unwrap();

    let mut filter = VehicleAmortizedCostFilter::new(&model);
    let committed = model.routes_to_assignment(&[vec![0, 1], vec![2, 3]]).unwrap();
    filter.synchronize(&model, &committed);

    let mut delta = Delta::default();
    delta.set(model.next_var(0), 1);
    assert!(filter.accept(&model, &committed, &delta));
}
