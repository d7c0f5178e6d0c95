use super::*;
use crate::filters::LocalSearchFilter;
use crate::helpers::create_pd_lifo_model;
use crate::models::assignment::Delta;
use crate::models::index::RoutingIndexManager;
use crate::model::RoutingModel;
use std::sync::Arc;

fn route_delta(model: &RoutingModel, nodes: &[usize]) -> Delta {
    let mut delta = Delta::default();
    let mut previous = model.start(0);
    for &node in nodes {
        let index = model.manager().node_to_index(node).unwrap();
        delta.set(model.next_var(previous), index as i64);
        previous = index;
    }
    delta.set(model.next_var(previous), model.end(0) as i64);
    delta
}

#[test]
fn can_accept_nested_lifo_sequences() {
    let mut model = create_pd_lifo_model();
    model.close_model().unwrap();

    let mut filter = PickupDeliveryFilter::new(&model);
    let committed = model.new_assignment();
    filter.synchronize(&model, &committed);

    let delta = route_delta(&model, &[1, 2, 3, 6, 5, 4]);
    assert!(filter.accept(&model, &committed, &delta));

    let crossing = route_delta(&model, &[1, 2, 4, 3, 6, 5]);
    assert!(!filter.accept(&model, &committed, &crossing));
}

#[test]
fn can_accept_open_pairs_on_partial_routes() {
    let mut model = create_pd_lifo_model();
    model.close_model().unwrap();

    let mut filter = PickupDeliveryFilter::new(&model);
    let committed = model.new_assignment();
    filter.synchronize(&model, &committed);

    // pickups without deliveries are fine while the route is still open
    let mut delta = Delta::default();
    let pickup = model.manager().node_to_index(1).unwrap();
    delta.set(model.next_var(model.start(0)), pickup as i64);
    assert!(filter.accept(&model, &committed, &delta));

    // a delivery without its pickup is not
    let mut delta = Delta::default();
    let delivery = model.manager().node_to_index(4).unwrap();
    delta.set(model.next_var(model.start(0)), delivery as i64);
    assert!(!filter.accept(&model, &committed, &delta));
}

#[test]
fn can_reject_deliveries_on_a_foreign_vehicle() {
    let manager = RoutingIndexManager::new_single_depot(3, 2, 0).unwrap();
    let mut model = RoutingModel::new(manager.clone());
    let transit = model.register_transit_callback(Arc::new(|_, _| 0));
    model.set_arc_cost_evaluator_of_all_vehicles(transit).unwrap();
    let pickup = manager.node_to_index(1).unwrap();
    let delivery = manager.node_to_index(2).unwrap();
    model.add_pickup_and_delivery(pickup, delivery).unwrap();
    model.close_model().unwrap();

    let mut filter = PickupDeliveryFilter::new(&model);
    let committed = model.routes_to_assignment(&[vec![pickup], vec![]]).unwrap();
    filter.synchronize(&model, &committed);

    let mut delta = Delta::default();
    delta.set(model.next_var(model.start(1)), delivery as i64);
    delta.set(model.vehicle_var(delivery), 1);
    assert!(!filter.accept(&model, &committed, &delta));
}

#[test]
fn can_reject_incompatible_types_on_one_vehicle() {
    let manager = RoutingIndexManager::new_single_depot(4, 1, 0).unwrap();
    let mut model = RoutingModel::new(manager.clone());
    let transit = model.register_transit_callback(Arc::new(|_, _| 0));
    model.set_arc_cost_evaluator_of_all_vehicles(transit).unwrap();
    model.set_visit_type(0, 1).unwrap();
    model.set_visit_type(1, 2).unwrap();
    model.add_type_incompatibility(1, 2).unwrap();
    model.close_model().unwrap();

    let mut filter = TypeIncompatibilityFilter::new(&model);
    let committed = model.new_assignment();
    filter.synchronize(&model, &committed);

    let mut delta = Delta::default();
    delta.set(model.next_var(model.start(0)), 0);
    delta.set(model.next_var(0), 2);
    assert!(filter.accept(&model, &committed, &delta));

    delta.set(model.next_var(2), 1);
    assert!(!filter.accept(&model, &committed, &delta));
}
