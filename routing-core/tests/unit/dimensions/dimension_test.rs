use super::*;
use crate::helpers::create_cvrp_model;
use crate::models::index::RoutingIndexManager;
use crate::model::RoutingModel;

fn create_two_vehicle_model() -> RoutingModel {
    let manager = RoutingIndexManager::new_single_depot(4, 2, 0).unwrap();
    RoutingModel::new(manager)
}

#[test]
fn can_deduplicate_evaluator_classes() {
    let mut model = create_two_vehicle_model();
    let first = model.register_transit_callback(Arc::new(|_, _| 1));
    let second = model.register_transit_callback(Arc::new(|_, _| 2));

    model
        .add_dimension_with_vehicle_transits(vec![first, second], 0, 10, true, "first")
        .unwrap();
    model.add_dimension_with_vehicle_transits(vec![second, second], 0, 10, true, "second").unwrap();

    let first = model.dimension("first").unwrap();
    assert_ne!(first.vehicle_evaluator_class(0), first.vehicle_evaluator_class(1));

    let second = model.dimension("second").unwrap();
    assert_eq!(second.vehicle_evaluator_class(0), second.vehicle_evaluator_class(1));
    assert_eq!(second.class_transit(model.registry(), 0, 1, 2), 2);
}

#[test]
fn can_reject_invalid_dimensions() {
    let mut model = create_two_vehicle_model();
    let transit = model.register_transit_callback(Arc::new(|_, _| 1));

    assert!(model.add_dimension(transit, 0, -1, true, "negative").is_err());
    assert!(model.add_dimension(transit, -1, 10, true, "slack").is_err());
    assert!(model.add_dimension(999, 0, 10, true, "unknown").is_err());

    model.add_dimension(transit, 0, 10, true, "load").unwrap();
    assert!(model.add_dimension(transit, 0, 10, true, "load").is_err());
    assert!(model.has_dimension("load"));
    assert!(!model.has_dimension("time"));
}

#[test]
fn can_keep_cumul_windows_per_vehicle() {
    let mut model = create_two_vehicle_model();
    let transit = model.register_transit_callback(Arc::new(|_, _| 1));
    model.add_dimension_with_vehicle_capacity(transit, 0, vec![10, 20], true, "load").unwrap();

    {
        let dimension = model.dimension_mut("load").unwrap();
        dimension.set_cumul_range(0, ValueRange::new(5, 50));
    }

    let dimension = model.dimension("load").unwrap();
    assert_eq!(dimension.vehicle_capacity(0), 10);
    assert_eq!(dimension.vehicle_cumul_window(0, 0), ValueRange::new(5, 10));
    assert_eq!(dimension.vehicle_cumul_window(1, 0), ValueRange::new(5, 20));
}

#[test]
fn can_collect_cumul_cost_terms() {
    let mut model = create_cvrp_model();
    {
        let dimension = model.dimension_mut("load").unwrap();
        dimension.set_cumul_soft_upper_bound(0, 8, 3);
        dimension.set_cumul_soft_lower_bound(0, 2, 5);
        dimension.set_span_cost_coefficient_for_vehicle(7, 1);
    }

    let dimension = model.dimension("load").unwrap();
    assert!(dimension.has_cumul_costs());
    assert_eq!(dimension.cumul_cost_terms(0).len(), 2);
    assert_eq!(dimension.cumul_cost_terms(1).len(), 0);
    assert_eq!(dimension.vehicle_span_cost_coefficient(1), 7);
    assert_eq!(dimension.vehicle_span_cost_coefficient(0), 0);
}

#[test]
fn can_track_break_constraints() {
    let mut model = create_two_vehicle_model();
    let transit = model.register_transit_callback(Arc::new(|_, _| 1));
    model.add_dimension(transit, 10, 100, true, "time").unwrap();

    let num_indices = model.num_indices();
    let dimension = model.dimension_mut("time").unwrap();
    assert!(!dimension.has_break_constraints());

    dimension.set_break_intervals_of_vehicle(
        vec![BreakInterval { start_min: 5, start_max: 8, duration: 2 }],
        1,
        vec![1; num_indices],
    );
    assert!(dimension.has_break_constraints());
    assert_eq!(dimension.vehicle_break_intervals(0).len(), 0);
    assert_eq!(dimension.vehicle_break_intervals(1).len(), 1);
    assert_eq!(dimension.vehicle_visit_transit(1, 0), 1);
}
