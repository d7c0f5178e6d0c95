use super::*;
use crate::helpers::{create_cvrp_model, CVRP_DEMANDS, CVRP_POINTS};
use crate::helpers::{index_matrix, manhattan_matrix};
use crate::models::common::Value;
use crate::models::index::RoutingIndexManager;
use crate::model::{RoutingModel, RoutingSearchStatus};
use std::sync::Arc;

/// Six customers on a line in two far apart clusters; the cheapest plan
/// sweeps everything with one vehicle at cost `2 * 52`.
fn create_clustered_model() -> RoutingModel {
    let points: Vec<Value> = vec![0, 1, 2, 50, 51, 52];
    let manager = RoutingIndexManager::new_single_depot(6, 2, 0).unwrap();
    let mut model = RoutingModel::new(manager.clone());

    let transit = model.register_transit_callback(Arc::new(move |from, to| {
        (points[manager.index_to_node(from)] - points[manager.index_to_node(to)]).abs()
    }));
    model.set_arc_cost_evaluator_of_all_vehicles(transit).unwrap();

    model
}

/// A model no builder can complete: one demand exceeds every capacity and
/// the node cannot be dropped.
fn create_infeasible_model() -> RoutingModel {
    let manager = RoutingIndexManager::new_single_depot(3, 1, 0).unwrap();
    let mut model = RoutingModel::new(manager.clone());

    let costs = index_matrix(&manager, &manhattan_matrix(&CVRP_POINTS[..3]));
    let transit = model.register_transit_callback(Arc::new(move |from, to| costs[from][to]));
    model.set_arc_cost_evaluator_of_all_vehicles(transit).unwrap();

    let demand_manager = manager.clone();
    let demand = model
        .register_unary_transit_callback(Arc::new(move |from| CVRP_DEMANDS[demand_manager.index_to_node(from)] * 10));
    model.add_dimension(demand, 0, 10, true, "load").unwrap();

    model
}

#[test]
fn can_sweep_line_clusters_to_the_optimum() {
    let mut model = create_clustered_model();
    let solution = model.solve().cloned().unwrap();

    assert_eq!(model.status(), RoutingSearchStatus::Success);
    assert_eq!(solution.objective(), Some(104));
}

#[test]
fn can_stop_on_solution_limits() {
    let parameters = SearchParameters { solution_limit: Some(1), ..SearchParameters::default() };

    let mut model = create_clustered_model();
    let solution = model.solve_with_parameters(&parameters).cloned().unwrap();

    assert_eq!(model.status(), RoutingSearchStatus::Success);
    assert!(solution.objective().is_some());
}

#[test]
fn can_distinguish_failures_from_timeouts() {
    let mut model = create_infeasible_model();
    assert!(model.solve().is_none());
    assert_eq!(model.status(), RoutingSearchStatus::Fail);

    let timed_out = SearchParameters { time_limit: Some(Duration::from_millis(0)), ..SearchParameters::default() };
    let mut model = create_infeasible_model();
    assert!(model.solve_with_parameters(&timed_out).is_none());
    assert_eq!(model.status(), RoutingSearchStatus::FailTimeout);
}

#[test]
fn can_build_deltas_between_plans() {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();

    let committed = model.routes_to_assignment(&[vec![0, 1], vec![2, 3]]).unwrap();
    let candidate = vec![vec![1, 0], vec![2, 3]];

    let delta = plan_delta(&model, &committed, &candidate);
    assert_eq!(delta.value(model.next_var(model.start(0))), Some(1));
    assert_eq!(delta.value(model.next_var(1)), Some(0));
    assert_eq!(delta.value(model.next_var(0)), Some(model.end(0) as i64));
    // untouched variables stay out of the delta
    assert_eq!(delta.value(model.next_var(2)), None);
    assert_eq!(delta.value(model.vehicle_var(3)), None);
}

#[test]
fn can_finalize_solutions_with_cumuls() {
    let mut model = create_cvrp_model();
    let finalized = model.dimension("load").unwrap().cumul_var(0);
    model.add_variable_minimized_by_finalizer(finalized);

    let solution = model.solve().cloned().unwrap();

    // cumuls of every dimension are part of the solution and chain up
    let dimension = model.dimension("load").unwrap();
    let routes = model.assignment_to_routes(&solution).unwrap();
    for (vehicle, route) in routes.iter().enumerate() {
        let mut previous = model.start(vehicle);
        let mut load = solution.value(dimension.cumul_var(previous)).unwrap();
        for &index in route {
            load += solution.value(dimension.transit_var(previous)).unwrap();
            assert_eq!(solution.value(dimension.cumul_var(index)), Some(load));
            previous = index;
        }
    }
}

#[test]
fn can_keep_the_best_solution_under_metaheuristics() {
    for metaheuristic in [
        Metaheuristic::GuidedLocalSearch,
        Metaheuristic::SimulatedAnnealing,
        Metaheuristic::TabuSearch,
        Metaheuristic::ObjectiveTabu,
    ] {
        let parameters = SearchParameters {
            metaheuristic,
            branch_limit: Some(20_000),
            failure_limit: Some(10_000),
            ..SearchParameters::default()
        };

        let mut model = create_clustered_model();
        let solution = model.solve_with_parameters(&parameters).cloned().unwrap();
        assert_eq!(solution.objective(), Some(104), "{metaheuristic:?} lost the optimum");
    }
}
