use super::*;
use crate::helpers::*;
use crate::search::SearchParameters;
use std::sync::Arc;

fn node_routes(model: &RoutingModel, routes: &[Vec<usize>]) -> Vec<Vec<usize>> {
    routes
        .iter()
        .map(|route| route.iter().map(|&node| model.manager().node_to_index(node).unwrap()).collect())
        .collect()
}

#[test]
fn can_enforce_open_close_lifecycle() {
    let mut model = create_tsp_model();
    assert!(!model.is_closed());

    model.close_model().unwrap();
    assert!(model.is_closed());
    // closing twice is fine, mutating afterwards is not
    model.close_model().unwrap();

    assert!(model.set_fixed_cost_of_all_vehicles(5).is_err());
    assert!(model.add_disjunction(vec![0], 10, 1).is_err());
    assert!(model.add_soft_same_vehicle_constraint(vec![0, 1], 10).is_err());
    assert!(model.set_visit_type(0, 1).is_err());
    assert!(model.dimension_mut("load").is_err());
}

#[test]
fn can_derive_cost_and_vehicle_classes() {
    let mut model = create_cvrp_model();
    model.set_fixed_cost_of_vehicle(100, 1).unwrap();
    model.close_model().unwrap();

    // one arc evaluator, no span costs: a single cost class
    assert_eq!(model.cost_classes().len(), 1);
    assert_eq!(model.cost_class_of_vehicle(0), model.cost_class_of_vehicle(1));

    // the differing fixed cost splits the vehicle classes but not the
    // homogeneity of arc costs
    assert_eq!(model.vehicle_classes().len(), 2);
    assert_ne!(model.vehicle_class_of_vehicle(0), model.vehicle_class_of_vehicle(1));
    assert!(!model.costs_are_homogeneous_across_vehicles());
}

#[test]
fn can_compute_arc_costs_with_fixed_costs() {
    let mut model = create_tsp_model();
    model.set_fixed_cost_of_all_vehicles(7).unwrap();
    model.close_model().unwrap();

    let start = model.start(0);
    let node_one = model.manager().node_to_index(1).unwrap();
    let node_two = model.manager().node_to_index(2).unwrap();

    assert_eq!(model.arc_cost_for_vehicle(node_one, node_two, 0), 3);
    // twice, to exercise the cost cache
    assert_eq!(model.arc_cost_for_vehicle(node_one, node_two, 0), 3);
    assert_eq!(model.arc_cost_for_vehicle(start, node_one, 0), 1 + 7);
    assert_eq!(model.arc_cost_for_vehicle(start, model.end(0), 0), 0);
    assert_eq!(model.arc_cost_for_vehicle(node_one, node_two, -1), 0);
    assert_eq!(model.arc_cost_for_class(start, node_one, 0), 1);
}

#[test]
fn can_register_disjunctions() {
    let mut model = create_tsp_model();

    assert!(model.add_disjunction(vec![0, 1], 10, 0).is_err());
    assert!(model.add_disjunction(vec![0, 1], 10, 3).is_err());
    assert!(model.add_disjunction(vec![model.start(0)], 10, 1).is_err());

    let disjunction = model.add_disjunction(vec![0, 1], 10, 1).unwrap();
    assert_eq!(model.disjunctions_of_index(0), &[disjunction]);
    assert_eq!(model.disjunctions_of_index(2), &[] as &[usize]);

    // an alternative can cover the cardinality for free
    assert_eq!(model.unperformed_penalty(0), Some(0));
    // a singleton disjunction costs its penalty
    let single = model.add_disjunction(vec![2], 50, 1).unwrap();
    assert_eq!(model.disjunction(single).penalty, 50);
    assert_eq!(model.unperformed_penalty(2), Some(50));

    // a hard singleton disjunction cannot be dropped
    let mut hard = create_tsp_model();
    hard.add_disjunction(vec![2], NO_PENALTY, 1).unwrap();
    assert_eq!(hard.unperformed_penalty(2), None);
    assert_eq!(hard.unperformed_penalty(1), None);
}

#[test]
fn can_round_trip_routes_through_assignments() {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();

    let routes = node_routes(&model, &[vec![1, 2], vec![3, 4]]);
    let assignment = model.routes_to_assignment(&routes).unwrap();
    assert_eq!(model.assignment_to_routes(&assignment).unwrap(), routes);

    // unknown and duplicated indices are rejected
    assert!(model.routes_to_assignment(&[vec![model.start(0)], vec![]]).is_err());
    assert!(model.routes_to_assignment(&[vec![0], vec![0]]).is_err());
    assert!(model.routes_to_assignment(&[vec![0]]).is_err());

    // vehicle variables follow the routes
    let index = routes[1][0];
    assert_eq!(assignment.value(model.vehicle_var(index)), Some(1));
    assert!(model.is_vehicle_used(&assignment, 0));
}

#[test]
fn can_compact_used_vehicles_to_a_prefix() {
    // nodes 3 and 4 are droppable so a single route plan stays feasible
    let mut model = create_cvrp_model();
    for node in [3, 4] {
        let index = model.manager().node_to_index(node).unwrap();
        model.add_disjunction(vec![index], 1000, 1).unwrap();
    }
    model.close_model().unwrap();

    let routes = node_routes(&model, &[vec![], vec![1, 2]]);
    let assignment = model.routes_to_assignment(&routes).unwrap();

    let compacted = model.compact_assignment(&assignment).unwrap();
    let compacted_routes = model.assignment_to_routes(&compacted).unwrap();
    assert!(!compacted_routes[0].is_empty());
    assert!(compacted_routes[1].is_empty());
}

#[test]
fn can_validate_assignments_against_the_network() {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();

    let feasible = model.routes_to_assignment(&node_routes(&model, &[vec![1, 2], vec![3, 4]])).unwrap();
    assert!(validate_assignment(&model, &feasible).is_ok());

    // demand 5 + 4 + 3 overflows the capacity of 10
    let overloaded = model.routes_to_assignment(&node_routes(&model, &[vec![1, 2, 4], vec![3]])).unwrap();
    assert!(validate_assignment(&model, &overloaded).is_err());
}

#[test]
fn can_solve_a_four_city_tour() {
    let mut model = create_tsp_model();
    let solution = model.solve().cloned().unwrap();

    assert_eq!(model.status(), RoutingSearchStatus::Success);
    assert_eq!(solution.objective(), Some(12));

    let routes = model.assignment_to_routes(&solution).unwrap();
    assert_eq!(routes[0].len(), 3);
}

#[test]
fn can_solve_a_capacitated_problem_with_two_vehicles() {
    let mut model = create_cvrp_model();
    let solution = model.solve().cloned().unwrap();
    assert_eq!(model.status(), RoutingSearchStatus::Success);

    let routes = model.assignment_to_routes(&solution).unwrap();
    assert!(routes.iter().all(|route| !route.is_empty()));

    for route in &routes {
        let load: Value = route
            .iter()
            .map(|&index| CVRP_DEMANDS[model.manager().index_to_node(index)])
            .sum();
        assert!(load <= 10);
    }
}

#[test]
fn can_schedule_time_windows() {
    let mut model = create_vrptw_model();
    let solution = model.solve().cloned().unwrap();
    assert_eq!(model.status(), RoutingSearchStatus::Success);

    let windows: [(Value, Value); 5] = [(0, 100), (5, 10), (6, 12), (10, 20), (15, 25)];
    let routes = model.assignment_to_routes(&solution).unwrap();
    let dimension = model.dimension("time").unwrap();

    for route in routes {
        for index in route {
            let (min, max) = windows[model.manager().index_to_node(index)];
            let cumul = solution.value(dimension.cumul_var(index)).unwrap();
            assert!(cumul >= min && cumul <= max, "cumul {cumul} outside [{min}, {max}]");
        }
    }
}

#[test]
fn can_drop_a_node_when_the_penalty_is_cheaper() {
    let manager = RoutingIndexManager::new_single_depot(5, 1, 0).unwrap();
    let mut model = RoutingModel::new(manager.clone());

    let cost_manager = manager.clone();
    let transit = model.register_transit_callback(Arc::new(move |from, to| {
        let expensive = cost_manager.index_to_node(from) == 4 || cost_manager.index_to_node(to) == 4;
        if expensive {
            30
        } else {
            0
        }
    }));
    model.set_arc_cost_evaluator_of_all_vehicles(transit).unwrap();

    let optional = manager.node_to_index(4).unwrap();
    model.add_disjunction(vec![optional], 50, 1).unwrap();

    let solution = model.solve().cloned().unwrap();
    assert_eq!(solution.objective(), Some(50));

    let routes = model.assignment_to_routes(&solution).unwrap();
    assert!(!routes[0].contains(&optional));
    assert_eq!(solution.value(model.active_var(optional)), Some(0));
    assert_eq!(solution.value(model.vehicle_var(optional)), Some(-1));
}

#[test]
fn can_charge_each_extra_vehicle_of_a_same_vehicle_group() {
    let manager = RoutingIndexManager::new_single_depot(5, 2, 0).unwrap();
    let mut model = RoutingModel::new(manager);

    let transit = model.register_transit_callback(Arc::new(|_, _| 0));
    model.set_arc_cost_evaluator_of_all_vehicles(transit).unwrap();

    assert!(model.add_soft_same_vehicle_constraint(vec![model.start(0)], 10).is_err());
    assert!(model.add_soft_same_vehicle_constraint(vec![0, 1], -1).is_err());
    model.add_soft_same_vehicle_constraint(vec![0, 1], 17).unwrap();
    model.close_model().unwrap();

    let mut together = model.routes_to_assignment(&[vec![0, 1, 2, 3], vec![]]).unwrap();
    together.set_objective(0);
    assert!(validate_assignment(&model, &together).is_ok());

    let mut split = model.routes_to_assignment(&[vec![0, 2], vec![1, 3]]).unwrap();
    split.set_objective(17);
    assert!(validate_assignment(&model, &split).is_ok());

    // the cheaper objective no longer matches once the group is split
    split.set_objective(0);
    assert!(validate_assignment(&model, &split).is_err());
}

#[test]
fn can_enforce_lifo_pickup_and_delivery_order() {
    let mut model = create_pd_lifo_model();
    model.close_model().unwrap();

    let nested = model.routes_to_assignment(&node_routes(&model, &[vec![1, 2, 3, 6, 5, 4]])).unwrap();
    assert!(validate_assignment(&model, &nested).is_ok());

    let crossing = model.routes_to_assignment(&node_routes(&model, &[vec![1, 2, 4, 3, 6, 5]])).unwrap();
    assert!(validate_assignment(&model, &crossing).is_err());
}

#[test]
fn can_schedule_visits_around_a_break() {
    let mut model = create_breaks_model();
    let solution = model.solve().cloned().unwrap();
    assert_eq!(model.status(), RoutingSearchStatus::Success);

    let routes = model.assignment_to_routes(&solution).unwrap();
    assert_eq!(routes[0].len(), 3);

    let dimension = model.dimension("time").unwrap();
    for &index in &routes[0] {
        let cumul = solution.value(dimension.cumul_var(index)).unwrap();
        let overlaps = cumul < 20 && cumul + 4 > 10;
        assert!(!overlaps, "visit [{cumul}, {}) overlaps the break", cumul + 4);
    }
}

#[test]
fn can_reproduce_runs_with_a_fixed_seed() {
    let parameters = SearchParameters { seed: 17, ..SearchParameters::default() };

    let mut first = create_cvrp_model();
    let first_solution = first.solve_with_parameters(&parameters).cloned().unwrap();

    let mut second = create_cvrp_model();
    let second_solution = second.solve_with_parameters(&parameters).cloned().unwrap();

    assert_eq!(first_solution.objective(), second_solution.objective());
    assert_eq!(
        first.assignment_to_routes(&first_solution).unwrap(),
        second.assignment_to_routes(&second_solution).unwrap()
    );
}

#[test]
fn can_write_and_read_solution_files() {
    let mut model = create_tsp_model();
    let solution = model.solve().cloned().unwrap();

    let path = std::env::temp_dir().join("routing_core_solution_test.txt");
    model.write_assignment(&solution, &path).unwrap();
    let read = model.read_assignment(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(read.objective(), solution.objective());
    assert_eq!(model.assignment_to_routes(&read).unwrap(), model.assignment_to_routes(&solution).unwrap());
}
