use super::*;
use crate::filters::create_default_filters;
use crate::helpers::create_cvrp_model;
use crate::model::validate_assignment;
use std::sync::Arc;

#[test]
fn can_extend_routes_from_their_tails() {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let assignment = CheapestAdditionBuilder::default().build(&model, &mut filters).unwrap();

    assert!(validate_assignment(&model, &assignment).is_ok());
    let routes = model.assignment_to_routes(&assignment).unwrap();
    assert_eq!(routes.iter().map(Vec::len).sum::<usize>(), 4);
}

#[test]
fn can_process_locked_vehicles_first() {
    let mut model = create_cvrp_model();
    model.apply_lock_to_vehicle(vec![2], 1).unwrap();
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let assignment = CheapestAdditionBuilder::default().build(&model, &mut filters).unwrap();

    assert!(validate_assignment(&model, &assignment).is_ok());
    let routes = model.assignment_to_routes(&assignment).unwrap();
    assert_eq!(routes[1][0], 2);
}

#[test]
fn can_order_successors_with_a_comparator() {
    let mut model = create_cvrp_model();
    // prefer higher indices, feasibility still rules
    model.set_first_solution_comparator(Arc::new(|_, lhs, rhs| rhs.cmp(&lhs)));
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let assignment = CheapestAdditionBuilder::default().build(&model, &mut filters).unwrap();
    assert!(validate_assignment(&model, &assignment).is_ok());
}

#[test]
fn can_order_successors_with_an_evaluator() {
    let mut model = create_cvrp_model();
    model.set_first_solution_evaluator(Arc::new(|_, to| to as i64));
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let assignment = CheapestAdditionBuilder::default().build(&model, &mut filters).unwrap();
    assert!(validate_assignment(&model, &assignment).is_ok());
}
