use super::*;
use crate::filters::create_default_filters;
use crate::helpers::{create_cvrp_model, create_tsp_model};
use crate::model::validate_assignment;

#[test]
fn can_tour_a_single_vehicle_problem() {
    let mut model = create_tsp_model();
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let assignment = ChristofidesBuilder::default().build(&model, &mut filters).unwrap();

    assert!(validate_assignment(&model, &assignment).is_ok());
    let routes = model.assignment_to_routes(&assignment).unwrap();
    assert_eq!(routes[0].len(), 3);
}

#[test]
fn can_shard_the_tour_over_the_fleet() {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let assignment = ChristofidesBuilder::default().build(&model, &mut filters).unwrap();

    assert!(validate_assignment(&model, &assignment).is_ok());
    let routes = model.assignment_to_routes(&assignment).unwrap();
    assert_eq!(routes.iter().map(Vec::len).sum::<usize>(), 4);
    assert!(routes.iter().all(|route| !route.is_empty()));
}
