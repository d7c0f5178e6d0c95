use super::*;
use crate::filters::create_default_filters;
use crate::helpers::{create_cvrp_model, create_pd_lifo_model};
use crate::model::validate_assignment;
use crate::search::SearchParameters;

#[test]
fn can_insert_all_nodes_within_capacity() {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let builder = GlobalCheapestInsertionBuilder::new(false, &SearchParameters::default());
    let assignment = builder.build(&model, &mut filters).unwrap();

    assert!(validate_assignment(&model, &assignment).is_ok());
    let routes = model.assignment_to_routes(&assignment).unwrap();
    assert_eq!(routes.iter().map(Vec::len).sum::<usize>(), 4);
}

#[test]
fn can_open_routes_one_at_a_time_in_sequential_mode() {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let builder = GlobalCheapestInsertionBuilder::new(true, &SearchParameters::default());
    let assignment = builder.build(&model, &mut filters).unwrap();
    assert!(validate_assignment(&model, &assignment).is_ok());
}

#[test]
fn can_seed_routes_with_farthest_nodes() {
    let mut model = crate::helpers::create_tsp_model();
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let parameters =
        SearchParameters { cheapest_insertion_farthest_seeds_ratio: 1., ..SearchParameters::default() };
    let builder = GlobalCheapestInsertionBuilder::new(false, &parameters);
    let assignment = builder.build(&model, &mut filters).unwrap();

    assert!(validate_assignment(&model, &assignment).is_ok());
    // the farthest node seeds the single route
    let routes = model.assignment_to_routes(&assignment).unwrap();
    assert_eq!(routes[0].first(), model.manager().node_to_index(3).as_ref());
}

#[test]
fn can_truncate_the_insertion_neighborhood() {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let parameters = SearchParameters { cheapest_insertion_neighbors_ratio: 0.5, ..SearchParameters::default() };
    let builder = GlobalCheapestInsertionBuilder::new(false, &parameters);
    let assignment = builder.build(&model, &mut filters).unwrap();
    assert!(validate_assignment(&model, &assignment).is_ok());
}

#[test]
fn can_insert_pairs_as_units() {
    let mut model = create_pd_lifo_model();
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let builder = GlobalCheapestInsertionBuilder::new(false, &SearchParameters::default());
    let assignment = builder.build(&model, &mut filters).unwrap();

    assert!(validate_assignment(&model, &assignment).is_ok());
    let routes = model.assignment_to_routes(&assignment).unwrap();
    assert_eq!(routes[0].len(), 6);
}

#[test]
fn can_insert_locally_in_index_order() {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let assignment = LocalCheapestInsertionBuilder::default().build(&model, &mut filters).unwrap();
    assert!(validate_assignment(&model, &assignment).is_ok());
}

#[test]
fn can_drop_undesirable_optional_nodes() {
    let mut model = create_cvrp_model();
    // make one node optional and impossible: its demand alone fits, but
    // a tiny allowed set of vehicles does not exist
    let node = 2;
    model.add_disjunction(vec![node], 5, 1).unwrap();
    model.set_allowed_vehicles_for_index(vec![], node).unwrap();
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let builder = GlobalCheapestInsertionBuilder::new(false, &SearchParameters::default());
    let assignment = builder.build(&model, &mut filters).unwrap();

    assert!(validate_assignment(&model, &assignment).is_ok());
    assert_eq!(assignment.value(model.active_var(node)), Some(0));
}
