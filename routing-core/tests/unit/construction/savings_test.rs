use super::*;
use crate::filters::create_default_filters;
use crate::helpers::create_cvrp_model;
use crate::model::validate_assignment;
use crate::search::SearchParameters;

#[test]
fn can_build_routes_from_parallel_savings() {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let builder = SavingsBuilder::new(false, &SearchParameters::default());
    let assignment = builder.build(&model, &mut filters).unwrap();

    assert!(validate_assignment(&model, &assignment).is_ok());
    let routes = model.assignment_to_routes(&assignment).unwrap();
    assert_eq!(routes.iter().map(Vec::len).sum::<usize>(), 4);
}

#[test]
fn can_build_routes_from_sequential_savings() {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let builder = SavingsBuilder::new(true, &SearchParameters::default());
    let assignment = builder.build(&model, &mut filters).unwrap();
    assert!(validate_assignment(&model, &assignment).is_ok());
}

#[test]
fn can_restrict_savings_to_cheap_neighbors() {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let parameters = SearchParameters {
        savings_neighbors_ratio: 0.5,
        savings_arc_coefficient: 2.,
        ..SearchParameters::default()
    };
    let builder = SavingsBuilder::new(false, &parameters);
    let assignment = builder.build(&model, &mut filters).unwrap();
    assert!(validate_assignment(&model, &assignment).is_ok());
}

#[test]
fn can_prefer_cheaper_vehicles_when_merging() {
    let mut model = create_cvrp_model();
    model.set_fixed_cost_of_vehicle(100, 0).unwrap();
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let builder = SavingsBuilder::new(false, &SearchParameters::default());
    let assignment = builder.build(&model, &mut filters).unwrap();
    assert!(validate_assignment(&model, &assignment).is_ok());
}
