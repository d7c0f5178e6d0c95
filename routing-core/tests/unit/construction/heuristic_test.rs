use super::*;
use crate::filters::create_default_filters;
use crate::helpers::create_cvrp_model;
use crate::model::validate_assignment;

#[test]
fn can_commit_deltas_through_filters() {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let mut heuristic = FilteredHeuristic::new(&model, &mut filters).unwrap();
    assert_eq!(heuristic.rejected_count(), 0);

    heuristic.append_visit(0, model.start(0), 0);
    assert!(heuristic.commit());
    assert!(heuristic.is_bound(model.start(0)));
    assert_eq!(heuristic.route_visits(0), vec![0]);
    assert_eq!(heuristic.route_tail(0), 0);

    // overloading the vehicle is rejected and leaves the state untouched
    heuristic.append_visit(0, 0, 1);
    heuristic.append_visit(0, 1, 2);
    assert!(!heuristic.commit());
    assert_eq!(heuristic.rejected_count(), 1);
    assert_eq!(heuristic.route_visits(0), vec![0]);
}

#[test]
fn can_finalize_only_complete_assignments() {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let mut heuristic = FilteredHeuristic::new(&model, &mut filters).unwrap();
    heuristic.append_visit(0, model.start(0), 0);
    assert!(heuristic.commit());
    heuristic.append_visit(0, 0, 1);
    assert!(heuristic.commit());
    heuristic.append_visit(1, model.start(1), 2);
    assert!(heuristic.commit());
    heuristic.append_visit(1, 2, 3);
    assert!(heuristic.commit());

    let assignment = heuristic.finalize().unwrap();
    assert!(validate_assignment(&model, &assignment).is_ok());
}

#[test]
fn can_respect_locked_chains() {
    let mut model = create_cvrp_model();
    model.apply_lock_to_vehicle(vec![3], 1).unwrap();
    model.close_model().unwrap();
    let mut filters = create_default_filters(&model);

    let heuristic = FilteredHeuristic::new(&model, &mut filters).unwrap();
    assert_eq!(heuristic.route_visits(1), vec![3]);
}

#[test]
fn can_build_with_every_strategy() {
    use crate::search::SearchParameters;

    for strategy in [
        FirstSolutionStrategy::GlobalCheapestInsertion,
        FirstSolutionStrategy::SequentialCheapestInsertion,
        FirstSolutionStrategy::LocalCheapestInsertion,
        FirstSolutionStrategy::CheapestAddition,
        FirstSolutionStrategy::ParallelSavings,
        FirstSolutionStrategy::SequentialSavings,
        FirstSolutionStrategy::Christofides,
    ] {
        let mut model = create_cvrp_model();
        model.close_model().unwrap();
        let mut filters = create_default_filters(&model);

        let parameters = SearchParameters { first_solution_strategy: strategy, ..SearchParameters::default() };
        let assignment = build_first_solution(&model, &parameters, &mut filters)
            .unwrap_or_else(|| panic!("{strategy:?} failed to build a first solution"));

        assert!(
            validate_assignment(&model, &assignment).is_ok(),
            "{strategy:?} built an invalid first solution"
        );
    }
}
