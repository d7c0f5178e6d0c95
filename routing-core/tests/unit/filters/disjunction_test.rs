use super::*;
use crate::filters::LocalSearchFilter;
use crate::helpers::create_tsp_model;

#[test]
fn can_limit_active_cardinality() {
    let mut model = create_tsp_model();
    model.add_disjunction(vec![0, 1], 10, 1).unwrap();
    model.close_model().unwrap();

    let mut filter = NodeDisjunctionFilter::new(&model);
    let committed = model.new_assignment();
    filter.synchronize(&model, &committed);

    // activating one member is fine
    let mut delta = crate::models::assignment::Delta::default();
    delta.set(model.next_var(0), 2);
    assert!(filter.accept(&model, &committed, &delta));

    // activating both at once crosses the cardinality
    delta.set(model.next_var(1), 2);
    assert!(!filter.accept(&model, &committed, &delta));
}

#[test]
fn can_track_counts_across_synchronizations() {
    let mut model = create_tsp_model();
    model.add_disjunction(vec![0, 1], 10, 1).unwrap();
    model.close_model().unwrap();

    let mut filter = NodeDisjunctionFilter::new(&model);
    let mut committed = model.new_assignment();
    committed.set(model.next_var(0), 2);
    filter.synchronize(&model, &committed);

    // the second member can no longer join
    let mut delta = crate::models::assignment::Delta::default();
    delta.set(model.next_var(1), 2);
    assert!(!filter.accept(&model, &committed, &delta));

    // deactivating the first frees the slot for the second
    delta.set(model.next_var(0), 0);
    assert!(filter.accept(&model, &committed, &delta));
}
