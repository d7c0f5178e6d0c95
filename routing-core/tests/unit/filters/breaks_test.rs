use super::*;
use crate::filters::LocalSearchFilter;
use crate::helpers::create_breaks_model;
use crate::models::assignment::Delta;
use crate::models::common::ValueRange;

#[test]
fn can_schedule_visits_between_breaks() {
    let mut model = create_breaks_model();
    model.close_model().unwrap();
    let dimension = model.dimension_index("time").unwrap();

    let mut filter = VehicleBreaksFilter::new(&model, dimension);
    let committed = model.new_assignment();
    filter.synchronize(&model, &committed);

    // three visits of four units fit around the break by shifting
    let mut delta = Delta::default();
    delta.set(model.next_var(model.start(0)), 0);
    delta.set(model.next_var(0), 1);
    delta.set(model.next_var(1), 2);
    delta.set(model.next_var(2), model.end(0) as i64);
    assert!(filter.accept(&model, &committed, &delta));
}

#[test]
fn can_reject_unschedulable_breaks() {
    let mut model = create_breaks_model();
    {
        // leave no room after the break: everything must finish by 21
        let dimension = model.dimension_mut("time").unwrap();
        for index in 0..4 {
            dimension.set_cumul_range(index, ValueRange::new(0, 17));
        }
    }
    model.close_model().unwrap();
    let dimension = model.dimension_index("time").unwrap();

    let mut filter = VehicleBreaksFilter::new(&model, dimension);
    let committed = model.new_assignment();
    filter.synchronize(&model, &committed);

    let mut delta = Delta::default();
    delta.set(model.next_var(model.start(0)), 0);
    delta.set(model.next_var(0), 1);
    delta.set(model.next_var(1), 2);
    delta.set(model.next_var(2), model.end(0) as i64);
    assert!(!filter.accept(&model, &committed, &delta));
}
