//! The filter of last resort: restores the delta into a shadow assignment
//! and propagates the whole constraint network.

#[cfg(test)]
#[path = "../../tests/unit/filters/feasibility_test.rs"]
mod feasibility_test;

use super::path::{walk_path, PathState};
use super::LocalSearchFilter;
use crate::model::{check_dimension_prefix, validate_assignment, RoutingModel};
use crate::models::assignment::{Assignment, Delta};

/// Merges the delta into a shadow of the committed assignment and asks the
/// constraint network to propagate it. Complete assignments get the full
/// validation; partial ones a per path relaxation.
pub struct CpFeasibilityFilter {
    state: PathState,
    shadow: Assignment,
}

impl CpFeasibilityFilter {
    /// Creates the filter for a model.
    pub fn new(model: &RoutingModel) -> Self {
        Self { state: PathState::new(model), shadow: Assignment::default() }
    }
}

impl LocalSearchFilter for CpFeasibilityFilter {
    fn name(&self) -> &str {
        "cp_feasibility"
    }

    fn accept(&mut self, model: &RoutingModel, committed: &Assignment, delta: &Delta) -> bool {
        self.shadow = committed.clone();
        self.shadow.merge(delta);
        self.shadow.clear_objective();

        let complete = (0..model.size()).all(|index| self.shadow.is_bound(model.next_var(index)));
        if complete {
            return validate_assignment(model, &self.shadow).is_ok();
        }

        self.state.touched_vehicles(model, delta).into_iter().all(|vehicle| {
            match walk_path(model, committed, Some(delta), vehicle) {
                Some((visits, complete)) => model
                    .dimensions()
                    .iter()
                    .all(|dimension| check_dimension_prefix(model, dimension.index(), vehicle, &visits, complete)),
                None => false,
            }
        })
    }

    fn synchronize(&mut self, model: &RoutingModel, assignment: &Assignment) {
        self.state.synchronize(model, assignment);
    }
}
