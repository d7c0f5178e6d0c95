//! A filter propagating cumul bounds along touched paths of one dimension.

#[cfg(test)]
#[path = "../../tests/unit/filters/cumul_test.rs"]
mod cumul_test;

use super::path::{walk_path, PathState};
use super::LocalSearchFilter;
use crate::model::{check_dimension_prefix, RoutingModel};
use crate::models::assignment::{Assignment, Delta};

/// Runs a forward bounds propagation of one dimension over every path a
/// delta touches: windows, capacity and slack bounds must stay satisfiable.
pub struct PathCumulFilter {
    dimension: usize,
    name: String,
    state: PathState,
}

impl PathCumulFilter {
    /// Creates the filter for one dimension of a model.
    pub fn new(model: &RoutingModel, dimension: usize) -> Self {
        Self {
            name: format!("path_cumul({})", model.dimensions()[dimension].name()),
            dimension,
            state: PathState::new(model),
        }
    }
}

impl LocalSearchFilter for PathCumulFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn accept(&mut self, model: &RoutingModel, committed: &Assignment, delta: &Delta) -> bool {
        self.state
            .touched_vehicles(model, delta)
            .into_iter()
            .all(|vehicle| match walk_path(model, committed, Some(delta), vehicle) {
                Some((visits, complete)) => {
                    check_dimension_prefix(model, self.dimension, vehicle, &visits, complete)
                }
                None => false,
            })
    }

    fn synchronize(&mut self, model: &RoutingModel, assignment: &Assignment) {
        self.state.synchronize(model, assignment);
    }
}
