//! A filter scheduling vehicle breaks between the visits of touched paths.

#[cfg(test)]
#[path = "../../tests/unit/filters/breaks_test.rs"]
mod breaks_test;

use super::path::{walk_path, PathState};
use super::LocalSearchFilter;
use crate::model::{check_breaks_prefix, RoutingModel};
use crate::models::assignment::{Assignment, Delta};

/// Runs the disjunctive propagator over visits, travels and breaks of every
/// vehicle a delta touches.
pub struct VehicleBreaksFilter {
    dimension: usize,
    name: String,
    state: PathState,
}

impl VehicleBreaksFilter {
    /// Creates the filter for one dimension of a model.
    pub fn new(model: &RoutingModel, dimension: usize) -> Self {
        Self {
            name: format!("vehicle_breaks({})", model.dimensions()[dimension].name()),
            dimension,
            state: PathState::new(model),
        }
    }
}

impl LocalSearchFilter for VehicleBreaksFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn accept(&mut self, model: &RoutingModel, committed: &Assignment, delta: &Delta) -> bool {
        self.state
            .touched_vehicles(model, delta)
            .into_iter()
            .all(|vehicle| match walk_path(model, committed, Some(delta), vehicle) {
                Some((visits, complete)) => check_breaks_prefix(model, self.dimension, vehicle, &visits, complete),
                None => false,
            })
    }

    fn synchronize(&mut self, model: &RoutingModel, assignment: &Assignment) {
        self.state.synchronize(model, assignment);
    }
}
