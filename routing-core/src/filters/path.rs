//! Shared machinery of path based filters: identifies the paths a delta
//! touches and rebuilds them with the delta overlaid.

use crate::model::RoutingModel;
use crate::models::assignment::{Assignment, Delta};

/// Committed per path state kept by path based filters between two
/// synchronizations.
#[derive(Debug, Default)]
pub(crate) struct PathState {
    path_of: Vec<Option<usize>>,
}

impl PathState {
    pub(crate) fn new(model: &RoutingModel) -> Self {
        Self { path_of: vec![None; model.size()] }
    }

    /// Rebuilds the index to vehicle mapping from a committed assignment.
    pub(crate) fn synchronize(&mut self, model: &RoutingModel, assignment: &Assignment) {
        self.path_of.iter_mut().for_each(|vehicle| *vehicle = None);

        for vehicle in 0..model.num_vehicles() {
            if let Some((visits, _)) = walk_path(model, assignment, None, vehicle) {
                self.path_of[model.start(vehicle)] = Some(vehicle);
                visits.iter().for_each(|&index| self.path_of[index] = Some(vehicle));
            }
        }
    }

    /// Returns vehicles whose path the delta may change, deduplicated.
    pub(crate) fn touched_vehicles(&self, model: &RoutingModel, delta: &Delta) -> Vec<usize> {
        let mut vehicles = Vec::default();
        let mut push = |vehicle: usize| {
            if !vehicles.contains(&vehicle) {
                vehicles.push(vehicle);
            }
        };

        for (variable, value) in delta.iter() {
            if let Some(index) = model.as_next_variable(variable) {
                if model.is_start(index) {
                    push(model.manager().terminal_vehicle(index).unwrap());
                } else if let Some(vehicle) = self.path_of[index] {
                    push(vehicle);
                }

                let target = value as usize;
                if value >= 0 && target < model.size() {
                    if let Some(vehicle) = self.path_of[target] {
                        push(vehicle);
                    }
                }
            } else if let Some(index) = model.as_vehicle_variable(variable) {
                if value >= 0 {
                    push(value as usize);
                } else if index < model.size() {
                    if let Some(vehicle) = self.path_of[index] {
                        push(vehicle);
                    }
                }
            }
        }

        vehicles
    }
}

/// Follows successors of one vehicle from its start, preferring delta values
/// over committed ones. Returns the visits and whether the path reaches its
/// end; `None` flags a malformed path (cycle or foreign terminal).
pub(crate) fn walk_path(
    model: &RoutingModel,
    committed: &Assignment,
    delta: Option<&Delta>,
    vehicle: usize,
) -> Option<(Vec<usize>, bool)> {
    let mut visits = Vec::default();
    let mut current = model.start(vehicle);
    let mut steps = 0;

    loop {
        steps += 1;
        if steps > model.num_indices() {
            return None;
        }

        let variable = model.next_var(current);
        let next = delta.and_then(|delta| delta.value(variable)).or_else(|| committed.value(variable));

        let Some(next) = next else {
            return Some((visits, false));
        };
        if next < 0 || next >= model.num_indices() as i64 || next as usize == current {
            return None;
        }

        current = next as usize;
        if model.is_end(current) {
            return (current == model.end(vehicle)).then_some((visits, true));
        }
        if model.is_start(current) {
            return None;
        }
        visits.push(current);
    }
}
