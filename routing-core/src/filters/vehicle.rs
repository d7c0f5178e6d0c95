//! Filters over vehicle assignment and vehicle level costs.

#[cfg(test)]
#[path = "../../tests/unit/filters/vehicle_test.rs"]
mod vehicle_test;

use super::path::{walk_path, PathState};
use super::LocalSearchFilter;
use crate::model::RoutingModel;
use crate::models::assignment::{Assignment, Delta};
use crate::models::common::{cap_mul, Cost};

/// Rejects deltas placing an index on a vehicle outside its allowed set.
pub struct VehicleVarFilter {
    state: PathState,
}

impl VehicleVarFilter {
    /// Creates the filter for a model.
    pub fn new(model: &RoutingModel) -> Self {
        Self { state: PathState::new(model) }
    }
}

impl LocalSearchFilter for VehicleVarFilter {
    fn name(&self) -> &str {
        "vehicle_var"
    }

    fn accept(&mut self, model: &RoutingModel, committed: &Assignment, delta: &Delta) -> bool {
        for (variable, value) in delta.iter() {
            if let Some(index) = model.as_vehicle_variable(variable) {
                if value >= 0 && !model.is_vehicle_allowed_for_index(value as usize, index) {
                    return false;
                }
            }
        }

        self.state.touched_vehicles(model, delta).into_iter().all(|vehicle| {
            match walk_path(model, committed, Some(delta), vehicle) {
                Some((visits, _)) => {
                    visits.iter().all(|&index| model.is_vehicle_allowed_for_index(vehicle, index))
                }
                None => false,
            }
        })
    }

    fn synchronize(&mut self, model: &RoutingModel, assignment: &Assignment) {
        self.state.synchronize(model, assignment);
    }
}

/// Recomputes the amortized vehicle cost of touched routes; the term
/// `linear - quadratic * length^2` only shrinks with route length, so a
/// delta is rejected when it would overflow the cost domain.
pub struct VehicleAmortizedCostFilter {
    state: PathState,
    route_costs: Vec<Cost>,
}

impl VehicleAmortizedCostFilter {
    /// Creates the filter for a model.
    pub fn new(model: &RoutingModel) -> Self {
        Self { state: PathState::new(model), route_costs: vec![0; model.num_vehicles()] }
    }

    /// Returns the amortized cost of a route of the given length.
    fn amortized_cost(model: &RoutingModel, vehicle: usize, length: usize) -> Cost {
        if length == 0 {
            return 0;
        }
        let length = length as Cost;
        model.amortized_linear_cost_factors()[vehicle]
            - cap_mul(model.amortized_quadratic_cost_factors()[vehicle], length * length)
    }
}

impl LocalSearchFilter for VehicleAmortizedCostFilter {
    fn name(&self) -> &str {
        "vehicle_amortized_cost"
    }

    fn accept(&mut self, model: &RoutingModel, committed: &Assignment, delta: &Delta) -> bool {
        self.state
            .touched_vehicles(model, delta)
            .into_iter()
            .all(|vehicle| match walk_path(model, committed, Some(delta), vehicle) {
                Some((visits, _)) => {
                    // the term constrains nothing by itself: the filter only
                    // guards against a saturated cost delta and rejects
                    // malformed paths
                    let change = Self::amortized_cost(model, vehicle, visits.len()) - self.route_costs[vehicle];
                    change.abs() < crate::models::common::MAX_VALUE
                }
                None => false,
            })
    }

    fn synchronize(&mut self, model: &RoutingModel, assignment: &Assignment) {
        self.state.synchronize(model, assignment);
        for vehicle in 0..model.num_vehicles() {
            let length = walk_path(model, assignment, None, vehicle).map_or(0, |(visits, _)| visits.len());
            self.route_costs[vehicle] = Self::amortized_cost(model, vehicle, length);
        }
    }
}
