//! Filters over pickup and delivery coupling and visit type compatibility.

#[cfg(test)]
#[path = "../../tests/unit/filters/pickup_test.rs"]
mod pickup_test;

use super::path::{walk_path, PathState};
use super::LocalSearchFilter;
use crate::model::{check_visit_types, PickupAndDeliveryPolicy, RoutingModel};
use crate::models::assignment::{Assignment, Delta};

/// Enforces that every delivery follows its pickup on the same vehicle, with
/// the nesting or queueing discipline the vehicle policy demands.
pub struct PickupDeliveryFilter {
    state: PathState,
}

impl PickupDeliveryFilter {
    /// Creates the filter for a model.
    pub fn new(model: &RoutingModel) -> Self {
        Self { state: PathState::new(model) }
    }

    fn check_path(model: &RoutingModel, vehicle: usize, visits: &[usize], complete: bool) -> bool {
        let policy = model.pickup_and_delivery_policy_of_vehicle(vehicle);

        let mut open: Vec<usize> = Vec::default();
        for &index in visits {
            for &(pair, _) in model.pickup_positions(index) {
                open.push(pair);
            }

            for &(pair, _) in model.delivery_positions(index) {
                let matched = match policy {
                    PickupAndDeliveryPolicy::Any => {
                        open.iter().rposition(|&candidate| candidate == pair).map(|position| {
                            open.remove(position);
                        })
                    }
                    PickupAndDeliveryPolicy::Lifo => (open.last() == Some(&pair)).then(|| {
                        open.pop();
                    }),
                    PickupAndDeliveryPolicy::Fifo => (open.first() == Some(&pair)).then(|| {
                        open.remove(0);
                    }),
                };

                if matched.is_none() {
                    return false;
                }
            }
        }

        open.is_empty() || !complete
    }
}

impl LocalSearchFilter for PickupDeliveryFilter {
    fn name(&self) -> &str {
        "pickup_delivery"
    }

    fn accept(&mut self, model: &RoutingModel, committed: &Assignment, delta: &Delta) -> bool {
        self.state
            .touched_vehicles(model, delta)
            .into_iter()
            .all(|vehicle| match walk_path(model, committed, Some(delta), vehicle) {
                Some((visits, complete)) => Self::check_path(model, vehicle, &visits, complete),
                None => false,
            })
    }

    fn synchronize(&mut self, model: &RoutingModel, assignment: &Assignment) {
        self.state.synchronize(model, assignment);
    }
}

/// Rejects routes carrying two incompatible visit types.
pub struct TypeIncompatibilityFilter {
    state: PathState,
}

impl TypeIncompatibilityFilter {
    /// Creates the filter for a model.
    pub fn new(model: &RoutingModel) -> Self {
        Self { state: PathState::new(model) }
    }
}

impl LocalSearchFilter for TypeIncompatibilityFilter {
    fn name(&self) -> &str {
        "type_incompatibility"
    }

    fn accept(&mut self, model: &RoutingModel, committed: &Assignment, delta: &Delta) -> bool {
        self.state
            .touched_vehicles(model, delta)
            .into_iter()
            .all(|vehicle| match walk_path(model, committed, Some(delta), vehicle) {
                Some((visits, _)) => check_visit_types(model, &visits),
                None => false,
            })
    }

    fn synchronize(&mut self, model: &RoutingModel, assignment: &Assignment) {
        self.state.synchronize(model, assignment);
    }
}
