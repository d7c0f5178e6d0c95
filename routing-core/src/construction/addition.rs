//! A first solution heuristic extending routes from their current end.

#[cfg(test)]
#[path = "../../tests/unit/construction/addition_test.rs"]
mod addition_test;

use super::{insert_leftovers, FilteredHeuristic};
use crate::filters::LocalSearchFilter;
use crate::model::RoutingModel;
use crate::models::assignment::Assignment;
use std::cmp::Reverse;

/// Grows each route by appending the best legal successor to its tail, as
/// judged by an evaluator or a user supplied comparator. Vehicles carrying a
/// locked partial route are processed first, larger indices before smaller
/// ones.
#[derive(Default)]
pub struct CheapestAdditionBuilder {}

impl CheapestAdditionBuilder {
    /// Builds a first solution, or returns `None` when the filters block it.
    pub fn build(&self, model: &RoutingModel, filters: &mut [Box<dyn LocalSearchFilter>]) -> Option<Assignment> {
        let mut heuristic = FilteredHeuristic::new(model, filters)?;

        let mut vehicles = (0..model.num_vehicles()).collect::<Vec<_>>();
        vehicles.sort_by_key(|&vehicle| (model.locked_chain_of_vehicle(vehicle).is_empty(), Reverse(vehicle)));

        for vehicle in vehicles {
            loop {
                if heuristic.is_route_closed(vehicle) {
                    break;
                }
                let tail = heuristic.route_tail(vehicle);

                let mut candidates = (0..model.size())
                    .filter(|&index| {
                        !model.is_start(index)
                            && !heuristic.is_bound(index)
                            && model.is_vehicle_allowed_for_index(vehicle, index)
                    })
                    .collect::<Vec<_>>();

                match model.first_solution_comparator() {
                    Some(comparator) => candidates.sort_by(|&a, &b| comparator(tail, a, b).then(a.cmp(&b))),
                    None => candidates.sort_by_key(|&index| {
                        let cost = match model.first_solution_evaluator() {
                            Some(evaluator) => evaluator(tail, index),
                            None => model.arc_cost_for_vehicle(tail, index, vehicle as i64),
                        };
                        (cost, index)
                    }),
                }

                let mut extended = false;
                for index in candidates {
                    heuristic.append_visit(vehicle, tail, index);
                    if heuristic.commit() {
                        extended = true;
                        break;
                    }
                }

                if !extended {
                    heuristic.close_route(vehicle, tail);
                    if !heuristic.commit() {
                        return None;
                    }
                }
            }
        }

        insert_leftovers(model, &mut heuristic);
        heuristic.finalize()
    }
}
