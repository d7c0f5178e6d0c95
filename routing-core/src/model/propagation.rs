//! Propagation of the routing network over a complete assignment: the
//! catch-all feasibility check behind the filter of last resort.

use super::{evaluate_plan, RoutingModel};
use crate::lp::CumulOptimizer;
use crate::models::assignment::Assignment;
use rosomaxa::prelude::GenericResult;

/// Restores the assignment into the routing network and propagates all
/// constraints: path coherence, disjunction cardinalities, dimension
/// chaining, breaks, pickup and delivery coupling. When the assignment
/// carries an objective, it is compared against the recomputed cost.
pub fn validate_assignment(model: &RoutingModel, assignment: &Assignment) -> GenericResult<()> {
    let size = model.size();

    for index in 0..size {
        let next = assignment.value(model.next_var(index));
        let vehicle = assignment.value(model.vehicle_var(index));
        let active = assignment.value(model.active_var(index));

        if let Some(next) = next {
            if next < 0 || next >= model.num_indices() as i64 {
                return Err(format!("next({index}) = {next} is out of range").into());
            }

            let is_loop = next as usize == index;
            if let Some(active) = active {
                if (active == 0) != is_loop {
                    return Err(format!("active({index}) contradicts next({index})").into());
                }
            }
            if let Some(vehicle) = vehicle {
                if (vehicle < 0) != is_loop {
                    return Err(format!("vehicle({index}) contradicts next({index})").into());
                }
            }

            // vehicle propagates along arcs
            if !is_loop {
                if let (Some(vehicle), Some(next_vehicle)) =
                    (vehicle, assignment.value(model.vehicle_var(next as usize)))
                {
                    if vehicle != next_vehicle {
                        return Err(format!("vehicle changes along the arc {index} -> {next}").into());
                    }
                }
            }
        }

        if model.is_start(index) && active == Some(0) {
            return Err(format!("vehicle start {index} cannot be inactive").into());
        }
    }

    let routes = model.assignment_to_routes(assignment)?;

    let mut optimizer = CumulOptimizer::new(model.num_vehicles());
    let plan = evaluate_plan(model, &routes, &mut optimizer)
        .ok_or_else(|| format!("the assignment violates routing constraints"))?;

    if let Some(objective) = assignment.objective() {
        if objective != plan.cost {
            return Err(format!("objective mismatch: stated {objective}, recomputed {}", plan.cost).into());
        }
    }

    Ok(())
}
