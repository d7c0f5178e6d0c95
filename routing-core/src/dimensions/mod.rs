//! Dimensions: named integer quantities accumulated along routes, such as
//! time, distance or load.

#[cfg(test)]
#[path = "../../tests/unit/dimensions/dimension_test.rs"]
mod dimension_test;

use crate::lp::CumulCostTerm;
use crate::models::assignment::{VariableArena, VariableHandle};
use crate::models::common::{Cost, Value, ValueRange, MAX_VALUE};
use crate::models::piecewise::PiecewiseLinearFunction;
use crate::models::transit::TransitCallbackRegistry;
use std::sync::Arc;

/// An index of a dimension inside its model.
pub type DimensionIndex = usize;

/// A soft bound on a cumul variable: crossing `bound` costs `coefficient`
/// per unit.
#[derive(Clone, Copy, Debug)]
pub struct SoftBound {
    /// The bound after (or before) which the cost applies.
    pub bound: Value,
    /// The cost per unit of violation.
    pub coefficient: Cost,
}

/// A break of a vehicle: an interval of fixed duration whose start lies in
/// `[start_min, start_max]`.
#[derive(Clone, Copy, Debug)]
pub struct BreakInterval {
    /// Earliest start of the break.
    pub start_min: Value,
    /// Latest start of the break.
    pub start_max: Value,
    /// Duration of the break.
    pub duration: Value,
}

/// A per pair bound on `cumul(delivery) - cumul(pickup)` as a function of the
/// selected pickup and delivery alternatives.
pub type PickupToDeliveryLimit = Arc<dyn Fn(usize, usize) -> Value + Send + Sync>;

/// A dimension accumulates an integer quantity along every route through
/// cumul, transit and slack variables linked by
/// `next(i) = j => cumul(j) = cumul(i) + transit(i) + slack(i)`.
pub struct RoutingDimension {
    name: String,
    index: DimensionIndex,
    base_dimension: Option<DimensionIndex>,

    cumuls: Vec<VariableHandle>,
    transits: Vec<VariableHandle>,
    slacks: Vec<VariableHandle>,

    class_evaluators: Vec<usize>,
    vehicle_to_class: Vec<usize>,
    state_dependent_class_evaluators: Vec<usize>,
    state_dependent_vehicle_to_class: Vec<usize>,

    vehicle_capacities: Vec<Value>,
    slack_max: Value,
    fix_start_cumul_to_zero: bool,

    cumul_windows: Vec<ValueRange>,
    vehicle_span_upper_bounds: Vec<Value>,
    vehicle_span_cost_coefficients: Vec<Cost>,
    global_span_cost_coefficient: Cost,

    soft_upper_bounds: Vec<Option<SoftBound>>,
    soft_lower_bounds: Vec<Option<SoftBound>>,
    piecewise_costs: Vec<Option<PiecewiseLinearFunction>>,

    break_intervals: Vec<Vec<BreakInterval>>,
    vehicle_visit_transits: Vec<Vec<Value>>,
    pickup_to_delivery_limits: Vec<Option<PickupToDeliveryLimit>>,
}

impl RoutingDimension {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        index: DimensionIndex,
        base_dimension: Option<DimensionIndex>,
        vehicle_evaluators: Vec<usize>,
        state_dependent_vehicle_evaluators: Vec<usize>,
        vehicle_capacities: Vec<Value>,
        slack_max: Value,
        fix_start_cumul_to_zero: bool,
        num_indices: usize,
        size: usize,
        arena: &mut VariableArena,
    ) -> Self {
        let num_vehicles = vehicle_capacities.len();

        let (class_evaluators, vehicle_to_class) = dedupe_evaluators(&vehicle_evaluators);
        let (state_dependent_class_evaluators, state_dependent_vehicle_to_class) =
            dedupe_evaluators(&state_dependent_vehicle_evaluators);

        let cumuls = arena.allocate_many(num_indices, ValueRange::whole());
        let transits = arena.allocate_many(size, ValueRange::new(-MAX_VALUE, MAX_VALUE));
        let slacks = arena.allocate_many(size, ValueRange::new(0, slack_max));

        Self {
            name,
            index,
            base_dimension,
            cumuls,
            transits,
            slacks,
            class_evaluators,
            vehicle_to_class,
            state_dependent_class_evaluators,
            state_dependent_vehicle_to_class,
            vehicle_capacities,
            slack_max,
            fix_start_cumul_to_zero,
            cumul_windows: vec![ValueRange::whole(); num_indices],
            vehicle_span_upper_bounds: vec![MAX_VALUE; num_vehicles],
            vehicle_span_cost_coefficients: vec![0; num_vehicles],
            global_span_cost_coefficient: 0,
            soft_upper_bounds: vec![None; num_indices],
            soft_lower_bounds: vec![None; num_indices],
            piecewise_costs: vec![None; num_indices],
            break_intervals: vec![Vec::default(); num_vehicles],
            vehicle_visit_transits: vec![Vec::default(); num_vehicles],
            pickup_to_delivery_limits: Vec::default(),
        }
    }

    /// Returns the name of the dimension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the index of the dimension inside its model.
    pub fn index(&self) -> DimensionIndex {
        self.index
    }

    /// Returns the base dimension index for a dependent dimension. A self
    /// based dimension returns its own index.
    pub fn base_dimension(&self) -> Option<DimensionIndex> {
        self.base_dimension
    }

    /// Returns true if transits depend on the base dimension's cumuls.
    pub fn is_state_dependent(&self) -> bool {
        !self.state_dependent_class_evaluators.is_empty()
    }

    /// Returns the cumul variable of an index.
    pub fn cumul_var(&self, index: usize) -> VariableHandle {
        self.cumuls[index]
    }

    /// Returns the transit variable of an index.
    pub fn transit_var(&self, index: usize) -> VariableHandle {
        self.transits[index]
    }

    /// Returns the slack variable of an index.
    pub fn slack_var(&self, index: usize) -> VariableHandle {
        self.slacks[index]
    }

    /// Returns the capacity of a vehicle.
    pub fn vehicle_capacity(&self, vehicle: usize) -> Value {
        self.vehicle_capacities[vehicle]
    }

    /// Returns the slack upper bound shared by all indices.
    pub fn slack_max(&self) -> Value {
        self.slack_max
    }

    /// Returns true if start cumuls are pinned to zero.
    pub fn is_start_cumul_fixed_to_zero(&self) -> bool {
        self.fix_start_cumul_to_zero
    }

    /// Returns the transit evaluator class of a vehicle.
    pub fn vehicle_evaluator_class(&self, vehicle: usize) -> usize {
        self.vehicle_to_class[vehicle]
    }

    /// Returns the transit of an arc for an evaluator class.
    pub fn class_transit(&self, registry: &TransitCallbackRegistry, class: usize, from: usize, to: usize) -> Value {
        registry.transit(self.class_evaluators[class], from, to)
    }

    /// Returns the transit of an arc for a vehicle. For a state dependent
    /// dimension the base cumul at the source must be supplied.
    pub fn transit(
        &self,
        registry: &TransitCallbackRegistry,
        vehicle: usize,
        from: usize,
        to: usize,
        base_cumul: Value,
    ) -> Value {
        let fixed = self.class_transit(registry, self.vehicle_to_class[vehicle], from, to);
        if self.is_state_dependent() {
            let evaluator = self.state_dependent_class_evaluators[self.state_dependent_vehicle_to_class[vehicle]];
            fixed + registry.state_dependent_transit(evaluator, from, to).transit.value(base_cumul)
        } else {
            fixed
        }
    }

    /// Restricts the cumul of an index to the given range.
    pub fn set_cumul_range(&mut self, index: usize, range: ValueRange) {
        self.cumul_windows[index] = self.cumul_windows[index].intersect(&range);
    }

    /// Returns the cumul window of an index, already clipped by the weakest
    /// vehicle capacity.
    pub fn cumul_window(&self, index: usize) -> ValueRange {
        self.cumul_windows[index]
    }

    /// Returns the cumul window of an index on a specific vehicle.
    pub fn vehicle_cumul_window(&self, vehicle: usize, index: usize) -> ValueRange {
        self.cumul_windows[index].intersect(&ValueRange::new(0, self.vehicle_capacities[vehicle]))
    }

    /// Sets a hard upper bound on the span of a vehicle route.
    pub fn set_span_upper_bound_for_vehicle(&mut self, upper_bound: Value, vehicle: usize) {
        self.vehicle_span_upper_bounds[vehicle] = upper_bound;
    }

    /// Returns the span upper bound of a vehicle.
    pub fn vehicle_span_upper_bound(&self, vehicle: usize) -> Value {
        self.vehicle_span_upper_bounds[vehicle]
    }

    /// Sets the span cost coefficient of a vehicle.
    pub fn set_span_cost_coefficient_for_vehicle(&mut self, coefficient: Cost, vehicle: usize) {
        self.vehicle_span_cost_coefficients[vehicle] = coefficient;
    }

    /// Sets the span cost coefficient of all vehicles.
    pub fn set_span_cost_coefficient_for_all_vehicles(&mut self, coefficient: Cost) {
        self.vehicle_span_cost_coefficients.iter_mut().for_each(|entry| *entry = coefficient);
    }

    /// Returns the span cost coefficient of a vehicle.
    pub fn vehicle_span_cost_coefficient(&self, vehicle: usize) -> Cost {
        self.vehicle_span_cost_coefficients[vehicle]
    }

    /// Sets the cost coefficient applied to the difference between the
    /// latest route end and the earliest route start over all vehicles.
    pub fn set_global_span_cost_coefficient(&mut self, coefficient: Cost) {
        self.global_span_cost_coefficient = coefficient;
    }

    /// Returns the global span cost coefficient.
    pub fn global_span_cost_coefficient(&self) -> Cost {
        self.global_span_cost_coefficient
    }

    /// Sets a soft upper bound on the cumul of an index.
    pub fn set_cumul_soft_upper_bound(&mut self, index: usize, bound: Value, coefficient: Cost) {
        self.soft_upper_bounds[index] = Some(SoftBound { bound, coefficient });
    }

    /// Returns the soft upper bound of an index, if any.
    pub fn cumul_soft_upper_bound(&self, index: usize) -> Option<SoftBound> {
        self.soft_upper_bounds[index]
    }

    /// Sets a soft lower bound on the cumul of an index.
    pub fn set_cumul_soft_lower_bound(&mut self, index: usize, bound: Value, coefficient: Cost) {
        self.soft_lower_bounds[index] = Some(SoftBound { bound, coefficient });
    }

    /// Returns the soft lower bound of an index, if any.
    pub fn cumul_soft_lower_bound(&self, index: usize) -> Option<SoftBound> {
        self.soft_lower_bounds[index]
    }

    /// Attaches a piecewise linear cost to the cumul of an index.
    pub fn set_cumul_piecewise_linear_cost(&mut self, index: usize, cost: PiecewiseLinearFunction) {
        self.piecewise_costs[index] = Some(cost);
    }

    /// Returns the piecewise linear cumul cost of an index, if any.
    pub fn cumul_piecewise_linear_cost(&self, index: usize) -> Option<&PiecewiseLinearFunction> {
        self.piecewise_costs[index].as_ref()
    }

    /// Sets breaks of a vehicle together with the visit transit of every
    /// index: the time the vehicle is busy at the index and cannot take a
    /// break.
    pub fn set_break_intervals_of_vehicle(
        &mut self,
        breaks: Vec<BreakInterval>,
        vehicle: usize,
        visit_transits: Vec<Value>,
    ) {
        self.break_intervals[vehicle] = breaks;
        self.vehicle_visit_transits[vehicle] = visit_transits;
    }

    /// Returns breaks of a vehicle.
    pub fn vehicle_break_intervals(&self, vehicle: usize) -> &[BreakInterval] {
        &self.break_intervals[vehicle]
    }

    /// Returns the visit transit of an index on a vehicle.
    pub fn vehicle_visit_transit(&self, vehicle: usize, index: usize) -> Value {
        self.vehicle_visit_transits[vehicle].get(index).copied().unwrap_or(0)
    }

    /// Returns true if any vehicle has breaks.
    pub fn has_break_constraints(&self) -> bool {
        self.break_intervals.iter().any(|breaks| !breaks.is_empty())
    }

    /// Sets the limit on `cumul(delivery) - cumul(pickup)` for a pair.
    pub fn set_pickup_to_delivery_limit(&mut self, pair: usize, limit: PickupToDeliveryLimit) {
        if self.pickup_to_delivery_limits.len() <= pair {
            self.pickup_to_delivery_limits.resize_with(pair + 1, || None);
        }
        self.pickup_to_delivery_limits[pair] = Some(limit);
    }

    /// Returns the pickup to delivery limit of a pair, if any.
    pub fn pickup_to_delivery_limit(&self, pair: usize, pickup_alternative: usize, delivery_alternative: usize) -> Option<Value> {
        self.pickup_to_delivery_limits
            .get(pair)
            .and_then(|limit| limit.as_ref())
            .map(|limit| limit(pickup_alternative, delivery_alternative))
    }

    /// Returns true if the dimension carries any cumul dependent cost.
    pub fn has_cumul_costs(&self) -> bool {
        self.global_span_cost_coefficient != 0
            || self.vehicle_span_cost_coefficients.iter().any(|&coefficient| coefficient != 0)
            || self.soft_upper_bounds.iter().any(Option::is_some)
            || self.soft_lower_bounds.iter().any(Option::is_some)
            || self.piecewise_costs.iter().any(Option::is_some)
    }

    /// Returns all cost terms attached to the cumul of an index.
    pub fn cumul_cost_terms(&self, index: usize) -> Vec<CumulCostTerm> {
        let mut terms = Vec::default();

        if let Some(SoftBound { bound, coefficient }) = self.soft_upper_bounds[index] {
            terms.push(CumulCostTerm::SoftUpperBound { bound, coefficient });
        }
        if let Some(SoftBound { bound, coefficient }) = self.soft_lower_bounds[index] {
            terms.push(CumulCostTerm::SoftLowerBound { bound, coefficient });
        }
        if let Some(cost) = &self.piecewise_costs[index] {
            terms.push(CumulCostTerm::Piecewise(cost.clone()));
        }

        terms
    }
}

fn dedupe_evaluators(vehicle_evaluators: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let mut classes = Vec::default();
    let vehicle_to_class = vehicle_evaluators
        .iter()
        .map(|&evaluator| match classes.iter().position(|&known| known == evaluator) {
            Some(class) => class,
            None => {
                classes.push(evaluator);
                classes.len() - 1
            }
        })
        .collect();

    (classes, vehicle_to_class)
}
