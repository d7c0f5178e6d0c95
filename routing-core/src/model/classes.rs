//! Cost and vehicle equivalence classes derived when the model is closed.

use super::{RoutingModel, RoutingSearchStatus};
use crate::models::common::{Cost, Value, ValueRange};
use crate::search::SearchParameters;
use hashbrown::HashMap;
use rosomaxa::prelude::GenericResult;
use rustc_hash::FxHasher;
use std::hash::Hasher;

/// A span cost contribution of one dimension inside a cost class.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct DimensionCost {
    /// The transit evaluator class of the dimension for this cost class.
    pub transit_evaluator_class: usize,
    /// The span cost coefficient.
    pub cost_coefficient: Cost,
    /// The dimension the cost belongs to.
    pub dimension: usize,
}

/// An equivalence class of vehicles sharing the arc cost evaluator and the
/// span cost profile. Fixed costs are deliberately not part of the class:
/// they only matter on the first arc of a route, where the vehicle is known.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CostClass {
    /// The arc cost evaluator shared by vehicles of the class.
    pub evaluator: usize,
    /// Dimensions with a nonzero span cost, sorted ascending.
    pub dimension_costs: Vec<DimensionCost>,
}

/// A strictly finer equivalence than [`CostClass`]: vehicles of one class are
/// interchangeable on any route.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct VehicleClass {
    /// The cost class of the vehicles.
    pub cost_class: usize,
    /// The fixed cost of the vehicles.
    pub fixed_cost: Cost,
    /// The physical start node.
    pub start_equivalence: usize,
    /// The physical end node.
    pub end_equivalence: usize,
    /// Per dimension cumul bounds at the start index.
    pub dimension_start_cumul_bounds: Vec<ValueRange>,
    /// Per dimension cumul bounds at the end index.
    pub dimension_end_cumul_bounds: Vec<ValueRange>,
    /// Per dimension capacities.
    pub dimension_capacities: Vec<Value>,
    /// Per dimension transit evaluator classes.
    pub dimension_evaluator_classes: Vec<usize>,
    /// A fingerprint of the visitable indices the vehicles cannot serve.
    pub unvisitable_fingerprint: u64,
}

impl RoutingModel {
    /// Closes the model with default parameters. Idempotent.
    pub fn close_model(&mut self) -> GenericResult<()> {
        self.close_model_with_parameters(&SearchParameters::default())
    }

    /// Closes the model: memoizes callbacks, derives cost and vehicle
    /// classes, compiles the cost structure and freezes the network. Any
    /// later mutation fails. Idempotent.
    pub fn close_model_with_parameters(&mut self, _parameters: &SearchParameters) -> GenericResult<()> {
        if self.closed {
            return Ok(());
        }

        if let Err(error) = self.validate_model() {
            self.set_status(RoutingSearchStatus::Invalid);
            return Err(error);
        }

        self.registry.close(self.manager.num_indices());

        // pin start cumuls where requested
        for dimension in 0..self.dimensions.len() {
            if self.dimensions[dimension].is_start_cumul_fixed_to_zero() {
                for vehicle in 0..self.manager.num_vehicles() {
                    let start = self.manager.start(vehicle);
                    self.dimensions[dimension].set_cumul_range(start, ValueRange::fixed(0));
                }
            }
        }

        self.compute_cost_classes();
        self.compute_vehicle_classes();

        self.costs_are_homogeneous = self.cost_classes.len() == 1
            && self.fixed_costs.windows(2).all(|pair| pair[0] == pair[1])
            && self.amortized_linear_factors.iter().all(|&factor| factor == 0)
            && self.amortized_quadratic_factors.iter().all(|&factor| factor == 0);

        self.closed = true;

        Ok(())
    }

    fn validate_model(&self) -> GenericResult<()> {
        for dimension in &self.dimensions {
            if let Some(base) = dimension.base_dimension() {
                if base != dimension.index() && self.dimensions[base].is_state_dependent() {
                    return Err(format!(
                        "dimension '{}' depends on '{}' which is itself dependent",
                        dimension.name(),
                        self.dimensions[base].name()
                    )
                    .into());
                }
            }
        }

        Ok(())
    }

    fn compute_cost_classes(&mut self) {
        let mut classes: Vec<CostClass> = Vec::default();
        let mut known: HashMap<CostClass, usize> = HashMap::default();

        self.vehicle_to_cost_class = (0..self.manager.num_vehicles())
            .map(|vehicle| {
                let mut dimension_costs = self
                    .dimensions
                    .iter()
                    .filter(|dimension| dimension.vehicle_span_cost_coefficient(vehicle) != 0)
                    .map(|dimension| DimensionCost {
                        transit_evaluator_class: dimension.vehicle_evaluator_class(vehicle),
                        cost_coefficient: dimension.vehicle_span_cost_coefficient(vehicle),
                        dimension: dimension.index(),
                    })
                    .collect::<Vec<_>>();
                dimension_costs.sort();

                let class = CostClass { evaluator: self.vehicle_evaluators[vehicle], dimension_costs };
                *known.entry(class.clone()).or_insert_with(|| {
                    classes.push(class);
                    classes.len() - 1
                })
            })
            .collect();

        self.cost_classes = classes;
    }

    fn compute_vehicle_classes(&mut self) {
        let mut classes: Vec<VehicleClass> = Vec::default();
        let mut known: HashMap<VehicleClass, usize> = HashMap::default();

        self.vehicle_to_vehicle_class = (0..self.manager.num_vehicles())
            .map(|vehicle| {
                let start = self.manager.start(vehicle);
                let end = self.manager.end(vehicle);

                let mut hasher = FxHasher::default();
                (0..self.size())
                    .filter(|&index| !self.is_start(index) && !self.is_vehicle_allowed_for_index(vehicle, index))
                    .for_each(|index| hasher.write_usize(index));

                let class = VehicleClass {
                    cost_class: self.vehicle_to_cost_class[vehicle],
                    fixed_cost: self.fixed_costs[vehicle],
                    start_equivalence: self.manager.index_to_node(start),
                    end_equivalence: self.manager.index_to_node(end),
                    dimension_start_cumul_bounds: self
                        .dimensions
                        .iter()
                        .map(|dimension| dimension.vehicle_cumul_window(vehicle, start))
                        .collect(),
                    dimension_end_cumul_bounds: self
                        .dimensions
                        .iter()
                        .map(|dimension| dimension.vehicle_cumul_window(vehicle, end))
                        .collect(),
                    dimension_capacities: self
                        .dimensions
                        .iter()
                        .map(|dimension| dimension.vehicle_capacity(vehicle))
                        .collect(),
                    dimension_evaluator_classes: self
                        .dimensions
                        .iter()
                        .map(|dimension| dimension.vehicle_evaluator_class(vehicle))
                        .collect(),
                    unvisitable_fingerprint: hasher.finish(),
                };

                *known.entry(class.clone()).or_insert_with(|| {
                    classes.push(class);
                    classes.len() - 1
                })
            })
            .collect();

        self.vehicle_classes = classes;
    }

    /// Returns all cost classes. Empty before the model is closed.
    pub fn cost_classes(&self) -> &[CostClass] {
        &self.cost_classes
    }

    /// Returns the cost class of a vehicle.
    pub fn cost_class_of_vehicle(&self, vehicle: usize) -> usize {
        self.vehicle_to_cost_class[vehicle]
    }

    /// Returns all vehicle classes. Empty before the model is closed.
    pub fn vehicle_classes(&self) -> &[VehicleClass] {
        &self.vehicle_classes
    }

    /// Returns the vehicle class of a vehicle.
    pub fn vehicle_class_of_vehicle(&self, vehicle: usize) -> usize {
        self.vehicle_to_vehicle_class[vehicle]
    }

    /// Returns true if every vehicle prices every arc identically, enabling
    /// the vehicle independent cost shortcut.
    pub fn costs_are_homogeneous_across_vehicles(&self) -> bool {
        self.costs_are_homogeneous
    }

    /// Returns the cost of an arc for a cost class: the raw evaluator value
    /// plus span costed dimension transits. Fixed costs are excluded.
    pub fn arc_cost_for_class(&self, from: usize, to: usize, cost_class: usize) -> Cost {
        let class = &self.cost_classes[cost_class];

        let mut cost = self.registry.transit(class.evaluator, from, to);
        for dimension_cost in &class.dimension_costs {
            let dimension = &self.dimensions[dimension_cost.dimension];
            cost += dimension_cost.cost_coefficient
                * dimension.class_transit(&self.registry, dimension_cost.transit_evaluator_class, from, to);
        }

        cost
    }

    /// Returns the cost of an arc for a vehicle, including its fixed cost on
    /// the arc leaving the vehicle start. A negative vehicle yields zero.
    pub fn arc_cost_for_vehicle(&self, from: usize, to: usize, vehicle: i64) -> Cost {
        if vehicle < 0 {
            return 0;
        }
        let vehicle = vehicle as usize;
        let cost_class = self.vehicle_to_cost_class[vehicle];

        let class_cost = {
            let mut cache = self.cost_cache.borrow_mut();
            let entry = &mut cache[from];
            if entry.to == to && entry.cost_class == cost_class {
                entry.cost
            } else {
                let cost = self.arc_cost_for_class(from, to, cost_class);
                *entry = super::CostCacheEntry { to, cost_class, cost };
                cost
            }
        };

        if from == self.manager.start(vehicle) && to != self.manager.end(vehicle) {
            class_cost + self.fixed_costs[vehicle]
        } else {
            class_cost
        }
    }

    /// Returns the arc cost used by first solution heuristics: the vehicle
    /// independent cost when costs are homogeneous, the class cost of the
    /// cheapest class otherwise.
    pub fn arc_cost_for_first_solution(&self, from: usize, to: usize) -> Cost {
        if self.costs_are_homogeneous {
            self.arc_cost_for_vehicle(from, to, 0)
        } else {
            (0..self.cost_classes.len())
                .map(|cost_class| self.arc_cost_for_class(from, to, cost_class))
                .min()
                .unwrap_or(0)
        }
    }
}
