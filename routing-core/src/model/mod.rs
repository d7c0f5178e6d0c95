//! The routing model: variables, disjunctions, pickup and delivery coupling,
//! dimensions and the compiled cost expression.

#[cfg(test)]
#[path = "../../tests/unit/model/model_test.rs"]
mod model_test;

mod classes;
mod evaluation;
mod propagation;
mod routes;

pub use self::classes::{CostClass, DimensionCost, VehicleClass};
pub(crate) use self::evaluation::{
    check_breaks_prefix, check_dimension_prefix, check_visit_types, evaluate_plan, PlanAppraisal,
};
pub use self::propagation::validate_assignment;

use crate::dimensions::{DimensionIndex, RoutingDimension};
use crate::models::assignment::{Assignment, VariableArena, VariableHandle};
use crate::models::common::{Cost, Value, ValueRange, MAX_VALUE};
use crate::models::index::RoutingIndexManager;
use crate::models::transit::{
    StateDependentCallback2, TransitCallback1, TransitCallback2, TransitCallbackRegistry,
};
use crate::search::SearchParameters;
use hashbrown::{HashMap, HashSet};
use rosomaxa::prelude::{GenericError, GenericResult};
use rosomaxa::utils::Environment;
use std::cell::RefCell;
use std::sync::Arc;

/// A penalty value expressing a hard constraint on a disjunction.
pub const NO_PENALTY: Cost = -1;

/// A comparator deciding which of two successor candidates of an index the
/// cheapest addition heuristic should prefer.
pub type SuccessorComparator = Arc<dyn Fn(usize, usize, usize) -> std::cmp::Ordering + Send + Sync>;

/// An index of a disjunction inside its model.
pub type DisjunctionIndex = usize;

/// Status of the search attached to a routing model.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RoutingSearchStatus {
    /// The model was not solved yet.
    NotSolved,
    /// A solution was found.
    Success,
    /// No solution exists under the constraints.
    Fail,
    /// A limit was reached before any solution was found.
    FailTimeout,
    /// The model or its parameters are invalid.
    Invalid,
}

/// Specifies the precedence policy applied to pickup and delivery pairs of
/// one vehicle.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PickupAndDeliveryPolicy {
    /// Any precedence respecting order is accepted.
    #[default]
    Any,
    /// Deliveries are performed in reverse order of their pickups.
    Lifo,
    /// Deliveries are performed in the same order as their pickups.
    Fifo,
}

/// A set of indices of which at most `max_cardinality` can be active, the
/// others each adding `penalty` to the cost. A negative penalty makes the
/// cardinality hard.
#[derive(Clone, Debug)]
pub struct Disjunction {
    /// Indices forming the disjunction.
    pub indices: Vec<usize>,
    /// The maximal amount of active indices.
    pub max_cardinality: usize,
    /// A cost per unperformed index, or [`NO_PENALTY`].
    pub penalty: Cost,
}

/// A pickup and delivery coupling between two alternative sets: one pickup
/// and one delivery alternative are served by the same vehicle, pickup first.
#[derive(Clone, Debug)]
pub struct PickupDeliveryPair {
    /// Pickup alternatives.
    pub pickups: Vec<usize>,
    /// Delivery alternatives.
    pub deliveries: Vec<usize>,
}

/// A group of indices which should share one vehicle: every extra vehicle
/// serving active members of the group adds `cost` to the objective.
#[derive(Clone, Debug)]
pub struct SoftSameVehicleConstraint {
    /// Indices preferring to share a vehicle.
    pub indices: Vec<usize>,
    /// A cost per additional vehicle serving the group.
    pub cost: Cost,
}

#[derive(Clone, Copy, Debug)]
struct CostCacheEntry {
    to: usize,
    cost_class: usize,
    cost: Cost,
}

impl Default for CostCacheEntry {
    fn default() -> Self {
        Self { to: usize::MAX, cost_class: usize::MAX, cost: 0 }
    }
}

/// A vehicle routing model: owns the variable arena, vehicles, dimensions,
/// disjunctions and the cost structure, and drives the search.
pub struct RoutingModel {
    manager: RoutingIndexManager,
    environment: Arc<Environment>,

    arena: VariableArena,
    registry: TransitCallbackRegistry,
    nexts: Vec<VariableHandle>,
    vehicle_vars: Vec<VariableHandle>,
    actives: Vec<VariableHandle>,
    cost_var: VariableHandle,

    dimensions: Vec<RoutingDimension>,
    dimension_indices: HashMap<String, DimensionIndex>,

    disjunctions: Vec<Disjunction>,
    index_to_disjunctions: Vec<Vec<DisjunctionIndex>>,

    pickup_delivery_pairs: Vec<PickupDeliveryPair>,
    pickup_positions: Vec<Vec<(usize, usize)>>,
    delivery_positions: Vec<Vec<(usize, usize)>>,
    vehicle_pickup_delivery_policies: Vec<PickupAndDeliveryPolicy>,
    soft_same_vehicle_constraints: Vec<SoftSameVehicleConstraint>,

    visit_types: Vec<i32>,
    type_incompatibilities: HashMap<i32, HashSet<i32>>,

    fixed_costs: Vec<Cost>,
    amortized_linear_factors: Vec<Cost>,
    amortized_quadratic_factors: Vec<Cost>,
    vehicle_evaluators: Vec<usize>,
    allowed_vehicles: Vec<Option<HashSet<i64>>>,

    locked_chains: Vec<Vec<usize>>,

    cost_classes: Vec<CostClass>,
    vehicle_to_cost_class: Vec<usize>,
    vehicle_classes: Vec<VehicleClass>,
    vehicle_to_vehicle_class: Vec<usize>,
    costs_are_homogeneous: bool,
    cost_cache: RefCell<Vec<CostCacheEntry>>,

    first_solution_evaluator: Option<TransitCallback2>,
    first_solution_comparator: Option<SuccessorComparator>,

    finalizer_minimized: Vec<VariableHandle>,
    finalizer_maximized: Vec<VariableHandle>,

    closed: bool,
    status: RoutingSearchStatus,
    best: Option<Assignment>,
}

impl RoutingModel {
    /// Creates a model from an index manager with a default environment.
    pub fn new(manager: RoutingIndexManager) -> Self {
        Self::new_with_environment(manager, Arc::new(Environment::default()))
    }

    /// Creates a model from an index manager and an environment providing
    /// randomness, logging and an optional execution quota.
    pub fn new_with_environment(manager: RoutingIndexManager, environment: Arc<Environment>) -> Self {
        let num_indices = manager.num_indices();
        let size = manager.size();
        let num_vehicles = manager.num_vehicles();

        let mut arena = VariableArena::default();
        let nexts = arena.allocate_many(size, ValueRange::new(0, num_indices as Value - 1));
        let vehicle_vars = arena.allocate_many(num_indices, ValueRange::new(-1, num_vehicles as Value - 1));
        let actives = arena.allocate_many(size, ValueRange::new(0, 1));
        let cost_var = arena.allocate(ValueRange::new(0, MAX_VALUE));

        let mut registry = TransitCallbackRegistry::default();
        // id 0 is the zero transit used by vehicles without an explicit
        // arc cost evaluator
        registry.register_transit_callback(Arc::new(|_, _| 0));

        Self {
            manager,
            environment,
            arena,
            registry,
            nexts,
            vehicle_vars,
            actives,
            cost_var,
            dimensions: Vec::default(),
            dimension_indices: HashMap::default(),
            disjunctions: Vec::default(),
            index_to_disjunctions: vec![Vec::default(); num_indices],
            pickup_delivery_pairs: Vec::default(),
            pickup_positions: vec![Vec::default(); num_indices],
            delivery_positions: vec![Vec::default(); num_indices],
            vehicle_pickup_delivery_policies: vec![PickupAndDeliveryPolicy::default(); num_vehicles],
            soft_same_vehicle_constraints: Vec::default(),
            visit_types: vec![-1; num_indices],
            type_incompatibilities: HashMap::default(),
            fixed_costs: vec![0; num_vehicles],
            amortized_linear_factors: vec![0; num_vehicles],
            amortized_quadratic_factors: vec![0; num_vehicles],
            vehicle_evaluators: vec![0; num_vehicles],
            allowed_vehicles: vec![None; num_indices],
            locked_chains: vec![Vec::default(); num_vehicles],
            first_solution_evaluator: None,
            first_solution_comparator: None,
            cost_classes: Vec::default(),
            vehicle_to_cost_class: Vec::default(),
            vehicle_classes: Vec::default(),
            vehicle_to_vehicle_class: Vec::default(),
            costs_are_homogeneous: false,
            cost_cache: RefCell::new(vec![CostCacheEntry::default(); num_indices]),
            finalizer_minimized: Vec::default(),
            finalizer_maximized: Vec::default(),
            closed: false,
            status: RoutingSearchStatus::NotSolved,
            best: None,
        }
    }

    // Callback registration

    /// Registers an arc transit callback and returns its id.
    pub fn register_transit_callback(&mut self, callback: TransitCallback2) -> usize {
        self.registry.register_transit_callback(callback)
    }

    /// Registers a transit callback depending on the source index only.
    pub fn register_unary_transit_callback(&mut self, callback: TransitCallback1) -> usize {
        self.registry.register_unary_transit_callback(callback)
    }

    /// Registers a state dependent transit callback and returns its id.
    pub fn register_state_dependent_transit_callback(&mut self, callback: StateDependentCallback2) -> usize {
        self.registry.register_state_dependent_transit_callback(callback)
    }

    // Dimensions

    /// Adds a dimension with a shared transit evaluator and capacity.
    pub fn add_dimension(
        &mut self,
        evaluator: usize,
        slack_max: Value,
        capacity: Value,
        fix_start_cumul_to_zero: bool,
        name: &str,
    ) -> GenericResult<DimensionIndex> {
        let num_vehicles = self.manager.num_vehicles();
        self.add_dimension_with_vehicle_transit_and_capacity(
            vec![evaluator; num_vehicles],
            slack_max,
            vec![capacity; num_vehicles],
            fix_start_cumul_to_zero,
            name,
        )
    }

    /// Adds a dimension with per vehicle transit evaluators.
    pub fn add_dimension_with_vehicle_transits(
        &mut self,
        evaluators: Vec<usize>,
        slack_max: Value,
        capacity: Value,
        fix_start_cumul_to_zero: bool,
        name: &str,
    ) -> GenericResult<DimensionIndex> {
        let num_vehicles = self.manager.num_vehicles();
        self.add_dimension_with_vehicle_transit_and_capacity(
            evaluators,
            slack_max,
            vec![capacity; num_vehicles],
            fix_start_cumul_to_zero,
            name,
        )
    }

    /// Adds a dimension with per vehicle capacities.
    pub fn add_dimension_with_vehicle_capacity(
        &mut self,
        evaluator: usize,
        slack_max: Value,
        vehicle_capacities: Vec<Value>,
        fix_start_cumul_to_zero: bool,
        name: &str,
    ) -> GenericResult<DimensionIndex> {
        let num_vehicles = self.manager.num_vehicles();
        self.add_dimension_with_vehicle_transit_and_capacity(
            vec![evaluator; num_vehicles],
            slack_max,
            vehicle_capacities,
            fix_start_cumul_to_zero,
            name,
        )
    }

    /// Adds a dimension with per vehicle transit evaluators and capacities.
    pub fn add_dimension_with_vehicle_transit_and_capacity(
        &mut self,
        evaluators: Vec<usize>,
        slack_max: Value,
        vehicle_capacities: Vec<Value>,
        fix_start_cumul_to_zero: bool,
        name: &str,
    ) -> GenericResult<DimensionIndex> {
        self.add_dimension_internal(evaluators, Vec::default(), None, slack_max, vehicle_capacities, fix_start_cumul_to_zero, name)
    }

    /// Adds a dimension whose transits are constrained to a constant value.
    pub fn add_constant_dimension(
        &mut self,
        value: Value,
        capacity: Value,
        fix_start_cumul_to_zero: bool,
        name: &str,
    ) -> GenericResult<DimensionIndex> {
        let evaluator = self.register_unary_transit_callback(Arc::new(move |_| value));
        self.add_dimension(evaluator, 0, capacity, fix_start_cumul_to_zero, name)
    }

    /// Adds a dimension reading transits of an index from a vector.
    pub fn add_vector_dimension(
        &mut self,
        values: Vec<Value>,
        capacity: Value,
        fix_start_cumul_to_zero: bool,
        name: &str,
    ) -> GenericResult<DimensionIndex> {
        let evaluator = self.register_unary_transit_callback(Arc::new(move |from| values[from]));
        self.add_dimension(evaluator, 0, capacity, fix_start_cumul_to_zero, name)
    }

    /// Adds a dimension reading transits of an arc from a matrix.
    pub fn add_matrix_dimension(
        &mut self,
        values: Vec<Vec<Value>>,
        capacity: Value,
        fix_start_cumul_to_zero: bool,
        name: &str,
    ) -> GenericResult<DimensionIndex> {
        let evaluator = self.register_transit_callback(Arc::new(move |from, to| values[from][to]));
        self.add_dimension(evaluator, 0, capacity, fix_start_cumul_to_zero, name)
    }

    /// Adds a dimension whose transits depend on the cumuls of a base
    /// dimension. Passing the dimension's own name as base creates a self
    /// based dimension; any other cycle is impossible since the base must
    /// already exist.
    pub fn add_dimension_dependent_dimension_with_vehicle_capacity(
        &mut self,
        pure_evaluator: usize,
        dependent_evaluator: usize,
        base_name: &str,
        slack_max: Value,
        vehicle_capacities: Vec<Value>,
        fix_start_cumul_to_zero: bool,
        name: &str,
    ) -> GenericResult<DimensionIndex> {
        let num_vehicles = self.manager.num_vehicles();
        let base = if base_name == name {
            None // resolved to the new dimension itself below
        } else {
            Some(
                self.dimension_index(base_name)
                    .ok_or_else(|| GenericError::from(format!("unknown base dimension: '{base_name}'")))?,
            )
        };

        let index = self.add_dimension_internal(
            vec![pure_evaluator; num_vehicles],
            vec![dependent_evaluator; num_vehicles],
            base,
            slack_max,
            vehicle_capacities,
            fix_start_cumul_to_zero,
            name,
        )?;

        Ok(index)
    }

    #[allow(clippy::too_many_arguments)]
    fn add_dimension_internal(
        &mut self,
        evaluators: Vec<usize>,
        state_dependent_evaluators: Vec<usize>,
        base: Option<DimensionIndex>,
        slack_max: Value,
        vehicle_capacities: Vec<Value>,
        fix_start_cumul_to_zero: bool,
        name: &str,
    ) -> GenericResult<DimensionIndex> {
        self.ensure_open()?;

        if self.dimension_indices.contains_key(name) {
            return Err(format!("dimension '{name}' already exists").into());
        }
        if evaluators.len() != self.manager.num_vehicles() || vehicle_capacities.len() != self.manager.num_vehicles() {
            return Err("one transit evaluator and capacity per vehicle is required".into());
        }
        if let Some(&capacity) = vehicle_capacities.iter().find(|&&capacity| capacity < 0) {
            return Err(format!("dimension '{name}' has a negative capacity: {capacity}").into());
        }
        if slack_max < 0 {
            return Err(format!("dimension '{name}' has a negative slack upper bound: {slack_max}").into());
        }
        if let Some(&evaluator) = evaluators.iter().find(|&&evaluator| evaluator >= self.registry.num_transit_callbacks()) {
            return Err(format!("unknown transit callback: {evaluator}").into());
        }

        let index = self.dimensions.len();
        let base = match base {
            Some(base) => Some(base),
            None if !state_dependent_evaluators.is_empty() => Some(index),
            None => None,
        };

        let dimension = RoutingDimension::new(
            name.to_string(),
            index,
            base,
            evaluators,
            state_dependent_evaluators,
            vehicle_capacities,
            slack_max,
            fix_start_cumul_to_zero,
            self.manager.num_indices(),
            self.manager.size(),
            &mut self.arena,
        );

        self.dimensions.push(dimension);
        self.dimension_indices.insert(name.to_string(), index);

        Ok(index)
    }

    /// Returns the index of a named dimension, if it exists.
    pub fn dimension_index(&self, name: &str) -> Option<DimensionIndex> {
        self.dimension_indices.get(name).copied()
    }

    /// Returns true if a dimension with the given name exists.
    pub fn has_dimension(&self, name: &str) -> bool {
        self.dimension_indices.contains_key(name)
    }

    /// Returns a named dimension.
    pub fn dimension(&self, name: &str) -> GenericResult<&RoutingDimension> {
        self.dimension_index(name)
            .map(|index| &self.dimensions[index])
            .ok_or_else(|| format!("unknown dimension: '{name}'").into())
    }

    /// Returns a named dimension for mutation. Fails once the model is closed.
    pub fn dimension_mut(&mut self, name: &str) -> GenericResult<&mut RoutingDimension> {
        self.ensure_open()?;
        match self.dimension_indices.get(name).copied() {
            Some(index) => Ok(&mut self.dimensions[index]),
            None => Err(format!("unknown dimension: '{name}'").into()),
        }
    }

    /// Returns all dimensions of the model.
    pub fn dimensions(&self) -> &[RoutingDimension] {
        &self.dimensions
    }

    /// Returns names of all dimensions, sorted.
    pub fn all_dimension_names(&self) -> Vec<String> {
        let mut names = self.dimension_indices.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    // Disjunctions

    /// Adds a disjunction over the given indices: at most `max_cardinality`
    /// of them become active, each unperformed one adding `penalty` to the
    /// cost. A negative penalty forces exactly `max_cardinality` active
    /// indices.
    pub fn add_disjunction(
        &mut self,
        indices: Vec<usize>,
        penalty: Cost,
        max_cardinality: usize,
    ) -> GenericResult<DisjunctionIndex> {
        self.ensure_open()?;

        if max_cardinality == 0 || max_cardinality > indices.len() {
            return Err(format!(
                "disjunction cardinality {} is outside [1, {}]",
                max_cardinality,
                indices.len()
            )
            .into());
        }
        if let Some(&index) = indices.iter().find(|&&index| index >= self.size() || self.is_start(index)) {
            return Err(format!("index {index} cannot be part of a disjunction").into());
        }

        let disjunction = self.disjunctions.len();
        indices.iter().for_each(|&index| self.index_to_disjunctions[index].push(disjunction));
        self.disjunctions.push(Disjunction { indices, max_cardinality, penalty });

        Ok(disjunction)
    }

    /// Returns all disjunctions an index belongs to.
    pub fn disjunctions_of_index(&self, index: usize) -> &[DisjunctionIndex] {
        &self.index_to_disjunctions[index]
    }

    /// Returns a registered disjunction.
    pub fn disjunction(&self, disjunction: DisjunctionIndex) -> &Disjunction {
        &self.disjunctions[disjunction]
    }

    /// Returns all registered disjunctions.
    pub fn disjunctions(&self) -> &[Disjunction] {
        &self.disjunctions
    }

    /// Returns the penalty paid when the index is left unperformed, or `None`
    /// when dropping it is not allowed.
    pub fn unperformed_penalty(&self, index: usize) -> Option<Cost> {
        let disjunctions = &self.index_to_disjunctions[index];
        if disjunctions.is_empty() {
            return None;
        }

        disjunctions.iter().try_fold(0, |penalty, &disjunction| {
            let disjunction = &self.disjunctions[disjunction];
            if disjunction.penalty < 0 && disjunction.indices.len() <= disjunction.max_cardinality {
                None
            } else if disjunction.indices.len() > disjunction.max_cardinality {
                // Another alternative can fill the cardinality for free.
                Some(penalty)
            } else {
                Some(penalty + disjunction.penalty)
            }
        })
    }

    // Pickups and deliveries

    /// Couples a pickup index with a delivery index: both are served by the
    /// same vehicle, pickup first.
    pub fn add_pickup_and_delivery(&mut self, pickup: usize, delivery: usize) -> GenericResult<usize> {
        self.add_pickup_and_delivery_sets(vec![pickup], vec![delivery])
    }

    /// Couples pickup alternatives with delivery alternatives, typically two
    /// disjunctions: one selected pickup precedes one selected delivery on a
    /// shared vehicle.
    pub fn add_pickup_and_delivery_sets(
        &mut self,
        pickups: Vec<usize>,
        deliveries: Vec<usize>,
    ) -> GenericResult<usize> {
        self.ensure_open()?;

        if pickups.is_empty() || deliveries.is_empty() {
            return Err("a pickup and delivery pair requires non-empty alternative sets".into());
        }
        if let Some(&index) =
            pickups.iter().chain(deliveries.iter()).find(|&&index| index >= self.size() || self.is_start(index))
        {
            return Err(format!("index {index} cannot be part of a pickup and delivery pair").into());
        }

        let pair = self.pickup_delivery_pairs.len();
        pickups.iter().enumerate().for_each(|(alternative, &index)| {
            self.pickup_positions[index].push((pair, alternative));
        });
        deliveries.iter().enumerate().for_each(|(alternative, &index)| {
            self.delivery_positions[index].push((pair, alternative));
        });
        self.pickup_delivery_pairs.push(PickupDeliveryPair { pickups, deliveries });

        Ok(pair)
    }

    /// Returns `(pair, alternative)` positions of an index used as a pickup.
    pub fn pickup_positions(&self, index: usize) -> &[(usize, usize)] {
        &self.pickup_positions[index]
    }

    /// Returns `(pair, alternative)` positions of an index used as a delivery.
    pub fn delivery_positions(&self, index: usize) -> &[(usize, usize)] {
        &self.delivery_positions[index]
    }

    /// Returns all pickup and delivery pairs.
    pub fn pickup_delivery_pairs(&self) -> &[PickupDeliveryPair] {
        &self.pickup_delivery_pairs
    }

    /// Sets the pickup and delivery precedence policy of a vehicle.
    pub fn set_pickup_and_delivery_policy_of_vehicle(
        &mut self,
        policy: PickupAndDeliveryPolicy,
        vehicle: usize,
    ) -> GenericResult<()> {
        self.ensure_open()?;
        self.vehicle_pickup_delivery_policies[vehicle] = policy;
        Ok(())
    }

    /// Sets the pickup and delivery precedence policy of all vehicles.
    pub fn set_pickup_and_delivery_policy_of_all_vehicles(
        &mut self,
        policy: PickupAndDeliveryPolicy,
    ) -> GenericResult<()> {
        self.ensure_open()?;
        self.vehicle_pickup_delivery_policies.iter_mut().for_each(|entry| *entry = policy);
        Ok(())
    }

    /// Returns the pickup and delivery policy of a vehicle.
    pub fn pickup_and_delivery_policy_of_vehicle(&self, vehicle: usize) -> PickupAndDeliveryPolicy {
        self.vehicle_pickup_delivery_policies[vehicle]
    }

    /// Adds a soft constraint keeping the given indices on one vehicle:
    /// every additional vehicle serving active members of the group adds
    /// `cost` to the objective.
    pub fn add_soft_same_vehicle_constraint(&mut self, indices: Vec<usize>, cost: Cost) -> GenericResult<()> {
        self.ensure_open()?;
        if cost < 0 {
            return Err(format!("same vehicle cost must be nonnegative, got {cost}").into());
        }
        if let Some(&index) = indices.iter().find(|&&index| index >= self.size() || self.is_start(index)) {
            return Err(format!("index {index} cannot be part of a same vehicle group").into());
        }

        self.soft_same_vehicle_constraints.push(SoftSameVehicleConstraint { indices, cost });
        Ok(())
    }

    /// Returns all soft same vehicle groups.
    pub fn soft_same_vehicle_constraints(&self) -> &[SoftSameVehicleConstraint] {
        &self.soft_same_vehicle_constraints
    }

    // Visit types

    /// Assigns a nonnegative visit type to an index.
    pub fn set_visit_type(&mut self, index: usize, visit_type: i32) -> GenericResult<()> {
        self.ensure_open()?;
        if visit_type < 0 {
            return Err(format!("visit type must be nonnegative, got {visit_type}").into());
        }
        self.visit_types[index] = visit_type;
        Ok(())
    }

    /// Returns the visit type of an index, `-1` when untyped.
    pub fn visit_type(&self, index: usize) -> i32 {
        self.visit_types[index]
    }

    /// Declares two visit types incompatible: indices of both types cannot
    /// share a vehicle.
    pub fn add_type_incompatibility(&mut self, first: i32, second: i32) -> GenericResult<()> {
        self.ensure_open()?;
        self.type_incompatibilities.entry(first).or_default().insert(second);
        self.type_incompatibilities.entry(second).or_default().insert(first);
        Ok(())
    }

    /// Returns types incompatible with the given type.
    pub fn type_incompatibilities(&self, visit_type: i32) -> Option<&HashSet<i32>> {
        self.type_incompatibilities.get(&visit_type)
    }

    /// Returns true if two types cannot share a vehicle.
    pub fn are_types_incompatible(&self, first: i32, second: i32) -> bool {
        self.type_incompatibilities.get(&first).is_some_and(|types| types.contains(&second))
    }

    // Vehicle costs

    /// Sets the arc cost evaluator of all vehicles.
    pub fn set_arc_cost_evaluator_of_all_vehicles(&mut self, evaluator: usize) -> GenericResult<()> {
        self.ensure_open()?;
        self.vehicle_evaluators.iter_mut().for_each(|entry| *entry = evaluator);
        Ok(())
    }

    /// Sets the arc cost evaluator of one vehicle.
    pub fn set_arc_cost_evaluator_of_vehicle(&mut self, evaluator: usize, vehicle: usize) -> GenericResult<()> {
        self.ensure_open()?;
        self.vehicle_evaluators[vehicle] = evaluator;
        Ok(())
    }

    /// Sets the fixed cost of all vehicles.
    pub fn set_fixed_cost_of_all_vehicles(&mut self, cost: Cost) -> GenericResult<()> {
        self.ensure_open()?;
        self.fixed_costs.iter_mut().for_each(|entry| *entry = cost);
        Ok(())
    }

    /// Sets the fixed cost of one vehicle, paid once the vehicle is used.
    pub fn set_fixed_cost_of_vehicle(&mut self, cost: Cost, vehicle: usize) -> GenericResult<()> {
        self.ensure_open()?;
        self.fixed_costs[vehicle] = cost;
        Ok(())
    }

    /// Returns the fixed cost of a vehicle.
    pub fn fixed_cost_of_vehicle(&self, vehicle: usize) -> Cost {
        self.fixed_costs[vehicle]
    }

    /// Sets amortized cost factors of all vehicles: a used vehicle costs
    /// `linear - quadratic * route_length^2` on top of its other costs.
    pub fn set_amortized_cost_factors_of_all_vehicles(
        &mut self,
        linear_factor: Cost,
        quadratic_factor: Cost,
    ) -> GenericResult<()> {
        self.ensure_open()?;
        self.amortized_linear_factors.iter_mut().for_each(|entry| *entry = linear_factor);
        self.amortized_quadratic_factors.iter_mut().for_each(|entry| *entry = quadratic_factor);
        Ok(())
    }

    /// Sets amortized cost factors of one vehicle.
    pub fn set_amortized_cost_factors_of_vehicle(
        &mut self,
        linear_factor: Cost,
        quadratic_factor: Cost,
        vehicle: usize,
    ) -> GenericResult<()> {
        self.ensure_open()?;
        self.amortized_linear_factors[vehicle] = linear_factor;
        self.amortized_quadratic_factors[vehicle] = quadratic_factor;
        Ok(())
    }

    /// Returns amortized linear cost factors of all vehicles.
    pub fn amortized_linear_cost_factors(&self) -> &[Cost] {
        &self.amortized_linear_factors
    }

    /// Returns amortized quadratic cost factors of all vehicles.
    pub fn amortized_quadratic_cost_factors(&self) -> &[Cost] {
        &self.amortized_quadratic_factors
    }

    /// Returns true if any vehicle carries amortized cost factors.
    pub fn has_amortized_costs(&self) -> bool {
        self.amortized_linear_factors.iter().any(|&factor| factor != 0)
            || self.amortized_quadratic_factors.iter().any(|&factor| factor != 0)
    }

    /// Restricts the vehicles allowed to serve an index.
    pub fn set_allowed_vehicles_for_index(&mut self, vehicles: Vec<usize>, index: usize) -> GenericResult<()> {
        self.ensure_open()?;
        self.allowed_vehicles[index] = Some(vehicles.into_iter().map(|vehicle| vehicle as i64).collect());
        Ok(())
    }

    /// Returns true if the vehicle may serve the index.
    pub fn is_vehicle_allowed_for_index(&self, vehicle: usize, index: usize) -> bool {
        self.allowed_vehicles[index].as_ref().map_or(true, |vehicles| vehicles.contains(&(vehicle as i64)))
    }

    /// Locks the beginning of a vehicle route to the given chain of visits;
    /// first solution builders keep it in place.
    pub fn apply_lock_to_vehicle(&mut self, chain: Vec<usize>, vehicle: usize) -> GenericResult<()> {
        self.ensure_open()?;
        if let Some(&index) = chain.iter().find(|&&index| index >= self.size() || self.is_start(index)) {
            return Err(format!("index {index} cannot be locked on a route").into());
        }
        self.locked_chains[vehicle] = chain;
        Ok(())
    }

    /// Returns the locked chain of a vehicle.
    pub fn locked_chain_of_vehicle(&self, vehicle: usize) -> &[usize] {
        &self.locked_chains[vehicle]
    }

    /// Overrides the arc evaluator used by the cheapest addition heuristic.
    pub fn set_first_solution_evaluator(&mut self, evaluator: TransitCallback2) {
        self.first_solution_evaluator = Some(evaluator);
    }

    /// Returns the first solution evaluator override, if any.
    pub fn first_solution_evaluator(&self) -> Option<&TransitCallback2> {
        self.first_solution_evaluator.as_ref()
    }

    /// Makes the cheapest addition heuristic order successor candidates with
    /// the given comparator instead of an evaluator.
    pub fn set_first_solution_comparator(&mut self, comparator: SuccessorComparator) {
        self.first_solution_comparator = Some(comparator);
    }

    /// Returns the first solution comparator, if any.
    pub fn first_solution_comparator(&self) -> Option<&SuccessorComparator> {
        self.first_solution_comparator.as_ref()
    }

    /// Creates an empty assignment sized for all model variables.
    pub fn new_assignment(&self) -> Assignment {
        Assignment::new(self.arena.len())
    }

    /// Returns the domain of any model variable.
    pub fn variable_domain(&self, variable: VariableHandle) -> ValueRange {
        self.arena.domain(variable)
    }

    // Finalizer variables

    /// Requests the finalizer to minimize the variable after each improving
    /// solution.
    pub fn add_variable_minimized_by_finalizer(&mut self, variable: VariableHandle) {
        self.finalizer_minimized.push(variable);
    }

    /// Requests the finalizer to maximize the variable after each improving
    /// solution.
    pub fn add_variable_maximized_by_finalizer(&mut self, variable: VariableHandle) {
        self.finalizer_maximized.push(variable);
    }

    pub(crate) fn finalizer_minimized_variables(&self) -> &[VariableHandle] {
        &self.finalizer_minimized
    }

    pub(crate) fn finalizer_maximized_variables(&self) -> &[VariableHandle] {
        &self.finalizer_maximized
    }

    // Inspection

    /// Returns the index manager of the model.
    pub fn manager(&self) -> &RoutingIndexManager {
        &self.manager
    }

    /// Returns the environment of the model.
    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    /// Returns the callback registry of the model.
    pub fn registry(&self) -> &TransitCallbackRegistry {
        &self.registry
    }

    /// Returns the amount of indices owning a successor variable.
    pub fn size(&self) -> usize {
        self.manager.size()
    }

    /// Returns the total amount of variable indices.
    pub fn num_indices(&self) -> usize {
        self.manager.num_indices()
    }

    /// Returns the amount of vehicles.
    pub fn num_vehicles(&self) -> usize {
        self.manager.num_vehicles()
    }

    /// Returns the start index of a vehicle.
    pub fn start(&self, vehicle: usize) -> usize {
        self.manager.start(vehicle)
    }

    /// Returns the end index of a vehicle.
    pub fn end(&self, vehicle: usize) -> usize {
        self.manager.end(vehicle)
    }

    /// Returns true if the index is a vehicle start.
    pub fn is_start(&self, index: usize) -> bool {
        self.manager.is_start(index)
    }

    /// Returns true if the index is a vehicle end.
    pub fn is_end(&self, index: usize) -> bool {
        self.manager.is_end(index)
    }

    /// Returns the successor variable of an index.
    pub fn next_var(&self, index: usize) -> VariableHandle {
        self.nexts[index]
    }

    /// Returns the vehicle variable of an index.
    pub fn vehicle_var(&self, index: usize) -> VariableHandle {
        self.vehicle_vars[index]
    }

    /// Returns the active variable of an index.
    pub fn active_var(&self, index: usize) -> VariableHandle {
        self.actives[index]
    }

    /// Returns the cost variable of the model.
    pub fn cost_var(&self) -> VariableHandle {
        self.cost_var
    }

    /// Resolves a handle back to the index of its successor variable.
    pub(crate) fn as_next_variable(&self, variable: VariableHandle) -> Option<usize> {
        let base = self.nexts.first()?.index();
        let offset = variable.index().checked_sub(base)?;
        (offset < self.nexts.len()).then_some(offset)
    }

    /// Resolves a handle back to the index of its vehicle variable.
    pub(crate) fn as_vehicle_variable(&self, variable: VariableHandle) -> Option<usize> {
        let base = self.vehicle_vars.first()?.index();
        let offset = variable.index().checked_sub(base)?;
        (offset < self.vehicle_vars.len()).then_some(offset)
    }

    /// Resolves a handle back to the index of its active variable.
    pub(crate) fn as_active_variable(&self, variable: VariableHandle) -> Option<usize> {
        let base = self.actives.first()?.index();
        let offset = variable.index().checked_sub(base)?;
        (offset < self.actives.len()).then_some(offset)
    }

    // Solving

    /// Solves the model with default parameters, returning the best found
    /// solution which stays owned by the model.
    pub fn solve(&mut self) -> Option<&Assignment> {
        self.solve_with_parameters(&SearchParameters::default())
    }

    /// Solves the model with the given parameters.
    pub fn solve_with_parameters(&mut self, parameters: &SearchParameters) -> Option<&Assignment> {
        self.solve_internal(parameters, None)
    }

    /// Solves the model starting the search from the given assignment.
    pub fn solve_from_assignment(
        &mut self,
        assignment: &Assignment,
        parameters: &SearchParameters,
    ) -> Option<&Assignment> {
        self.solve_internal(parameters, Some(assignment))
    }

    fn solve_internal(&mut self, parameters: &SearchParameters, initial: Option<&Assignment>) -> Option<&Assignment> {
        if !self.closed && self.close_model_with_parameters(parameters).is_err() {
            return None;
        }

        let outcome = crate::search::solve_model(self, parameters, initial);
        self.status = outcome.status;
        self.best = outcome.best;

        self.best.as_ref()
    }

    /// Returns the best solution of the last solve, if any.
    pub fn best_solution(&self) -> Option<&Assignment> {
        self.best.as_ref()
    }

    /// Returns the search status of the model.
    pub fn status(&self) -> RoutingSearchStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: RoutingSearchStatus) {
        self.status = status;
    }

    /// Returns true if the model was closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> GenericResult<()> {
        if self.closed {
            Err("the model is closed: no further modification is allowed".into())
        } else {
            Ok(())
        }
    }
}
