//! Clarke & Wright savings first solution heuristics.

#[cfg(test)]
#[path = "../../tests/unit/construction/savings_test.rs"]
mod savings_test;

use super::{insert_leftovers, FilteredHeuristic};
use crate::filters::LocalSearchFilter;
use crate::model::RoutingModel;
use crate::models::assignment::Assignment;
use crate::models::common::Cost;
use crate::search::SearchParameters;
use hashbrown::{HashMap, HashSet};
use std::cmp::Reverse;

/// A vehicle type: the equivalence grouping savings are computed per.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
struct VehicleType {
    cost_class: usize,
    start_node: usize,
    end_node: usize,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
struct Saving {
    value: Cost,
    from: usize,
    to: usize,
    vehicle_type: usize,
}

/// Builds routes by connecting the pairs with the highest savings
/// `arc(start, j) + arc(i, end) - coefficient * arc(i, j)`, either opening
/// one route at a time (sequential) or growing and merging all routes at
/// once (parallel).
pub struct SavingsBuilder {
    is_sequential: bool,
    neighbors_ratio: f64,
    arc_coefficient: f64,
}

impl SavingsBuilder {
    /// Creates the builder from search parameters.
    pub fn new(is_sequential: bool, parameters: &SearchParameters) -> Self {
        Self {
            is_sequential,
            neighbors_ratio: parameters.savings_neighbors_ratio,
            arc_coefficient: parameters.savings_arc_coefficient,
        }
    }

    /// Builds a first solution, or returns `None` when the filters block it.
    pub fn build(&self, model: &RoutingModel, filters: &mut [Box<dyn LocalSearchFilter>]) -> Option<Assignment> {
        let mut heuristic = FilteredHeuristic::new(model, filters)?;

        let (types, vehicles_of_type) = vehicle_types(model);
        let savings = self.compute_savings(model, &heuristic, &types, &vehicles_of_type);

        if self.is_sequential {
            self.build_sequential(model, &mut heuristic, &savings, &types, &vehicles_of_type);
        } else {
            self.build_parallel(model, &mut heuristic, &savings, &types, &vehicles_of_type);
        }

        insert_leftovers(model, &mut heuristic);

        heuristic.finalize()
    }

    /// Computes savings of all candidate arcs per vehicle type, restricted
    /// to the cheapest neighbors of each node, sorted descending.
    fn compute_savings(
        &self,
        model: &RoutingModel,
        heuristic: &FilteredHeuristic<'_>,
        types: &[VehicleType],
        vehicles_of_type: &[Vec<usize>],
    ) -> Vec<Saving> {
        let nodes = (0..model.size())
            .filter(|&index| !model.is_start(index) && !heuristic.is_bound(index))
            .collect::<Vec<_>>();

        let neighbors = self.neighbor_arcs(model, &nodes);

        let mut savings = Vec::default();
        for (type_index, vehicle_type) in types.iter().enumerate() {
            let representative = vehicles_of_type[type_index][0];
            let (start, end) = (model.start(representative), model.end(representative));

            for &from in &nodes {
                for &to in &nodes {
                    if from == to || !neighbors.contains(&(from, to)) {
                        continue;
                    }

                    let class = vehicle_type.cost_class;
                    let value = model.arc_cost_for_class(start, to, class)
                        + model.arc_cost_for_class(from, end, class)
                        - (self.arc_coefficient * model.arc_cost_for_class(from, to, class) as f64) as Cost;

                    savings.push(Saving { value, from, to, vehicle_type: type_index });
                }
            }
        }

        savings.sort_by_key(|&saving| (Reverse(saving.value), saving.from, saving.to, saving.vehicle_type));
        savings
    }

    /// Keeps the cheapest share of outgoing arcs per node, symmetrized.
    fn neighbor_arcs(&self, model: &RoutingModel, nodes: &[usize]) -> HashSet<(usize, usize)> {
        let keep = if self.neighbors_ratio >= 1. {
            nodes.len()
        } else {
            ((nodes.len() as f64 * self.neighbors_ratio).ceil() as usize).max(1)
        };

        let mut arcs = HashSet::default();
        for &from in nodes {
            let mut others = nodes.iter().copied().filter(|&to| to != from).collect::<Vec<_>>();
            others.sort_by_key(|&to| (model.arc_cost_for_first_solution(from, to), to));
            others.truncate(keep);
            for to in others {
                arcs.insert((from, to));
                arcs.insert((to, from));
            }
        }

        arcs
    }

    fn build_parallel(
        &self,
        model: &RoutingModel,
        heuristic: &mut FilteredHeuristic<'_>,
        savings: &[Saving],
        types: &[VehicleType],
        vehicles_of_type: &[Vec<usize>],
    ) {
        let mut state = RouteState::new(model);

        for saving in savings {
            let from_free = !heuristic.is_bound(saving.from) && !state.is_routed(saving.from);
            let to_free = !heuristic.is_bound(saving.to) && !state.is_routed(saving.to);

            if from_free && to_free {
                if let Some(vehicle) = state.cheapest_free_vehicle(model, &vehicles_of_type[saving.vehicle_type]) {
                    let start = model.start(vehicle);
                    heuristic.append_visit(vehicle, start, saving.from);
                    heuristic.append_visit(vehicle, saving.from, saving.to);
                    if heuristic.commit() {
                        state.open_route(vehicle, saving.from, saving.to);
                    }
                }
            } else if to_free {
                if let Some(vehicle) = state.route_ending_at(saving.from) {
                    if types[saving.vehicle_type].cost_class == model.cost_class_of_vehicle(vehicle) {
                        heuristic.append_visit(vehicle, saving.from, saving.to);
                        if heuristic.commit() {
                            state.extend_tail(vehicle, saving.to);
                        }
                    }
                }
            } else if from_free {
                if let Some(vehicle) = state.route_starting_at(saving.to) {
                    if types[saving.vehicle_type].cost_class == model.cost_class_of_vehicle(vehicle) {
                        heuristic.append_visit(vehicle, model.start(vehicle), saving.from);
                        heuristic.set_value(model.next_var(saving.from), saving.to as i64);
                        if heuristic.commit() {
                            state.extend_head(vehicle, saving.from);
                        }
                    }
                }
            } else if let (Some(tail_vehicle), Some(head_vehicle)) =
                (state.route_ending_at(saving.from), state.route_starting_at(saving.to))
            {
                if tail_vehicle != head_vehicle {
                    self.merge_routes(model, heuristic, &mut state, tail_vehicle, head_vehicle, saving);
                }
            }
        }
    }

    /// Merges the route ending at `saving.from` with the one starting at
    /// `saving.to`, keeping the vehicle with the lower fixed cost.
    fn merge_routes(
        &self,
        model: &RoutingModel,
        heuristic: &mut FilteredHeuristic<'_>,
        state: &mut RouteState,
        tail_vehicle: usize,
        head_vehicle: usize,
        saving: &Saving,
    ) {
        let keep_tail = model.fixed_cost_of_vehicle(tail_vehicle) <= model.fixed_cost_of_vehicle(head_vehicle);
        let keeper = if keep_tail { tail_vehicle } else { head_vehicle };
        let donor = if keep_tail { head_vehicle } else { tail_vehicle };

        let tail_visits = heuristic.route_visits(tail_vehicle);
        let head_visits = heuristic.route_visits(head_vehicle);

        let mut previous = model.start(keeper);
        for &index in tail_visits.iter().chain(head_visits.iter()) {
            heuristic.append_visit(keeper, previous, index);
            previous = index;
        }
        heuristic.close_route(keeper, previous);
        heuristic.set_value(model.next_var(model.start(donor)), model.end(donor) as i64);

        if heuristic.commit() {
            state.merge(keeper, donor, &tail_visits, &head_visits);
        }
    }

    fn build_sequential(
        &self,
        model: &RoutingModel,
        heuristic: &mut FilteredHeuristic<'_>,
        savings: &[Saving],
        types: &[VehicleType],
        vehicles_of_type: &[Vec<usize>],
    ) {
        let mut state = RouteState::new(model);

        loop {
            // open a route with the best saving over two free nodes
            let opened = savings.iter().find_map(|saving| {
                if !is_free(heuristic, &state, saving.from) || !is_free(heuristic, &state, saving.to) {
                    return None;
                }
                let vehicle = state.cheapest_free_vehicle(model, &vehicles_of_type[saving.vehicle_type])?;

                let start = model.start(vehicle);
                heuristic.append_visit(vehicle, start, saving.from);
                heuristic.append_visit(vehicle, saving.from, saving.to);
                heuristic.commit().then(|| {
                    state.open_route(vehicle, saving.from, saving.to);
                    vehicle
                })
            });

            let Some(vehicle) = opened else { break };
            let cost_class = model.cost_class_of_vehicle(vehicle);

            // grow both ends until no saving extends them
            loop {
                let extension = savings.iter().find_map(|saving| {
                    if types[saving.vehicle_type].cost_class != cost_class {
                        return None;
                    }

                    if state.route_ending_at(saving.from) == Some(vehicle) && is_free(heuristic, &state, saving.to) {
                        heuristic.append_visit(vehicle, saving.from, saving.to);
                        return heuristic.commit().then(|| state.extend_tail(vehicle, saving.to));
                    }
                    if state.route_starting_at(saving.to) == Some(vehicle) && is_free(heuristic, &state, saving.from)
                    {
                        heuristic.append_visit(vehicle, model.start(vehicle), saving.from);
                        heuristic.set_value(model.next_var(saving.from), saving.to as i64);
                        return heuristic.commit().then(|| state.extend_head(vehicle, saving.from));
                    }

                    None
                });

                if extension.is_none() {
                    break;
                }
            }

            heuristic.close_route(vehicle, state.tail_of(vehicle));
            if !heuristic.commit() {
                break;
            }
        }
    }
}

/// Heads, tails and vehicle bookkeeping of the routes under construction.
struct RouteState {
    head_of: Vec<Option<usize>>,
    tail_of: Vec<Option<usize>>,
    route_of: HashMap<usize, usize>,
    used: Vec<bool>,
}

impl RouteState {
    fn new(model: &RoutingModel) -> Self {
        let used = (0..model.num_vehicles())
            .map(|vehicle| !model.locked_chain_of_vehicle(vehicle).is_empty())
            .collect();
        Self { head_of: vec![None; model.num_vehicles()], tail_of: vec![None; model.num_vehicles()], route_of: HashMap::default(), used }
    }

    fn is_routed(&self, index: usize) -> bool {
        self.route_of.contains_key(&index)
    }

    fn cheapest_free_vehicle(&self, model: &RoutingModel, vehicles: &[usize]) -> Option<usize> {
        vehicles
            .iter()
            .copied()
            .filter(|&vehicle| !self.used[vehicle])
            .min_by_key(|&vehicle| (model.fixed_cost_of_vehicle(vehicle), vehicle))
    }

    fn open_route(&mut self, vehicle: usize, head: usize, tail: usize) {
        self.used[vehicle] = true;
        self.head_of[vehicle] = Some(head);
        self.tail_of[vehicle] = Some(tail);
        self.route_of.insert(head, vehicle);
        self.route_of.insert(tail, vehicle);
    }

    fn route_ending_at(&self, index: usize) -> Option<usize> {
        self.route_of.get(&index).copied().filter(|&vehicle| self.tail_of[vehicle] == Some(index))
    }

    fn route_starting_at(&self, index: usize) -> Option<usize> {
        self.route_of.get(&index).copied().filter(|&vehicle| self.head_of[vehicle] == Some(index))
    }

    fn extend_tail(&mut self, vehicle: usize, index: usize) {
        self.tail_of[vehicle] = Some(index);
        self.route_of.insert(index, vehicle);
    }

    fn extend_head(&mut self, vehicle: usize, index: usize) {
        self.head_of[vehicle] = Some(index);
        self.route_of.insert(index, vehicle);
    }

    fn tail_of(&self, vehicle: usize) -> usize {
        self.tail_of[vehicle].unwrap()
    }

    fn merge(&mut self, keeper: usize, donor: usize, tail_visits: &[usize], head_visits: &[usize]) {
        for &index in tail_visits.iter().chain(head_visits.iter()) {
            self.route_of.insert(index, keeper);
        }
        self.head_of[keeper] = tail_visits.first().or(head_visits.first()).copied();
        self.tail_of[keeper] = head_visits.last().or(tail_visits.last()).copied();
        self.head_of[donor] = None;
        self.tail_of[donor] = None;
        self.used[donor] = true;
    }
}

fn is_free(heuristic: &FilteredHeuristic<'_>, state: &RouteState, index: usize) -> bool {
    !heuristic.is_bound(index) && !state.is_routed(index)
}

/// Groups vehicles into savings types and returns the vehicles of each type.
fn vehicle_types(model: &RoutingModel) -> (Vec<VehicleType>, Vec<Vec<usize>>) {
    let mut types: Vec<VehicleType> = Vec::default();
    let mut vehicles_of_type: Vec<Vec<usize>> = Vec::default();
    let mut known: HashMap<VehicleType, usize> = HashMap::default();

    for vehicle in 0..model.num_vehicles() {
        let vehicle_type = VehicleType {
            cost_class: model.cost_class_of_vehicle(vehicle),
            start_node: model.manager().index_to_node(model.start(vehicle)),
            end_node: model.manager().index_to_node(model.end(vehicle)),
        };

        let type_index = *known.entry(vehicle_type).or_insert_with(|| {
            types.push(vehicle_type);
            vehicles_of_type.push(Vec::default());
            types.len() - 1
        });
        vehicles_of_type[type_index].push(vehicle);
    }

    (types, vehicles_of_type)
}

