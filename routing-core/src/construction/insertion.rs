//! Cheapest insertion first solution heuristics.

#[cfg(test)]
#[path = "../../tests/unit/construction/insertion_test.rs"]
mod insertion_test;

use super::FilteredHeuristic;
use crate::filters::LocalSearchFilter;
use crate::model::RoutingModel;
use crate::models::assignment::Assignment;
use crate::models::common::Cost;
use crate::search::SearchParameters;
use hashbrown::HashSet;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// An insertable item: a plain node or a pickup and delivery pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
enum Item {
    Node(usize),
    Pair(usize),
}

/// A scored candidate insertion, valid as long as the epoch of its vehicle
/// has not moved.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
struct Candidate {
    cost: Cost,
    item: Item,
    vehicle: usize,
    pickup: usize,
    delivery: usize,
    previous: usize,
    delivery_previous: usize,
    epoch: u64,
}

/// Inserts globally cheapest items first, using a priority queue of
/// candidate insertions which is lazily rescored after every commit. Pairs
/// are inserted as one unit. Optionally seeds routes with farthest nodes and
/// opens routes one at a time.
pub struct GlobalCheapestInsertionBuilder {
    is_sequential: bool,
    neighbors_ratio: f64,
    farthest_seeds_ratio: f64,
}

impl GlobalCheapestInsertionBuilder {
    /// Creates the builder from search parameters.
    pub fn new(is_sequential: bool, parameters: &SearchParameters) -> Self {
        Self {
            is_sequential,
            neighbors_ratio: parameters.cheapest_insertion_neighbors_ratio,
            farthest_seeds_ratio: parameters.cheapest_insertion_farthest_seeds_ratio,
        }
    }

    /// Builds a first solution, or returns `None` when the filters block it.
    pub fn build(&self, model: &RoutingModel, filters: &mut [Box<dyn LocalSearchFilter>]) -> Option<Assignment> {
        let mut heuristic = FilteredHeuristic::new(model, filters)?;
        let neighbors = NeighborLists::new(model, self.neighbors_ratio);

        self.seed_routes(model, &mut heuristic);

        let mut pending = collect_items(model, &heuristic);
        let mut epochs = vec![0u64; model.num_vehicles()];
        let mut clock = 0u64;
        let mut rejected: HashSet<(Item, usize, usize, usize)> = HashSet::default();

        let mut heap: BinaryHeap<Reverse<Candidate>> = BinaryHeap::default();
        for &item in &pending {
            if let Some(candidate) =
                best_insertion(model, &heuristic, item, &neighbors, self.open_vehicles(model, &heuristic), &rejected, clock)
            {
                heap.push(Reverse(candidate));
            }
        }

        while let Some(Reverse(candidate)) = heap.pop() {
            if !pending.contains(&candidate.item) {
                continue;
            }
            if epochs[candidate.vehicle] > candidate.epoch {
                // the route moved under the candidate: rescore it
                if let Some(candidate) = best_insertion(
                    model,
                    &heuristic,
                    candidate.item,
                    &neighbors,
                    self.open_vehicles(model, &heuristic),
                    &rejected,
                    clock,
                ) {
                    heap.push(Reverse(candidate));
                }
                continue;
            }

            stage_insertion(&mut heuristic, &candidate);
            if heuristic.commit() {
                pending.remove(&candidate.item);
                clock += 1;
                epochs[candidate.vehicle] = clock;
            } else {
                rejected.insert((candidate.item, candidate.vehicle, candidate.previous, candidate.delivery_previous));
            }

            if let Some(candidate) = best_insertion(
                model,
                &heuristic,
                candidate.item,
                &neighbors,
                self.open_vehicles(model, &heuristic),
                &rejected,
                clock,
            ) {
                heap.push(Reverse(candidate));
            }
        }

        heuristic.finalize()
    }

    /// Returns vehicles insertions may currently target: all of them in
    /// parallel mode, the started ones plus one fresh route in sequential
    /// mode.
    fn open_vehicles(&self, model: &RoutingModel, heuristic: &FilteredHeuristic<'_>) -> Vec<usize> {
        if !self.is_sequential {
            return (0..model.num_vehicles()).collect();
        }

        let mut vehicles = Vec::default();
        let mut fresh = None;
        for vehicle in 0..model.num_vehicles() {
            if heuristic.route_visits(vehicle).is_empty() {
                fresh.get_or_insert(vehicle);
            } else {
                vehicles.push(vehicle);
            }
        }
        vehicles.extend(fresh);

        vehicles
    }

    /// Seeds a share of the routes with their farthest reachable node.
    fn seed_routes(&self, model: &RoutingModel, heuristic: &mut FilteredHeuristic<'_>) {
        let seeds = (self.farthest_seeds_ratio * model.num_vehicles() as f64).floor() as usize;

        for vehicle in 0..seeds.min(model.num_vehicles()) {
            if !heuristic.route_visits(vehicle).is_empty() {
                continue;
            }

            let start = model.start(vehicle);
            let farthest = (0..model.size())
                .filter(|&index| {
                    !model.is_start(index)
                        && !heuristic.is_bound(index)
                        && model.pickup_positions(index).is_empty()
                        && model.delivery_positions(index).is_empty()
                })
                .max_by_key(|&index| (model.arc_cost_for_first_solution(start, index), Reverse(index)));

            if let Some(index) = farthest {
                heuristic.append_visit(vehicle, start, index);
                heuristic.commit();
            }
        }
    }
}

/// Inserts the first unbound node at its cheapest feasible position, trying
/// positions in cost order until the filters accept one.
#[derive(Default)]
pub struct LocalCheapestInsertionBuilder {}

impl LocalCheapestInsertionBuilder {
    /// Builds a first solution, or returns `None` when the filters block it.
    pub fn build(&self, model: &RoutingModel, filters: &mut [Box<dyn LocalSearchFilter>]) -> Option<Assignment> {
        let mut heuristic = FilteredHeuristic::new(model, filters)?;
        let neighbors = NeighborLists::new(model, 1.);
        let all_vehicles = (0..model.num_vehicles()).collect::<Vec<_>>();

        loop {
            let mut pending = collect_items(model, &heuristic);
            let Some(&item) = pending.iter().min() else { break };

            let mut inserted = false;
            let mut rejected: HashSet<(Item, usize, usize, usize)> = HashSet::default();
            while let Some(candidate) =
                best_insertion(model, &heuristic, item, &neighbors, all_vehicles.clone(), &rejected, 0)
            {
                stage_insertion(&mut heuristic, &candidate);
                if heuristic.commit() {
                    inserted = true;
                    break;
                }
                rejected.insert((candidate.item, candidate.vehicle, candidate.previous, candidate.delivery_previous));
            }

            if !inserted {
                // leave the item to the finalizer, which drops it when a
                // disjunction permits
                pending.remove(&item);
                match item {
                    Item::Node(node) => {
                        heuristic.make_unperformed(node);
                    }
                    Item::Pair(pair) => {
                        let pair = &model.pickup_delivery_pairs()[pair];
                        pair.pickups.iter().chain(pair.deliveries.iter()).for_each(|&index| {
                            heuristic.make_unperformed(index);
                        });
                    }
                }
                if !heuristic.commit() {
                    return None;
                }
            }
        }

        heuristic.finalize()
    }
}

/// Per cost class lists of the nearest neighbors of every index, used to
/// truncate the insertion neighborhood.
struct NeighborLists {
    ratio: f64,
    neighbors: Vec<Vec<HashSet<usize>>>,
}

impl NeighborLists {
    fn new(model: &RoutingModel, ratio: f64) -> Self {
        if ratio >= 1. {
            return Self { ratio, neighbors: Vec::default() };
        }

        let size = model.size();
        let keep = ((size as f64 * ratio).ceil() as usize).max(1);
        let neighbors = (0..model.cost_classes().len())
            .map(|cost_class| {
                (0..size)
                    .map(|index| {
                        let mut others = (0..size)
                            .filter(|&other| other != index && !model.is_start(other))
                            .collect::<Vec<_>>();
                        others.sort_by_key(|&other| model.arc_cost_for_class(other, index, cost_class));
                        others.truncate(keep);
                        others.into_iter().collect::<HashSet<_>>()
                    })
                    .collect()
            })
            .collect();

        Self { ratio, neighbors }
    }

    /// Returns true if inserting `index` right after `previous` is within
    /// the truncated neighborhood.
    fn allows(&self, model: &RoutingModel, cost_class: usize, previous: usize, index: usize) -> bool {
        self.ratio >= 1. || model.is_start(previous) || self.neighbors[cost_class][index].contains(&previous)
    }
}

fn collect_items(model: &RoutingModel, heuristic: &FilteredHeuristic<'_>) -> HashSet<Item> {
    let mut items = HashSet::default();

    for index in 0..model.size() {
        if model.is_start(index) || heuristic.is_bound(index) {
            continue;
        }

        if let Some(&(pair, _)) = model.pickup_positions(index).first() {
            items.insert(Item::Pair(pair));
        } else if let Some(&(pair, _)) = model.delivery_positions(index).first() {
            items.insert(Item::Pair(pair));
        } else {
            items.insert(Item::Node(index));
        }
    }

    items
}

/// Scores the cheapest insertion of an item over the given vehicles,
/// skipping already rejected placements.
fn best_insertion(
    model: &RoutingModel,
    heuristic: &FilteredHeuristic<'_>,
    item: Item,
    neighbors: &NeighborLists,
    vehicles: Vec<usize>,
    rejected: &HashSet<(Item, usize, usize, usize)>,
    epoch: u64,
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    let mut consider = |candidate: Candidate| {
        if rejected.contains(&(candidate.item, candidate.vehicle, candidate.previous, candidate.delivery_previous)) {
            return;
        }
        if best.as_ref().map_or(true, |known| candidate < *known) {
            best = Some(candidate);
        }
    };

    for vehicle in vehicles {
        let cost_class = model.cost_class_of_vehicle(vehicle);
        let positions = insertion_positions(model, heuristic, vehicle);

        match item {
            Item::Node(node) => {
                if !model.is_vehicle_allowed_for_index(vehicle, node) {
                    continue;
                }
                for &previous in &positions {
                    if !neighbors.allows(model, cost_class, previous, node) {
                        continue;
                    }
                    consider(Candidate {
                        cost: arc_insertion_cost(model, heuristic, vehicle, previous, node),
                        item,
                        vehicle,
                        pickup: node,
                        delivery: node,
                        previous,
                        delivery_previous: node,
                        epoch,
                    });
                }
            }
            Item::Pair(pair_index) => {
                let pair = &model.pickup_delivery_pairs()[pair_index];
                for &pickup in &pair.pickups {
                    for &delivery in &pair.deliveries {
                        if !model.is_vehicle_allowed_for_index(vehicle, pickup)
                            || !model.is_vehicle_allowed_for_index(vehicle, delivery)
                        {
                            continue;
                        }

                        for (position, &previous) in positions.iter().enumerate() {
                            if !neighbors.allows(model, cost_class, previous, pickup) {
                                continue;
                            }
                            let pickup_cost = arc_insertion_cost(model, heuristic, vehicle, previous, pickup);

                            // delivery right after the pickup
                            let tight = pickup_cost
                                + model.arc_cost_for_vehicle(pickup, delivery, vehicle as i64)
                                + successor_cost(model, heuristic, vehicle, previous, delivery)
                                - model.arc_cost_for_vehicle(
                                    pickup,
                                    successor_of(model, heuristic, vehicle, previous),
                                    vehicle as i64,
                                );
                            consider(Candidate {
                                cost: tight,
                                item,
                                vehicle,
                                pickup,
                                delivery,
                                previous,
                                delivery_previous: pickup,
                                epoch,
                            });

                            // delivery after a later visit
                            for &delivery_previous in &positions[position + 1..] {
                                consider(Candidate {
                                    cost: pickup_cost
                                        + arc_insertion_cost(model, heuristic, vehicle, delivery_previous, delivery),
                                    item,
                                    vehicle,
                                    pickup,
                                    delivery,
                                    previous,
                                    delivery_previous,
                                    epoch,
                                });
                            }
                        }
                    }
                }
            }
        }
    }

    best
}

/// Returns the start and every visit of a route: all legal insertion points.
fn insertion_positions(model: &RoutingModel, heuristic: &FilteredHeuristic<'_>, vehicle: usize) -> Vec<usize> {
    let mut positions = vec![model.start(vehicle)];
    positions.extend(heuristic.route_visits(vehicle));
    positions
}

fn successor_of(model: &RoutingModel, heuristic: &FilteredHeuristic<'_>, vehicle: usize, previous: usize) -> usize {
    heuristic.next_value(previous).unwrap_or_else(|| model.end(vehicle))
}

fn successor_cost(
    model: &RoutingModel,
    heuristic: &FilteredHeuristic<'_>,
    vehicle: usize,
    previous: usize,
    inserted: usize,
) -> Cost {
    model.arc_cost_for_vehicle(inserted, successor_of(model, heuristic, vehicle, previous), vehicle as i64)
}

/// The arc cost delta of inserting an index right after `previous`.
fn arc_insertion_cost(
    model: &RoutingModel,
    heuristic: &FilteredHeuristic<'_>,
    vehicle: usize,
    previous: usize,
    inserted: usize,
) -> Cost {
    let successor = successor_of(model, heuristic, vehicle, previous);
    model.arc_cost_for_vehicle(previous, inserted, vehicle as i64)
        + model.arc_cost_for_vehicle(inserted, successor, vehicle as i64)
        - model.arc_cost_for_vehicle(previous, successor, vehicle as i64)
}

/// Stages all variable changes of a candidate insertion.
fn stage_insertion(heuristic: &mut FilteredHeuristic<'_>, candidate: &Candidate) {
    match candidate.item {
        Item::Node(node) => heuristic.insert_visit(candidate.vehicle, candidate.previous, node),
        Item::Pair(_) => {
            heuristic.insert_visit(candidate.vehicle, candidate.previous, candidate.pickup);
            heuristic.insert_visit(candidate.vehicle, candidate.delivery_previous, candidate.delivery);
        }
    }
}
