//! Neighborhood operators producing candidate plans from the current one.

#[cfg(test)]
#[path = "../../tests/unit/search/operators_test.rs"]
mod operators_test;

use super::SearchParameters;
use crate::model::RoutingModel;
use crate::models::common::Cost;
use rand::rngs::StdRng;
use rand::Rng;

/// Per vehicle visit sequences: the representation operators work on.
pub(crate) type Plan = Vec<Vec<usize>>;

/// The neighborhood operators of the routing local search, in application
/// order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RoutingLocalSearchOperator {
    /// Moves one visit to another position.
    Relocate,
    /// Moves a pickup and delivery pair to another route.
    RelocatePair,
    /// Moves a pair keeping the delivery right behind the pickup.
    LightRelocatePair,
    /// Moves two consecutive visits together.
    RelocateNeighbors,
    /// Swaps two visits between positions.
    Exchange,
    /// Swaps two pickup and delivery pairs between routes.
    ExchangePair,
    /// Swaps the tails of two routes.
    Cross,
    /// Reverses a subsequence of one route.
    TwoOpt,
    /// Moves a short chain inside its route.
    OrOpt,
    /// Relocates the chain between the two most expensive arcs of a route.
    RelocateExpensiveChain,
    /// Chained two opt descent per route.
    LinKernighan,
    /// Exact reordering of short routes.
    TspOpt,
    /// Inserts an inactive index.
    MakeActive,
    /// Drops a visit into inactivity.
    MakeInactive,
    /// Drops a chain of visits into inactivity.
    MakeChainInactive,
    /// Replaces a visit by an inactive index at the same position.
    SwapActive,
    /// Drops a visit and inserts an inactive index anywhere.
    ExtendedSwapActive,
    /// Swaps an active pair member with an inactive alternative.
    NodePairSwap,
    /// Moves a pair to another route and a visit back.
    ExchangeRelocatePair,
    /// Destroys one or two routes and repairs greedily.
    PathLns,
    /// Destroys a route and repairs it together with inactive indices.
    FullPathLns,
    /// Reoptimizes one route exactly after augmenting it.
    TspLns,
    /// Destroys a chain and inserts inactive indices greedily.
    InactiveLns,
}

/// A neighborhood: the operator kind plus its enumeration logic.
pub(crate) struct Neighborhood {
    pub(crate) kind: RoutingLocalSearchOperator,
}

/// Builds the operator set allowed by the parameters, in canonical order.
pub(crate) fn create_operators(parameters: &SearchParameters) -> Vec<Neighborhood> {
    use RoutingLocalSearchOperator::*;

    [
        Relocate,
        RelocatePair,
        LightRelocatePair,
        RelocateNeighbors,
        Exchange,
        ExchangePair,
        Cross,
        TwoOpt,
        OrOpt,
        RelocateExpensiveChain,
        LinKernighan,
        TspOpt,
        MakeActive,
        MakeInactive,
        MakeChainInactive,
        SwapActive,
        ExtendedSwapActive,
        NodePairSwap,
        ExchangeRelocatePair,
        PathLns,
        FullPathLns,
        TspLns,
        InactiveLns,
    ]
    .into_iter()
    .filter(|kind| match kind {
        PathLns | FullPathLns | InactiveLns => !parameters.no_lns,
        TspLns => !parameters.no_lns && !parameters.no_tsp,
        TspOpt => !parameters.no_tsp,
        _ => true,
    })
    .map(|kind| Neighborhood { kind })
    .collect()
}

impl Neighborhood {
    /// Enumerates candidate plans around the current one.
    pub(crate) fn neighbors(&self, model: &RoutingModel, plan: &Plan, rng: &mut StdRng) -> Vec<Plan> {
        use RoutingLocalSearchOperator::*;

        match self.kind {
            Relocate => relocate(model, plan, 1),
            RelocateNeighbors => relocate(model, plan, 2),
            RelocatePair => relocate_pair(model, plan, false),
            LightRelocatePair => relocate_pair(model, plan, true),
            Exchange => exchange(plan),
            ExchangePair => exchange_pair(model, plan),
            Cross => cross(plan),
            TwoOpt => two_opt(plan),
            OrOpt => or_opt(plan),
            RelocateExpensiveChain => relocate_expensive_chain(model, plan),
            LinKernighan => lin_kernighan(model, plan),
            TspOpt => tsp_opt(model, plan),
            MakeActive => make_active(model, plan),
            MakeInactive => make_inactive(model, plan),
            MakeChainInactive => make_chain_inactive(model, plan),
            SwapActive => swap_active(model, plan),
            ExtendedSwapActive => extended_swap_active(model, plan),
            NodePairSwap => node_pair_swap(model, plan),
            ExchangeRelocatePair => exchange_relocate_pair(model, plan),
            PathLns => path_lns(model, plan, rng),
            FullPathLns => full_path_lns(model, plan),
            TspLns => tsp_lns(model, plan, rng),
            InactiveLns => inactive_lns(model, plan, rng),
        }
    }
}

/// An active pickup and delivery pair located inside a plan.
#[derive(Clone, Copy, Debug)]
struct PlacedPair {
    pair: usize,
    vehicle: usize,
    pickup_position: usize,
    delivery_position: usize,
}

fn inactive_nodes(model: &RoutingModel, plan: &Plan) -> Vec<usize> {
    let mut active = vec![false; model.size()];
    plan.iter().flatten().for_each(|&index| active[index] = true);

    (0..model.size()).filter(|&index| !model.is_start(index) && !active[index]).collect()
}

fn droppable(model: &RoutingModel, index: usize) -> bool {
    model.unperformed_penalty(index).is_some()
}

fn placed_pairs(model: &RoutingModel, plan: &Plan) -> Vec<PlacedPair> {
    let mut pairs = Vec::default();

    for (vehicle, visits) in plan.iter().enumerate() {
        for (pickup_position, &index) in visits.iter().enumerate() {
            for &(pair, _) in model.pickup_positions(index) {
                let delivery = visits[pickup_position + 1..].iter().position(|&other| {
                    model.delivery_positions(other).iter().any(|&(other_pair, _)| other_pair == pair)
                });
                if let Some(offset) = delivery {
                    pairs.push(PlacedPair {
                        pair,
                        vehicle,
                        pickup_position,
                        delivery_position: pickup_position + 1 + offset,
                    });
                }
            }
        }
    }

    pairs
}

fn relocate(model: &RoutingModel, plan: &Plan, chain: usize) -> Vec<Plan> {
    let mut candidates = Vec::default();

    for from_vehicle in 0..plan.len() {
        let visits = &plan[from_vehicle];
        if visits.len() < chain {
            continue;
        }

        for position in 0..=visits.len() - chain {
            let moved = &visits[position..position + chain];
            if moved.iter().any(|&index| !model.pickup_positions(index).is_empty()
                || !model.delivery_positions(index).is_empty())
            {
                continue;
            }

            for to_vehicle in 0..plan.len() {
                let target_len = if to_vehicle == from_vehicle { visits.len() - chain } else { plan[to_vehicle].len() };
                for insert in 0..=target_len {
                    if to_vehicle == from_vehicle && insert == position {
                        continue;
                    }

                    let mut candidate = plan.to_vec();
                    candidate[from_vehicle].drain(position..position + chain);
                    for (offset, &index) in moved.iter().enumerate() {
                        candidate[to_vehicle].insert(insert + offset, index);
                    }
                    candidates.push(candidate);
                }
            }
        }
    }

    candidates
}

fn relocate_pair(model: &RoutingModel, plan: &Plan, light: bool) -> Vec<Plan> {
    let mut candidates = Vec::default();

    for placed in placed_pairs(model, plan) {
        let pickup = plan[placed.vehicle][placed.pickup_position];
        let delivery = plan[placed.vehicle][placed.delivery_position];

        let mut stripped = plan.to_vec();
        stripped[placed.vehicle].remove(placed.delivery_position);
        stripped[placed.vehicle].remove(placed.pickup_position);

        for vehicle in 0..plan.len() {
            for pickup_insert in 0..=stripped[vehicle].len() {
                let delivery_choices = if light {
                    vec![pickup_insert]
                } else {
                    (pickup_insert..=stripped[vehicle].len()).collect()
                };

                for delivery_insert in delivery_choices {
                    if vehicle == placed.vehicle
                        && pickup_insert == placed.pickup_position
                        && delivery_insert + 1 == placed.delivery_position
                    {
                        continue;
                    }

                    let mut candidate = stripped.clone();
                    candidate[vehicle].insert(pickup_insert, pickup);
                    candidate[vehicle].insert(delivery_insert + 1, delivery);
                    candidates.push(candidate);
                }
            }
        }
    }

    candidates
}

fn exchange(plan: &Plan) -> Vec<Plan> {
    let mut candidates = Vec::default();
    let positions = plan
        .iter()
        .enumerate()
        .flat_map(|(vehicle, visits)| (0..visits.len()).map(move |position| (vehicle, position)))
        .collect::<Vec<_>>();

    for &(first_vehicle, first) in &positions {
        for &(second_vehicle, second) in &positions {
            if (second_vehicle, second) <= (first_vehicle, first) {
                continue;
            }

            let mut candidate = plan.to_vec();
            let lhs = candidate[first_vehicle][first];
            let rhs = candidate[second_vehicle][second];
            candidate[first_vehicle][first] = rhs;
            candidate[second_vehicle][second] = lhs;
            candidates.push(candidate);
        }
    }

    candidates
}

fn exchange_pair(model: &RoutingModel, plan: &Plan) -> Vec<Plan> {
    let pairs = placed_pairs(model, plan);
    let mut candidates = Vec::default();

    for (first_index, first) in pairs.iter().enumerate() {
        for second in pairs.iter().skip(first_index + 1) {
            if first.vehicle == second.vehicle {
                continue;
            }

            let mut candidate = plan.to_vec();
            candidate[first.vehicle][first.pickup_position] = plan[second.vehicle][second.pickup_position];
            candidate[first.vehicle][first.delivery_position] = plan[second.vehicle][second.delivery_position];
            candidate[second.vehicle][second.pickup_position] = plan[first.vehicle][first.pickup_position];
            candidate[second.vehicle][second.delivery_position] = plan[first.vehicle][first.delivery_position];
            candidates.push(candidate);
        }
    }

    candidates
}

fn cross(plan: &Plan) -> Vec<Plan> {
    let mut candidates = Vec::default();

    for first in 0..plan.len() {
        for second in first + 1..plan.len() {
            for first_cut in 0..=plan[first].len() {
                for second_cut in 0..=plan[second].len() {
                    if first_cut == plan[first].len() && second_cut == plan[second].len() {
                        continue;
                    }

                    let mut candidate = plan.to_vec();
                    let first_tail = candidate[first].split_off(first_cut);
                    let second_tail = candidate[second].split_off(second_cut);
                    candidate[first].extend(second_tail);
                    candidate[second].extend(first_tail);
                    candidates.push(candidate);
                }
            }
        }
    }

    candidates
}

fn two_opt(plan: &Plan) -> Vec<Plan> {
    let mut candidates = Vec::default();

    for (vehicle, visits) in plan.iter().enumerate() {
        for from in 0..visits.len() {
            for to in from + 1..visits.len() {
                let mut candidate = plan.to_vec();
                candidate[vehicle][from..=to].reverse();
                candidates.push(candidate);
            }
        }
    }

    candidates
}

fn or_opt(plan: &Plan) -> Vec<Plan> {
    let mut candidates = Vec::default();

    for (vehicle, visits) in plan.iter().enumerate() {
        for chain in 2..=3usize.min(visits.len()) {
            for position in 0..=visits.len() - chain {
                for insert in 0..=visits.len() - chain {
                    if insert == position {
                        continue;
                    }

                    let mut candidate = plan.to_vec();
                    let moved = candidate[vehicle].drain(position..position + chain).collect::<Vec<_>>();
                    for (offset, index) in moved.into_iter().enumerate() {
                        candidate[vehicle].insert(insert + offset, index);
                    }
                    candidates.push(candidate);
                }
            }
        }
    }

    candidates
}

fn relocate_expensive_chain(model: &RoutingModel, plan: &Plan) -> Vec<Plan> {
    let mut candidates = Vec::default();

    for (vehicle, visits) in plan.iter().enumerate() {
        if visits.len() < 2 {
            continue;
        }

        // the two most expensive arcs delimit the chain to move
        let mut arcs = Vec::with_capacity(visits.len() + 1);
        let mut previous = model.start(vehicle);
        for (position, &index) in visits.iter().enumerate() {
            arcs.push((model.arc_cost_for_vehicle(previous, index, vehicle as i64), position));
            previous = index;
        }
        arcs.push((model.arc_cost_for_vehicle(previous, model.end(vehicle), vehicle as i64), visits.len()));
        arcs.sort_by_key(|&(cost, position)| (std::cmp::Reverse(cost), position));

        let (first, second) = (arcs[0].1.min(arcs[1].1), arcs[0].1.max(arcs[1].1));
        if first == second || second - first > 4 {
            continue;
        }

        let chain = second - first;
        for to_vehicle in 0..plan.len() {
            if to_vehicle == vehicle {
                continue;
            }
            for insert in 0..=plan[to_vehicle].len() {
                let mut candidate = plan.to_vec();
                let moved = candidate[vehicle].drain(first..second).collect::<Vec<_>>();
                debug_assert!(moved.len() == chain);
                for (offset, index) in moved.into_iter().enumerate() {
                    candidate[to_vehicle].insert(insert + offset, index);
                }
                candidates.push(candidate);
            }
        }
    }

    candidates
}

/// A chained descent of two opt moves per route, judged on arc costs alone.
fn lin_kernighan(model: &RoutingModel, plan: &Plan) -> Vec<Plan> {
    let mut candidate = plan.to_vec();
    let mut changed = false;

    for vehicle in 0..candidate.len() {
        loop {
            let mut best: Option<(Cost, usize, usize)> = None;
            let visits = &candidate[vehicle];

            for from in 0..visits.len() {
                for to in from + 1..visits.len() {
                    let gain = two_opt_gain(model, vehicle, visits, from, to);
                    if gain > 0 && best.map_or(true, |(known, _, _)| gain > known) {
                        best = Some((gain, from, to));
                    }
                }
            }

            match best {
                Some((_, from, to)) => {
                    candidate[vehicle][from..=to].reverse();
                    changed = true;
                }
                None => break,
            }
        }
    }

    if changed {
        vec![candidate]
    } else {
        Vec::default()
    }
}

fn two_opt_gain(model: &RoutingModel, vehicle: usize, visits: &[usize], from: usize, to: usize) -> Cost {
    let vehicle_id = vehicle as i64;
    let before = if from == 0 { model.start(vehicle) } else { visits[from - 1] };
    let after = if to + 1 == visits.len() { model.end(vehicle) } else { visits[to + 1] };

    let removed = model.arc_cost_for_vehicle(before, visits[from], vehicle_id)
        + model.arc_cost_for_vehicle(visits[to], after, vehicle_id);
    let added = model.arc_cost_for_vehicle(before, visits[to], vehicle_id)
        + model.arc_cost_for_vehicle(visits[from], after, vehicle_id);

    removed - added
}

/// The largest route length optimized exactly.
const TSP_OPT_SIZE: usize = 10;

fn tsp_opt(model: &RoutingModel, plan: &Plan) -> Vec<Plan> {
    let mut candidates = Vec::default();

    for (vehicle, visits) in plan.iter().enumerate() {
        if visits.len() < 3 || visits.len() > TSP_OPT_SIZE {
            continue;
        }

        let optimal = held_karp(model, vehicle, visits);
        if optimal != *visits {
            let mut candidate = plan.to_vec();
            candidate[vehicle] = optimal;
            candidates.push(candidate);
        }
    }

    candidates
}

/// Exact reordering of one route by dynamic programming over subsets.
fn held_karp(model: &RoutingModel, vehicle: usize, visits: &[usize]) -> Vec<usize> {
    let n = visits.len();
    let vehicle_id = vehicle as i64;
    let start = model.start(vehicle);
    let end = model.end(vehicle);

    let mut cost = vec![vec![Cost::MAX / 2; n]; 1 << n];
    let mut parent = vec![vec![usize::MAX; n]; 1 << n];
    for last in 0..n {
        cost[1 << last][last] = model.arc_cost_for_vehicle(start, visits[last], vehicle_id);
    }

    for mask in 1..1usize << n {
        for last in 0..n {
            if mask & (1 << last) == 0 || cost[mask][last] >= Cost::MAX / 2 {
                continue;
            }
            for next in 0..n {
                if mask & (1 << next) != 0 {
                    continue;
                }
                let next_mask = mask | (1 << next);
                let candidate = cost[mask][last] + model.arc_cost_for_vehicle(visits[last], visits[next], vehicle_id);
                if candidate < cost[next_mask][next] {
                    cost[next_mask][next] = candidate;
                    parent[next_mask][next] = last;
                }
            }
        }
    }

    let full = (1usize << n) - 1;
    let mut last = (0..n)
        .min_by_key(|&last| cost[full][last] + model.arc_cost_for_vehicle(visits[last], end, vehicle_id))
        .unwrap();

    let mut order = Vec::with_capacity(n);
    let mut mask = full;
    loop {
        order.push(visits[last]);
        let previous = parent[mask][last];
        mask &= !(1 << last);
        if previous == usize::MAX {
            break;
        }
        last = previous;
    }
    order.reverse();
    order
}

fn make_active(model: &RoutingModel, plan: &Plan) -> Vec<Plan> {
    let mut candidates = Vec::default();

    for node in inactive_nodes(model, plan) {
        if !model.pickup_positions(node).is_empty() || !model.delivery_positions(node).is_empty() {
            continue;
        }
        for vehicle in 0..plan.len() {
            for insert in 0..=plan[vehicle].len() {
                let mut candidate = plan.to_vec();
                candidate[vehicle].insert(insert, node);
                candidates.push(candidate);
            }
        }
    }

    candidates
}

fn make_inactive(model: &RoutingModel, plan: &Plan) -> Vec<Plan> {
    let mut candidates = Vec::default();

    for (vehicle, visits) in plan.iter().enumerate() {
        for (position, &index) in visits.iter().enumerate() {
            if !droppable(model, index) {
                continue;
            }

            let mut candidate = plan.to_vec();
            candidate[vehicle].remove(position);
            candidates.push(candidate);
        }
    }

    candidates
}

fn make_chain_inactive(model: &RoutingModel, plan: &Plan) -> Vec<Plan> {
    let mut candidates = Vec::default();

    for (vehicle, visits) in plan.iter().enumerate() {
        for chain in 2..=3usize.min(visits.len()) {
            for position in 0..=visits.len() - chain {
                if visits[position..position + chain].iter().any(|&index| !droppable(model, index)) {
                    continue;
                }

                let mut candidate = plan.to_vec();
                candidate[vehicle].drain(position..position + chain);
                candidates.push(candidate);
            }
        }
    }

    candidates
}

fn swap_active(model: &RoutingModel, plan: &Plan) -> Vec<Plan> {
    let mut candidates = Vec::default();

    for node in inactive_nodes(model, plan) {
        for (vehicle, visits) in plan.iter().enumerate() {
            for (position, &index) in visits.iter().enumerate() {
                if !droppable(model, index) {
                    continue;
                }

                let mut candidate = plan.to_vec();
                candidate[vehicle][position] = node;
                candidates.push(candidate);
            }
        }
    }

    candidates
}

fn extended_swap_active(model: &RoutingModel, plan: &Plan) -> Vec<Plan> {
    let mut candidates = Vec::default();

    for node in inactive_nodes(model, plan) {
        for (vehicle, visits) in plan.iter().enumerate() {
            for (position, &index) in visits.iter().enumerate() {
                if !droppable(model, index) {
                    continue;
                }

                for to_vehicle in 0..plan.len() {
                    for insert in 0..=plan[to_vehicle].len() {
                        let mut candidate = plan.to_vec();
                        candidate[vehicle].remove(position);
                        let insert = if to_vehicle == vehicle && insert > position { insert - 1 } else { insert };
                        if insert > candidate[to_vehicle].len() {
                            continue;
                        }
                        candidate[to_vehicle].insert(insert, node);
                        candidates.push(candidate);
                    }
                }
            }
        }
    }

    candidates
}

fn node_pair_swap(model: &RoutingModel, plan: &Plan) -> Vec<Plan> {
    let inactive = inactive_nodes(model, plan);
    let mut candidates = Vec::default();

    for placed in placed_pairs(model, plan) {
        let pair = &model.pickup_delivery_pairs()[placed.pair];

        for &alternative in pair.pickups.iter().filter(|&&alternative| inactive.contains(&alternative)) {
            let mut candidate = plan.to_vec();
            candidate[placed.vehicle][placed.pickup_position] = alternative;
            candidates.push(candidate);
        }
        for &alternative in pair.deliveries.iter().filter(|&&alternative| inactive.contains(&alternative)) {
            let mut candidate = plan.to_vec();
            candidate[placed.vehicle][placed.delivery_position] = alternative;
            candidates.push(candidate);
        }
    }

    candidates
}

fn exchange_relocate_pair(model: &RoutingModel, plan: &Plan) -> Vec<Plan> {
    let mut candidates = Vec::default();

    for placed in placed_pairs(model, plan) {
        let pickup = plan[placed.vehicle][placed.pickup_position];
        let delivery = plan[placed.vehicle][placed.delivery_position];

        for (other_vehicle, visits) in plan.iter().enumerate() {
            if other_vehicle == placed.vehicle {
                continue;
            }

            for (position, &node) in visits.iter().enumerate() {
                if !model.pickup_positions(node).is_empty() || !model.delivery_positions(node).is_empty() {
                    continue;
                }

                // the pair takes the place of the node, which moves back to
                // the pickup's old position
                let mut candidate = plan.to_vec();
                candidate[placed.vehicle].remove(placed.delivery_position);
                candidate[placed.vehicle].remove(placed.pickup_position);
                candidate[other_vehicle].splice(position..position + 1, [pickup, delivery]);
                candidate[placed.vehicle].insert(placed.pickup_position, node);
                candidates.push(candidate);
            }
        }
    }

    candidates
}

fn path_lns(model: &RoutingModel, plan: &Plan, rng: &mut StdRng) -> Vec<Plan> {
    let used = (0..plan.len()).filter(|&vehicle| !plan[vehicle].is_empty()).collect::<Vec<_>>();
    if used.is_empty() {
        return Vec::default();
    }

    let mut candidates = Vec::default();
    let first = used[rng.gen_range(0..used.len())];
    let second = used[rng.gen_range(0..used.len())];

    for destroyed in [vec![first], vec![first, second]] {
        let mut skeleton = plan.to_vec();
        let mut removed = Vec::default();
        for &vehicle in &destroyed {
            removed.extend(std::mem::take(&mut skeleton[vehicle]));
        }
        removed.sort();
        removed.dedup();

        candidates.push(greedy_reinsert(model, skeleton, &removed));
    }

    candidates
}

fn full_path_lns(model: &RoutingModel, plan: &Plan) -> Vec<Plan> {
    let mut candidates = Vec::default();

    for vehicle in 0..plan.len() {
        if plan[vehicle].is_empty() {
            continue;
        }

        let mut skeleton = plan.to_vec();
        let mut removed = std::mem::take(&mut skeleton[vehicle]);
        removed.extend(inactive_nodes(model, plan));

        candidates.push(greedy_reinsert(model, skeleton, &removed));
    }

    candidates
}

fn tsp_lns(model: &RoutingModel, plan: &Plan, rng: &mut StdRng) -> Vec<Plan> {
    let used = (0..plan.len()).filter(|&vehicle| !plan[vehicle].is_empty()).collect::<Vec<_>>();
    if used.is_empty() {
        return Vec::default();
    }

    let vehicle = used[rng.gen_range(0..used.len())];
    let augmented = greedy_reinsert(model, plan.to_vec(), &inactive_nodes(model, plan));

    if augmented[vehicle].len() < 3 || augmented[vehicle].len() > TSP_OPT_SIZE {
        return Vec::default();
    }

    let mut candidate = augmented;
    let visits = candidate[vehicle].clone();
    candidate[vehicle] = held_karp(model, vehicle, &visits);
    vec![candidate]
}

fn inactive_lns(model: &RoutingModel, plan: &Plan, rng: &mut StdRng) -> Vec<Plan> {
    let inactive = inactive_nodes(model, plan);
    if inactive.is_empty() {
        return Vec::default();
    }

    let mut skeleton = plan.to_vec();
    let used = (0..plan.len()).filter(|&vehicle| !plan[vehicle].is_empty()).collect::<Vec<_>>();
    let mut removed = inactive;

    if let Some(&vehicle) = used.get(rng.gen_range(0..used.len().max(1)).min(used.len().saturating_sub(1))) {
        let visits = &mut skeleton[vehicle];
        let chain = visits.len().min(1 + rng.gen_range(0..3));
        let position = rng.gen_range(0..=visits.len() - chain);
        removed.extend(visits.drain(position..position + chain));
    }

    removed.sort();
    removed.dedup();
    vec![greedy_reinsert(model, skeleton, &removed)]
}

/// Inserts the removed indices back at their cheapest arc cost positions,
/// pairs as one unit; indices without a feasible spot stay inactive.
fn greedy_reinsert(model: &RoutingModel, mut plan: Plan, removed: &[usize]) -> Plan {
    let mut handled = vec![false; model.size()];

    for &node in removed {
        if handled[node] {
            continue;
        }
        handled[node] = true;

        let delivery = model.pickup_positions(node).first().map(|&(pair, _)| {
            let pair = &model.pickup_delivery_pairs()[pair];
            pair.deliveries[0]
        });
        if model.delivery_positions(node).first().is_some() && delivery.is_none() {
            // deliveries ride along with their pickups
            continue;
        }

        let mut best: Option<(Cost, usize, usize)> = None;
        for vehicle in 0..plan.len() {
            let vehicle_id = vehicle as i64;
            let mut sequence = vec![model.start(vehicle)];
            sequence.extend(plan[vehicle].iter().copied());
            sequence.push(model.end(vehicle));

            for position in 0..sequence.len() - 1 {
                let (before, after) = (sequence[position], sequence[position + 1]);
                let cost = model.arc_cost_for_vehicle(before, node, vehicle_id)
                    + model.arc_cost_for_vehicle(node, after, vehicle_id)
                    - model.arc_cost_for_vehicle(before, after, vehicle_id);

                if best.map_or(true, |(known, _, _)| cost < known) {
                    best = Some((cost, vehicle, position));
                }
            }
        }

        if let Some((_, vehicle, position)) = best {
            plan[vehicle].insert(position, node);
            if let Some(delivery) = delivery {
                handled[delivery] = true;
                plan[vehicle].insert(position + 1, delivery);
            }
        }
    }

    plan
}
