//! Appraisal of routes and whole plans: feasibility against dimensions,
//! breaks, pickup and delivery coupling, and the full cost recomputation.

use super::{PickupAndDeliveryPolicy, RoutingModel};
use crate::lp::{CumulOptimizer, RouteCumulProblem};
use crate::models::common::{cap_add, cap_mul, Cost, Value};
use crate::scheduling::{DisjunctivePropagator, Tasks};
use hashbrown::HashMap;

/// A feasibility verdict of one route together with its cost and the chosen
/// cumuls of every dimension.
#[derive(Clone, Debug, Default)]
pub(crate) struct RouteAppraisal {
    /// The route cost: arcs, fixed cost, cumul dependent costs and the
    /// amortized term.
    pub cost: Cost,
    /// Chosen cumuls per dimension and route position, terminals included.
    pub cumuls: Vec<Vec<Value>>,
}

/// A feasibility verdict of a whole plan.
#[derive(Clone, Debug, Default)]
pub(crate) struct PlanAppraisal {
    /// The total objective: route costs plus disjunction penalties and
    /// global span costs.
    pub cost: Cost,
    /// Per vehicle route appraisals.
    pub routes: Vec<RouteAppraisal>,
}

/// Checks one route of a vehicle and computes its cost, or returns `None`
/// when the route is infeasible. `visits` holds interior indices only.
pub(crate) fn appraise_route(
    model: &RoutingModel,
    vehicle: usize,
    visits: &[usize],
    optimizer: &mut CumulOptimizer,
) -> Option<RouteAppraisal> {
    let manager = model.manager();
    let mut sequence = Vec::with_capacity(visits.len() + 2);
    sequence.push(manager.start(vehicle));
    sequence.extend_from_slice(visits);
    sequence.push(manager.end(vehicle));

    if !visits.iter().all(|&index| model.is_vehicle_allowed_for_index(vehicle, index)) {
        return None;
    }
    if !check_visit_types(model, visits) {
        return None;
    }
    if !check_pickup_delivery_order(model, vehicle, visits) {
        return None;
    }

    let mut appraisal = RouteAppraisal::default();

    // arc costs, fixed cost included on the first arc of a used route
    for arc in sequence.windows(2) {
        appraisal.cost = cap_add(appraisal.cost, model.arc_cost_for_vehicle(arc[0], arc[1], vehicle as i64));
    }

    for dimension in model.dimensions() {
        let base_cumuls = dimension
            .base_dimension()
            .filter(|&base| base != dimension.index())
            .map(|base| appraisal.cumuls[base].clone());

        let windows =
            sequence.iter().map(|&index| dimension.vehicle_cumul_window(vehicle, index)).collect::<Vec<_>>();

        // forward earliest pass, also the base value source for self based
        // state dependent transits
        let mut earliest = vec![0; sequence.len()];
        earliest[0] = windows[0].min;
        let mut transits = Vec::with_capacity(sequence.len() - 1);
        for position in 0..sequence.len() - 1 {
            let base_value = base_cumuls.as_ref().map_or(earliest[position], |cumuls| cumuls[position]);
            let transit = dimension.transit(
                model.registry(),
                vehicle,
                sequence[position],
                sequence[position + 1],
                base_value,
            );
            transits.push(transit);

            let arrived = cap_add(earliest[position], transit);
            let next = arrived.max(windows[position + 1].min);
            if next > windows[position + 1].max || next > cap_add(arrived, dimension.slack_max()) {
                return None;
            }
            earliest[position + 1] = next;
        }

        // minimal span check: delay the departure as far as the windows allow
        let span_upper_bound = dimension.vehicle_span_upper_bound(vehicle);
        if span_upper_bound < crate::models::common::MAX_VALUE && !visits.is_empty() {
            let mut latest = windows[sequence.len() - 1].max;
            for position in (0..sequence.len() - 1).rev() {
                latest = latest.saturating_sub(transits[position]).min(windows[position].max);
            }
            let start = latest.clamp(windows[0].min, windows[0].max);

            let span = if start >= crate::models::common::MAX_VALUE / 8 {
                // every window on the route is unbounded above: no waiting
                transits.iter().fold(0, |span, &transit| cap_add(span, transit))
            } else {
                let mut arrival = start;
                for position in 0..sequence.len() - 1 {
                    arrival = cap_add(arrival, transits[position]).max(windows[position + 1].min);
                }
                cap_add(arrival, -start)
            };

            if span > span_upper_bound {
                return None;
            }
        }

        let has_breaks = !dimension.vehicle_break_intervals(vehicle).is_empty();
        let cumuls = if has_breaks {
            schedule_with_breaks(model, dimension.index(), vehicle, &sequence, &windows, &transits)?
        } else if dimension.has_cumul_costs() {
            let problem = RouteCumulProblem {
                windows: windows.clone(),
                transits: transits.clone(),
                slack_maxes: vec![dimension.slack_max(); transits.len()],
                cost_terms: sequence.iter().map(|&index| dimension.cumul_cost_terms(index)).collect(),
                span_cost_coefficient: dimension.vehicle_span_cost_coefficient(vehicle),
            };
            let schedule = optimizer.optimize_route(vehicle, &problem)?;

            if cap_add(*schedule.cumuls.last().unwrap(), -schedule.cumuls[0]) > span_upper_bound {
                // the cost optimum stretches the route too far: fall back to
                // the minimal span schedule verified above
                let mut latest = windows[sequence.len() - 1].max;
                for position in (0..sequence.len() - 1).rev() {
                    latest = latest.saturating_sub(transits[position]).min(windows[position].max);
                }
                let start = latest.clamp(windows[0].min, windows[0].max);
                let mut cumuls = vec![start; sequence.len()];
                for position in 0..sequence.len() - 1 {
                    cumuls[position + 1] = cap_add(cumuls[position], transits[position]).max(windows[position + 1].min);
                }

                appraisal.cost =
                    cap_add(appraisal.cost, cumul_costs_at(model, dimension.index(), vehicle, &sequence, &cumuls));
                appraisal.cumuls.push(cumuls);
            } else {
                appraisal.cost = cap_add(appraisal.cost, schedule.cost);
                appraisal.cumuls.push(schedule.cumuls);
            }
            continue;
        } else {
            earliest
        };

        if has_breaks && dimension.has_cumul_costs() {
            appraisal.cost = cap_add(appraisal.cost, cumul_costs_at(model, dimension.index(), vehicle, &sequence, &cumuls));
        }
        if cap_add(cumuls[sequence.len() - 1], -cumuls[0]) > span_upper_bound {
            return None;
        }

        appraisal.cumuls.push(cumuls);
    }

    if !check_pickup_delivery_limits(model, &sequence, &appraisal) {
        return None;
    }

    // amortized vehicle cost
    if !visits.is_empty() {
        let length = visits.len() as Cost;
        let linear = model.amortized_linear_cost_factors()[vehicle];
        let quadratic = model.amortized_quadratic_cost_factors()[vehicle];
        if linear != 0 || quadratic != 0 {
            appraisal.cost = cap_add(appraisal.cost, linear - cap_mul(quadratic, length * length));
        }
    }

    Some(appraisal)
}

/// Checks a whole plan and recomputes its objective from scratch: the sum of
/// route costs, disjunction penalties and global span costs.
pub(crate) fn evaluate_plan(
    model: &RoutingModel,
    routes: &[Vec<usize>],
    optimizer: &mut CumulOptimizer,
) -> Option<PlanAppraisal> {
    let mut plan = PlanAppraisal::default();

    let mut active = vec![false; model.size()];
    let mut vehicle_of: Vec<i64> = vec![-1; model.size()];
    for (vehicle, visits) in routes.iter().enumerate() {
        for &index in visits {
            if active[index] {
                return None;
            }
            active[index] = true;
            vehicle_of[index] = vehicle as i64;
        }

        let appraisal = appraise_route(model, vehicle, visits, optimizer)?;
        plan.cost = cap_add(plan.cost, appraisal.cost);
        plan.routes.push(appraisal);
    }

    // indices outside any disjunction must be active
    let inactive_allowed = |index: usize| !model.disjunctions_of_index(index).is_empty();
    for index in 0..model.size() {
        if !model.is_start(index) && !active[index] && !inactive_allowed(index) {
            return None;
        }
    }

    for disjunction in model.disjunctions() {
        let active_count = disjunction.indices.iter().filter(|&&index| active[index]).count();
        if active_count > disjunction.max_cardinality {
            return None;
        }
        let missing = (disjunction.max_cardinality - active_count) as Cost;
        if missing > 0 {
            if disjunction.penalty < 0 {
                return None;
            }
            plan.cost = cap_add(plan.cost, cap_mul(disjunction.penalty, missing));
        }
    }

    // every extra vehicle serving a same vehicle group costs
    for group in model.soft_same_vehicle_constraints() {
        let mut vehicles = group
            .indices
            .iter()
            .map(|&index| vehicle_of[index])
            .filter(|&vehicle| vehicle >= 0)
            .collect::<Vec<_>>();
        vehicles.sort_unstable();
        vehicles.dedup();

        if vehicles.len() > 1 {
            plan.cost = cap_add(plan.cost, cap_mul(group.cost, vehicles.len() as Cost - 1));
        }
    }

    for dimension in model.dimensions() {
        let coefficient = dimension.global_span_cost_coefficient();
        if coefficient == 0 {
            continue;
        }

        let spans = routes
            .iter()
            .enumerate()
            .filter(|(_, visits)| !visits.is_empty())
            .map(|(vehicle, _)| {
                let cumuls = &plan.routes[vehicle].cumuls[dimension.index()];
                (cumuls[0], cumuls[cumuls.len() - 1])
            })
            .collect::<Vec<_>>();

        if let (Some(min_start), Some(max_end)) =
            (spans.iter().map(|&(start, _)| start).min(), spans.iter().map(|&(_, end)| end).max())
        {
            plan.cost = cap_add(plan.cost, cap_mul(coefficient, cap_add(max_end, -min_start)));
        }
    }

    Some(plan)
}

/// Forward feasibility of a possibly partial route for one dimension:
/// windows, capacity and slack bounds hold on the prefix.
pub(crate) fn check_dimension_prefix(
    model: &RoutingModel,
    dimension: usize,
    vehicle: usize,
    visits: &[usize],
    complete: bool,
) -> bool {
    let sequence = prefix_sequence(model, vehicle, visits, complete);

    let base_earliest = {
        let base = model.dimensions()[dimension].base_dimension();
        match base.filter(|&base| base != dimension) {
            Some(base) => forward_earliest(model, base, vehicle, &sequence, None),
            None => None,
        }
    };

    forward_earliest(model, dimension, vehicle, &sequence, base_earliest.as_deref()).is_some()
}

/// Break schedulability of a possibly partial route.
pub(crate) fn check_breaks_prefix(
    model: &RoutingModel,
    dimension: usize,
    vehicle: usize,
    visits: &[usize],
    complete: bool,
) -> bool {
    if model.dimensions()[dimension].vehicle_break_intervals(vehicle).is_empty() {
        return true;
    }

    let sequence = prefix_sequence(model, vehicle, visits, complete);
    let holder = &model.dimensions()[dimension];
    let windows = sequence.iter().map(|&index| holder.vehicle_cumul_window(vehicle, index)).collect::<Vec<_>>();

    let Some(earliest) = forward_earliest(model, dimension, vehicle, &sequence, None) else {
        return false;
    };
    let transits = (0..sequence.len() - 1)
        .map(|position| {
            holder.transit(model.registry(), vehicle, sequence[position], sequence[position + 1], earliest[position])
        })
        .collect::<Vec<_>>();

    schedule_with_breaks(model, dimension, vehicle, &sequence, &windows, &transits).is_some()
}

fn prefix_sequence(model: &RoutingModel, vehicle: usize, visits: &[usize], complete: bool) -> Vec<usize> {
    let mut sequence = Vec::with_capacity(visits.len() + 2);
    sequence.push(model.start(vehicle));
    sequence.extend_from_slice(visits);
    if complete {
        sequence.push(model.end(vehicle));
    }
    sequence
}

fn forward_earliest(
    model: &RoutingModel,
    dimension: usize,
    vehicle: usize,
    sequence: &[usize],
    base_cumuls: Option<&[Value]>,
) -> Option<Vec<Value>> {
    let dimension = &model.dimensions()[dimension];
    let windows = sequence.iter().map(|&index| dimension.vehicle_cumul_window(vehicle, index)).collect::<Vec<_>>();

    let mut earliest = vec![0; sequence.len()];
    earliest[0] = windows[0].min;
    for position in 0..sequence.len() - 1 {
        let base_value = base_cumuls.map_or(earliest[position], |cumuls| cumuls[position]);
        let transit =
            dimension.transit(model.registry(), vehicle, sequence[position], sequence[position + 1], base_value);

        let arrived = cap_add(earliest[position], transit);
        let next = arrived.max(windows[position + 1].min);
        if next > windows[position + 1].max || next > cap_add(arrived, dimension.slack_max()) {
            return None;
        }
        earliest[position + 1] = next;
    }

    Some(earliest)
}

pub(crate) fn check_visit_types(model: &RoutingModel, visits: &[usize]) -> bool {
    let types = visits.iter().map(|&index| model.visit_type(index)).filter(|&t| t >= 0).collect::<Vec<_>>();

    types.iter().enumerate().all(|(position, &first)| {
        types[position + 1..].iter().all(|&second| !model.are_types_incompatible(first, second))
    })
}

fn check_pickup_delivery_order(model: &RoutingModel, vehicle: usize, visits: &[usize]) -> bool {
    let policy = model.pickup_and_delivery_policy_of_vehicle(vehicle);
    let on_route = visits.iter().copied().collect::<hashbrown::HashSet<_>>();

    let mut open: Vec<usize> = Vec::default();
    for &index in visits {
        for &(pair, _) in model.pickup_positions(index) {
            if model.pickup_delivery_pairs()[pair].deliveries.iter().any(|&delivery| on_route.contains(&delivery)) {
                open.push(pair);
            } else {
                // the delivery sits on another vehicle or is unperformed
                return false;
            }
        }

        for &(pair, _) in model.delivery_positions(index) {
            match policy {
                PickupAndDeliveryPolicy::Any => {
                    match open.iter().rposition(|&candidate| candidate == pair) {
                        Some(position) => {
                            open.remove(position);
                        }
                        None => return false,
                    }
                }
                PickupAndDeliveryPolicy::Lifo => match open.last() {
                    Some(&top) if top == pair => {
                        open.pop();
                    }
                    _ => return false,
                },
                PickupAndDeliveryPolicy::Fifo => {
                    if open.first() == Some(&pair) {
                        open.remove(0);
                    } else {
                        return false;
                    }
                }
            }
        }
    }

    open.is_empty()
}

fn check_pickup_delivery_limits(model: &RoutingModel, sequence: &[usize], appraisal: &RouteAppraisal) -> bool {
    let mut pickup_at: HashMap<usize, (usize, usize)> = HashMap::default();
    sequence.iter().enumerate().for_each(|(position, &index)| {
        model.pickup_positions(index).iter().for_each(|&(pair, alternative)| {
            pickup_at.insert(pair, (position, alternative));
        });
    });

    sequence.iter().enumerate().all(|(position, &index)| {
        model.delivery_positions(index).iter().all(|&(pair, delivery_alternative)| {
            let Some(&(pickup_position, pickup_alternative)) = pickup_at.get(&pair) else {
                return true;
            };

            model.dimensions().iter().all(|dimension| {
                match dimension.pickup_to_delivery_limit(pair, pickup_alternative, delivery_alternative) {
                    Some(limit) => {
                        let cumuls = &appraisal.cumuls[dimension.index()];
                        cumuls[position] - cumuls[pickup_position] <= limit
                    }
                    None => true,
                }
            })
        })
    })
}

/// Schedules one route around the breaks of a vehicle: visits and travels
/// form the task chain, breaks the free tasks; propagated visit starts become
/// the cumuls.
fn schedule_with_breaks(
    model: &RoutingModel,
    dimension: usize,
    vehicle: usize,
    sequence: &[usize],
    windows: &[crate::models::common::ValueRange],
    transits: &[Value],
) -> Option<Vec<Value>> {
    let dimension = &model.dimensions()[dimension];

    let mut tasks = Tasks::default();
    let mut visit_tasks = Vec::with_capacity(sequence.len());
    for (position, &index) in sequence.iter().enumerate() {
        let visit_transit = dimension.vehicle_visit_transit(vehicle, index);
        visit_tasks.push(tasks.push(
            windows[position].min,
            visit_transit,
            cap_add(windows[position].max, visit_transit),
            false,
        ));

        if position < transits.len() {
            let travel = (transits[position] - visit_transit).max(0);
            tasks.push(windows[position].min, travel, windows[position + 1].max, true);
        }
    }
    tasks.num_chain_tasks = tasks.len();

    for interval in dimension.vehicle_break_intervals(vehicle) {
        tasks.push(interval.start_min, interval.duration, cap_add(interval.start_max, interval.duration), false);
    }

    if !DisjunctivePropagator::default().propagate(&mut tasks) {
        return None;
    }

    Some(visit_tasks.iter().map(|&task| tasks.start_min[task]).collect())
}

fn cumul_costs_at(model: &RoutingModel, dimension: usize, vehicle: usize, sequence: &[usize], cumuls: &[Value]) -> Cost {
    let dimension = &model.dimensions()[dimension];
    let mut cost = 0;

    for (position, &index) in sequence.iter().enumerate() {
        let cumul = cumuls[position];
        if let Some(bound) = dimension.cumul_soft_upper_bound(index) {
            cost = cap_add(cost, cap_mul(bound.coefficient, (cumul - bound.bound).max(0)));
        }
        if let Some(bound) = dimension.cumul_soft_lower_bound(index) {
            cost = cap_add(cost, cap_mul(bound.coefficient, (bound.bound - cumul).max(0)));
        }
        if let Some(piecewise) = dimension.cumul_piecewise_linear_cost(index) {
            cost = cap_add(cost, piecewise.value(cumul));
        }
    }

    let span = cap_add(cumuls[cumuls.len() - 1], -cumuls[0]);
    cap_add(cost, cap_mul(dimension.vehicle_span_cost_coefficient(vehicle), span))
}
