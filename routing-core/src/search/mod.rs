//! The search orchestrator: parameters and limits, the local search loop
//! over neighborhood operators, metaheuristics and the solution finalizer.

#[cfg(test)]
#[path = "../../tests/unit/search/search_test.rs"]
mod search_test;

mod metaheuristics;
mod operators;

pub use self::metaheuristics::Metaheuristic;
pub use self::operators::RoutingLocalSearchOperator;

use self::metaheuristics::MetaheuristicPolicy;
use self::operators::create_operators;
use crate::construction::{build_first_solution, FirstSolutionStrategy};
use crate::filters::create_default_filters;
use crate::lp::CumulOptimizer;
use crate::model::{evaluate_plan, PlanAppraisal, RoutingModel, RoutingSearchStatus};
use crate::models::assignment::{Assignment, Delta};
use crate::models::common::Cost;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rosomaxa::utils::{Quota as _, Timer};
use std::time::Duration;

/// Parameters steering the search attached to a model.
#[derive(Clone, Debug)]
pub struct SearchParameters {
    /// The heuristic building the first solution.
    pub first_solution_strategy: FirstSolutionStrategy,
    /// The metaheuristic guiding local search out of local minima.
    pub metaheuristic: Metaheuristic,
    /// A wall clock limit for the whole solve.
    pub time_limit: Option<Duration>,
    /// Stops after this many improving solutions.
    pub solution_limit: Option<usize>,
    /// Stops after this many explored neighbors.
    pub branch_limit: Option<usize>,
    /// Stops after this many rejected or worsening neighbors.
    pub failure_limit: Option<usize>,
    /// Disables large neighborhood search operators.
    pub no_lns: bool,
    /// Disables exact TSP based operators.
    pub no_tsp: bool,
    /// The share of nearest neighbors considered per insertion.
    pub cheapest_insertion_neighbors_ratio: f64,
    /// The share of vehicles seeded with a farthest node first.
    pub cheapest_insertion_farthest_seeds_ratio: f64,
    /// The share of cheapest neighbor arcs kept per node in savings.
    pub savings_neighbors_ratio: f64,
    /// The coefficient applied to the connecting arc inside a saving.
    pub savings_arc_coefficient: f64,
    /// The penalty weight of guided local search.
    pub guided_local_search_lambda: f64,
    /// The amount of recent solutions tabu search refuses to revisit.
    pub tabu_tenure: usize,
    /// The seed of the search random generator: identical parameters and
    /// seed reproduce the run bit for bit.
    pub seed: u64,
    /// Logs improving solutions through the environment logger.
    pub log_search: bool,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            first_solution_strategy: FirstSolutionStrategy::default(),
            metaheuristic: Metaheuristic::default(),
            time_limit: None,
            solution_limit: None,
            branch_limit: None,
            failure_limit: None,
            no_lns: false,
            no_tsp: false,
            cheapest_insertion_neighbors_ratio: 1.,
            cheapest_insertion_farthest_seeds_ratio: 0.,
            savings_neighbors_ratio: 1.,
            savings_arc_coefficient: 1.,
            guided_local_search_lambda: 0.1,
            tabu_tenure: 10,
            seed: 0,
            log_search: false,
        }
    }
}

/// The result handed back to the model after a solve.
pub(crate) struct SearchOutcome {
    pub best: Option<Assignment>,
    pub status: RoutingSearchStatus,
}

/// Counters and limits consulted at every neighbor expansion.
struct SearchLimits<'a> {
    parameters: &'a SearchParameters,
    timer: Timer,
    solutions: usize,
    branches: usize,
    failures: usize,
    time_exceeded: bool,
}

impl<'a> SearchLimits<'a> {
    fn new(parameters: &'a SearchParameters) -> Self {
        Self { parameters, timer: Timer::start(), solutions: 0, branches: 0, failures: 0, time_exceeded: false }
    }

    /// Returns true when any limit tripped; time trips are remembered to
    /// report `FailTimeout` when nothing was found.
    fn is_reached(&mut self, model: &RoutingModel) -> bool {
        if let Some(limit) = self.parameters.time_limit {
            if self.timer.elapsed_millis() >= limit.as_millis() {
                self.time_exceeded = true;
                return true;
            }
        }
        if model.environment().quota.as_ref().is_some_and(|quota| quota.is_reached()) {
            self.time_exceeded = true;
            return true;
        }

        self.parameters.solution_limit.is_some_and(|limit| self.solutions >= limit)
            || self.parameters.branch_limit.is_some_and(|limit| self.branches >= limit)
            || self.parameters.failure_limit.is_some_and(|limit| self.failures >= limit)
    }
}

/// Runs the whole pipeline: first solution, local search under a
/// metaheuristic, finalization of every improving solution.
pub(crate) fn solve_model(
    model: &RoutingModel,
    parameters: &SearchParameters,
    initial: Option<&Assignment>,
) -> SearchOutcome {
    let mut limits = SearchLimits::new(parameters);
    let mut filters = create_default_filters(model);
    let mut optimizer = CumulOptimizer::new(model.num_vehicles());
    let mut rng = StdRng::seed_from_u64(parameters.seed);

    let first = match initial {
        Some(assignment) => Some(assignment.clone()),
        None => build_first_solution(model, parameters, &mut filters),
    };

    let Some(first) = first else {
        // latch the time flag so the status distinguishes a timeout
        let _ = limits.is_reached(model);
        return SearchOutcome { best: None, status: fail_status(&limits) };
    };
    let Ok(mut routes) = model.assignment_to_routes(&first) else {
        return SearchOutcome { best: None, status: RoutingSearchStatus::Fail };
    };
    let Some(appraisal) = evaluate_plan(model, &routes, &mut optimizer) else {
        return SearchOutcome { best: None, status: fail_status(&limits) };
    };

    let mut committed = match model.routes_to_assignment(&routes) {
        Ok(assignment) => assignment,
        Err(_) => return SearchOutcome { best: None, status: RoutingSearchStatus::Fail },
    };
    filters.iter_mut().for_each(|filter| filter.synchronize(model, &committed));

    let mut current_cost = appraisal.cost;
    let mut best_cost = appraisal.cost;
    let mut best = finalize_solution(model, &routes, &appraisal);
    limits.solutions += 1;
    log_improvement(model, parameters, &limits, best_cost);

    let operators = create_operators(parameters);
    let mut policy = MetaheuristicPolicy::new(parameters, model);

    'search: loop {
        if limits.is_reached(model) {
            break;
        }

        let mut moved = false;
        for operator in &operators {
            for candidate in operator.neighbors(model, &routes, &mut rng) {
                if limits.is_reached(model) {
                    break 'search;
                }
                limits.branches += 1;

                let delta = plan_delta(model, &committed, &candidate);
                if delta.is_empty() {
                    continue;
                }
                if !filters.iter_mut().all(|filter| filter.accept(model, &committed, &delta)) {
                    limits.failures += 1;
                    continue;
                }
                let Some(appraisal) = evaluate_plan(model, &candidate, &mut optimizer) else {
                    limits.failures += 1;
                    continue;
                };

                let accepted = policy.accept(
                    model,
                    &candidate,
                    appraisal.cost,
                    current_cost,
                    best_cost,
                    &mut rng,
                );
                if !accepted {
                    limits.failures += 1;
                    continue;
                }

                routes = candidate;
                current_cost = appraisal.cost;
                committed.merge(&delta);
                filters.iter_mut().for_each(|filter| filter.synchronize(model, &committed));

                if appraisal.cost < best_cost {
                    best_cost = appraisal.cost;
                    best = finalize_solution(model, &routes, &appraisal);
                    limits.solutions += 1;
                    log_improvement(model, parameters, &limits, best_cost);
                }

                moved = true;
                break;
            }
            if moved {
                break;
            }
        }

        if !moved && !policy.escape_local_minimum(model, &routes, current_cost) {
            break;
        }
    }

    SearchOutcome { best: Some(best), status: RoutingSearchStatus::Success }
}

fn fail_status(limits: &SearchLimits<'_>) -> RoutingSearchStatus {
    if limits.time_exceeded {
        RoutingSearchStatus::FailTimeout
    } else {
        RoutingSearchStatus::Fail
    }
}

/// Builds the delta turning the committed assignment into the candidate
/// plan: changed successor, vehicle and active variables only.
fn plan_delta(model: &RoutingModel, committed: &Assignment, candidate: &[Vec<usize>]) -> Delta {
    let mut delta = Delta::default();
    let mut next_of = vec![None; model.size()];
    let mut vehicle_of: Vec<i64> = vec![-1; model.size()];

    for (vehicle, visits) in candidate.iter().enumerate() {
        let mut previous = model.start(vehicle);
        vehicle_of[previous] = vehicle as i64;
        for &index in visits {
            next_of[previous] = Some(index);
            vehicle_of[index] = vehicle as i64;
            previous = index;
        }
        next_of[previous] = Some(model.end(vehicle));
    }

    for index in 0..model.size() {
        let next = next_of[index].unwrap_or(index) as i64;
        let vehicle = vehicle_of[index];
        let active = i64::from(next as usize != index || model.is_start(index));

        if committed.value(model.next_var(index)) != Some(next) {
            delta.set(model.next_var(index), next);
        }
        if committed.value(model.vehicle_var(index)) != Some(vehicle) {
            delta.set(model.vehicle_var(index), vehicle);
        }
        if committed.value(model.active_var(index)) != Some(active) {
            delta.set(model.active_var(index), active);
        }
    }

    delta
}

/// Builds the solution assignment of an improving plan: path variables, the
/// optimal cumuls the appraisal already carries, and the finalizer targets.
fn finalize_solution(model: &RoutingModel, routes: &[Vec<usize>], appraisal: &PlanAppraisal) -> Assignment {
    let mut assignment = model.routes_to_assignment(routes).expect("appraised routes are well formed");

    for (vehicle, visits) in routes.iter().enumerate() {
        let mut sequence = Vec::with_capacity(visits.len() + 2);
        sequence.push(model.start(vehicle));
        sequence.extend_from_slice(visits);
        sequence.push(model.end(vehicle));

        for dimension in model.dimensions() {
            let cumuls = &appraisal.routes[vehicle].cumuls[dimension.index()];
            for (position, &index) in sequence.iter().enumerate() {
                assignment.set(dimension.cumul_var(index), cumuls[position]);
                if position + 1 < sequence.len() {
                    let transit = dimension.transit(model.registry(), vehicle, index, sequence[position + 1], cumuls[position]);
                    assignment.set(dimension.transit_var(index), transit);
                    assignment.set(dimension.slack_var(index), cumuls[position + 1] - cumuls[position] - transit);
                }
            }
        }
    }

    // variables the user asked to pin to their extreme bound
    for &variable in model.finalizer_minimized_variables() {
        if !assignment.is_bound(variable) {
            assignment.set(variable, model.variable_domain(variable).min);
        }
    }
    for &variable in model.finalizer_maximized_variables() {
        if !assignment.is_bound(variable) {
            assignment.set(variable, model.variable_domain(variable).max);
        }
    }

    assignment.set_objective(appraisal.cost);
    assignment
}

fn log_improvement(model: &RoutingModel, parameters: &SearchParameters, limits: &SearchLimits<'_>, cost: Cost) {
    if parameters.log_search {
        (model.environment().logger)(&format!(
            "solution #{} with cost {} found after {}ms, {} branches, {} failures",
            limits.solutions,
            cost,
            limits.timer.elapsed_millis(),
            limits.branches,
            limits.failures
        ));
    }
}
