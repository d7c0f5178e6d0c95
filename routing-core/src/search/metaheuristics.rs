//! Metaheuristics supervising the local search: when to accept a worsening
//! neighbor and how to escape a local minimum.

#[cfg(test)]
#[path = "../../tests/unit/search/metaheuristics_test.rs"]
mod metaheuristics_test;

use super::SearchParameters;
use crate::model::RoutingModel;
use crate::models::common::{cap_add, Cost};
use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::Rng;
use rustc_hash::FxHasher;
use std::collections::VecDeque;
use std::hash::Hasher;

/// Escapes of a local minimum tolerated without any improvement before the
/// search gives up, in the absence of user limits.
const MAX_STALE_ESCAPES: usize = 1000;

/// Selects the policy driving the search out of local minima.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Metaheuristic {
    /// Accept improving neighbors only and stop in the first local minimum.
    #[default]
    GreedyDescent,
    /// Penalize frequent expensive arcs and judge neighbors on the
    /// penalty augmented objective.
    GuidedLocalSearch,
    /// Accept worsening neighbors with a temperature driven probability.
    SimulatedAnnealing,
    /// Refuse recently visited solutions, keep moving otherwise.
    TabuSearch,
    /// Refuse recently seen objective values, keep moving otherwise.
    ObjectiveTabu,
}

/// The stateful side of a [`Metaheuristic`].
pub(crate) struct MetaheuristicPolicy {
    kind: Metaheuristic,
    lambda: f64,
    penalties: HashMap<(usize, usize), Cost>,
    current_penalty: Cost,
    temperature: f64,
    tabu: VecDeque<u64>,
    objective_tabu: VecDeque<Cost>,
    tenure: usize,
    stalled: bool,
    stale_escapes: usize,
}

impl MetaheuristicPolicy {
    pub(crate) fn new(parameters: &SearchParameters, _model: &RoutingModel) -> Self {
        Self {
            kind: parameters.metaheuristic,
            lambda: parameters.guided_local_search_lambda,
            penalties: HashMap::default(),
            current_penalty: 0,
            temperature: 100.,
            tabu: VecDeque::default(),
            objective_tabu: VecDeque::default(),
            tenure: parameters.tabu_tenure,
            stalled: false,
            stale_escapes: 0,
        }
    }

    /// Decides whether the candidate plan replaces the current one.
    pub(crate) fn accept(
        &mut self,
        model: &RoutingModel,
        candidate: &[Vec<usize>],
        candidate_cost: Cost,
        current_cost: Cost,
        best_cost: Cost,
        rng: &mut StdRng,
    ) -> bool {
        if candidate_cost < best_cost {
            self.stale_escapes = 0;
        }

        let accepted = match self.kind {
            Metaheuristic::GreedyDescent => candidate_cost < current_cost,
            Metaheuristic::GuidedLocalSearch => {
                candidate_cost < best_cost
                    || cap_add(candidate_cost, self.penalty_term(model, candidate))
                        < cap_add(current_cost, self.current_penalty)
            }
            Metaheuristic::SimulatedAnnealing => {
                candidate_cost < current_cost || {
                    let worsening = (candidate_cost - current_cost) as f64;
                    self.temperature > f64::EPSILON && rng.gen::<f64>() < (-worsening / self.temperature).exp()
                }
            }
            Metaheuristic::TabuSearch => {
                let fingerprint = plan_fingerprint(candidate);
                if candidate_cost < best_cost {
                    true
                } else if self.tabu.contains(&fingerprint) {
                    false
                } else {
                    candidate_cost < current_cost || self.stalled
                }
            }
            Metaheuristic::ObjectiveTabu => {
                if candidate_cost < best_cost {
                    true
                } else if self.objective_tabu.contains(&candidate_cost) {
                    false
                } else {
                    candidate_cost < current_cost || self.stalled
                }
            }
        };

        if accepted {
            self.stalled = false;
            match self.kind {
                Metaheuristic::GuidedLocalSearch => self.current_penalty = self.penalty_term(model, candidate),
                Metaheuristic::TabuSearch => self.remember(plan_fingerprint(candidate)),
                Metaheuristic::ObjectiveTabu => {
                    self.objective_tabu.push_back(candidate_cost);
                    while self.objective_tabu.len() > self.tenure {
                        self.objective_tabu.pop_front();
                    }
                }
                _ => {}
            }
        }

        accepted
    }

    /// Reacts to a round without any accepted neighbor. Returns false when
    /// the search should stop.
    pub(crate) fn escape_local_minimum(
        &mut self,
        model: &RoutingModel,
        current: &[Vec<usize>],
        _current_cost: Cost,
    ) -> bool {
        self.stale_escapes += 1;
        if self.stale_escapes > MAX_STALE_ESCAPES {
            return false;
        }

        match self.kind {
            Metaheuristic::GreedyDescent => false,
            Metaheuristic::GuidedLocalSearch => {
                self.penalize(model, current);
                self.current_penalty = self.penalty_term(model, current);
                true
            }
            Metaheuristic::SimulatedAnnealing => {
                self.temperature *= 0.95;
                self.temperature > 1e-3
            }
            Metaheuristic::TabuSearch => {
                self.remember(plan_fingerprint(current));
                self.stalled = true;
                true
            }
            Metaheuristic::ObjectiveTabu => {
                self.stalled = true;
                true
            }
        }
    }

    /// The guided local search augmentation: every penalized arc of the plan
    /// contributes its penalty count times its own cost, scaled by lambda.
    fn penalty_term(&self, model: &RoutingModel, plan: &[Vec<usize>]) -> Cost {
        if self.penalties.is_empty() {
            return 0;
        }

        let mut term = 0f64;
        for_each_arc(model, plan, |from, to, cost| {
            if let Some(&penalty) = self.penalties.get(&(from, to)) {
                term += penalty as f64 * cost as f64;
            }
        });

        (self.lambda * term).ceil() as Cost
    }

    /// Raises the penalty of the arcs with the highest utility
    /// `cost / (1 + penalty)` in the current plan.
    fn penalize(&mut self, model: &RoutingModel, plan: &[Vec<usize>]) {
        let mut best_utility = 0f64;
        let mut chosen: Vec<(usize, usize)> = Vec::default();

        for_each_arc(model, plan, |from, to, cost| {
            let penalty = self.penalties.get(&(from, to)).copied().unwrap_or(0);
            let utility = cost as f64 / (1. + penalty as f64);
            if utility > best_utility {
                best_utility = utility;
                chosen.clear();
                chosen.push((from, to));
            } else if utility == best_utility {
                chosen.push((from, to));
            }
        });

        for arc in chosen {
            *self.penalties.entry(arc).or_default() += 1;
        }
    }

    fn remember(&mut self, fingerprint: u64) {
        self.tabu.push_back(fingerprint);
        while self.tabu.len() > self.tenure {
            self.tabu.pop_front();
        }
    }
}

fn for_each_arc<F: FnMut(usize, usize, Cost)>(model: &RoutingModel, plan: &[Vec<usize>], mut action: F) {
    for (vehicle, visits) in plan.iter().enumerate() {
        let mut previous = model.start(vehicle);
        for &index in visits {
            action(previous, index, model.arc_cost_for_vehicle(previous, index, vehicle as i64));
            previous = index;
        }
        let end = model.end(vehicle);
        action(previous, end, model.arc_cost_for_vehicle(previous, end, vehicle as i64));
    }
}

fn plan_fingerprint(plan: &[Vec<usize>]) -> u64 {
    let mut hasher = FxHasher::default();
    for visits in plan {
        hasher.write_usize(usize::MAX);
        visits.iter().for_each(|&index| hasher.write_usize(index));
    }
    hasher.finish()
}
