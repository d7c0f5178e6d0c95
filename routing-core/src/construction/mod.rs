//! First solution heuristics building an assignment incrementally, every
//! step validated by the local search filters.

#[cfg(test)]
#[path = "../../tests/unit/construction/heuristic_test.rs"]
mod heuristic_test;

mod addition;
mod christofides;
mod insertion;
mod savings;

pub use self::addition::CheapestAdditionBuilder;
pub use self::christofides::ChristofidesBuilder;
pub use self::insertion::{GlobalCheapestInsertionBuilder, LocalCheapestInsertionBuilder};
pub use self::savings::SavingsBuilder;

use crate::filters::LocalSearchFilter;
use crate::model::RoutingModel;
use crate::models::assignment::{Assignment, Delta};
use crate::models::common::Value;
use crate::search::SearchParameters;

/// Selects the heuristic used to build the first solution.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FirstSolutionStrategy {
    /// Insert globally cheapest nodes and pairs, all routes in parallel.
    #[default]
    GlobalCheapestInsertion,
    /// Insert globally cheapest nodes and pairs, one route at a time.
    SequentialCheapestInsertion,
    /// Insert the first unbound node at its cheapest position.
    LocalCheapestInsertion,
    /// Extend route ends by their cheapest successor.
    CheapestAddition,
    /// Clarke & Wright savings, routes grown in parallel.
    ParallelSavings,
    /// Clarke & Wright savings, one route at a time.
    SequentialSavings,
    /// A Christofides tour sharded over vehicles.
    Christofides,
}

/// Shared machinery of filtered first solution builders: a committed
/// assignment plus a candidate delta which filters accept or reject as one
/// unit.
pub struct FilteredHeuristic<'a> {
    model: &'a RoutingModel,
    filters: &'a mut [Box<dyn LocalSearchFilter>],
    committed: Assignment,
    delta: Delta,
    rejected: usize,
}

impl<'a> FilteredHeuristic<'a> {
    /// Creates the machinery with an empty committed assignment and fixes
    /// the pre-locked route chains of the model.
    pub fn new(model: &'a RoutingModel, filters: &'a mut [Box<dyn LocalSearchFilter>]) -> Option<Self> {
        let committed = model.new_assignment();
        let mut heuristic = Self { model, filters, committed, delta: Delta::default(), rejected: 0 };

        heuristic.filters.iter_mut().for_each(|filter| filter.synchronize(model, &heuristic.committed));

        // terminals know their vehicle from the outset
        for vehicle in 0..model.num_vehicles() {
            heuristic.delta.set(model.vehicle_var(model.start(vehicle)), vehicle as i64);
            heuristic.delta.set(model.vehicle_var(model.end(vehicle)), vehicle as i64);
            heuristic.delta.set(model.active_var(model.start(vehicle)), 1);
        }
        if !heuristic.commit() {
            return None;
        }

        for vehicle in 0..model.num_vehicles() {
            let chain = model.locked_chain_of_vehicle(vehicle).to_vec();
            if chain.is_empty() {
                continue;
            }

            let mut previous = model.start(vehicle);
            for &index in &chain {
                heuristic.append_visit(vehicle, previous, index);
                previous = index;
            }
            if !heuristic.commit() {
                return None;
            }
        }

        Some(heuristic)
    }

    /// Returns the model under construction.
    pub fn model(&self) -> &RoutingModel {
        self.model
    }

    /// Returns how many deltas the filters discarded so far.
    pub fn rejected_count(&self) -> usize {
        self.rejected
    }

    /// Proposes a value inside the current delta.
    pub fn set_value(&mut self, variable: crate::models::assignment::VariableHandle, value: Value) {
        self.delta.set(variable, value);
    }

    /// Returns the currently visible value of a variable: the delta shadows
    /// the committed assignment.
    pub fn value(&self, variable: crate::models::assignment::VariableHandle) -> Option<Value> {
        self.delta.value(variable).or_else(|| self.committed.value(variable))
    }

    /// Returns the committed successor of an index, if bound.
    pub fn next_value(&self, index: usize) -> Option<usize> {
        self.value(self.model.next_var(index)).map(|next| next as usize)
    }

    /// Returns true if the successor of the index was committed.
    pub fn is_bound(&self, index: usize) -> bool {
        self.committed.is_bound(self.model.next_var(index))
    }

    /// Stages the insertion of a visit after `previous` on a vehicle,
    /// keeping whatever followed `previous` behind the new visit.
    pub fn insert_visit(&mut self, vehicle: usize, previous: usize, index: usize) {
        let successor = self.next_value(previous);
        self.append_visit(vehicle, previous, index);
        if let Some(successor) = successor {
            self.delta.set(self.model.next_var(index), successor as i64);
        }
    }

    /// Stages a visit directly after `previous` on a vehicle without linking
    /// it further.
    pub fn append_visit(&mut self, vehicle: usize, previous: usize, index: usize) {
        self.delta.set(self.model.next_var(previous), index as i64);
        self.delta.set(self.model.vehicle_var(index), vehicle as i64);
        self.delta.set(self.model.active_var(index), 1);
    }

    /// Stages closing a route: the last visit connects to the vehicle end.
    pub fn close_route(&mut self, vehicle: usize, last: usize) {
        self.delta.set(self.model.next_var(last), self.model.end(vehicle) as i64);
    }

    /// Stages making an index unperformed.
    pub fn make_unperformed(&mut self, index: usize) {
        self.delta.set(self.model.next_var(index), index as i64);
        self.delta.set(self.model.vehicle_var(index), -1);
        self.delta.set(self.model.active_var(index), 0);
    }

    /// Runs all filters over the delta: on acceptance the delta merges into
    /// the committed assignment and filters resynchronize; otherwise the
    /// delta is discarded.
    pub fn commit(&mut self) -> bool {
        if self.delta.is_empty() {
            return true;
        }

        let accepted =
            self.filters.iter_mut().all(|filter| filter.accept(self.model, &self.committed, &self.delta));

        if accepted {
            self.committed.merge(&self.delta);
            self.filters.iter_mut().for_each(|filter| filter.synchronize(self.model, &self.committed));
        } else {
            self.rejected += 1;
        }

        self.delta.clear();
        accepted
    }

    /// Closes open route ends and makes untouched indices unperformed; the
    /// build succeeds only when every successor variable is committed.
    pub fn finalize(mut self) -> Option<Assignment> {
        for vehicle in 0..self.model.num_vehicles() {
            let mut current = self.model.start(vehicle);
            while let Some(next) = self.next_value(current) {
                if self.model.is_end(next) {
                    break;
                }
                current = next;
            }
            if self.next_value(current).is_none() {
                self.close_route(vehicle, current);
                if !self.commit() {
                    return None;
                }
            }
        }

        for index in 0..self.model.size() {
            if self.model.is_start(index) || self.is_bound(index) {
                continue;
            }

            self.make_unperformed(index);
            if !self.commit() {
                return None;
            }
        }

        let complete = (0..self.model.size()).all(|index| self.committed.is_bound(self.model.next_var(index)));
        complete.then_some(self.committed)
    }

    /// Returns the current visits of a vehicle, following committed and
    /// staged successors.
    pub fn route_visits(&self, vehicle: usize) -> Vec<usize> {
        let mut visits = Vec::default();
        let mut current = self.model.start(vehicle);

        while let Some(next) = self.next_value(current) {
            if self.model.is_end(next) {
                break;
            }
            visits.push(next);
            current = next;
        }

        visits
    }

    /// Returns the last index of a vehicle route which is not the end:
    /// either the last visit or the vehicle start.
    pub fn route_tail(&self, vehicle: usize) -> usize {
        let mut current = self.model.start(vehicle);
        while let Some(next) = self.next_value(current) {
            if self.model.is_end(next) {
                break;
            }
            current = next;
        }
        current
    }

    /// Returns true if the route of the vehicle was closed.
    pub fn is_route_closed(&self, vehicle: usize) -> bool {
        self.next_value(self.route_tail(vehicle)).is_some()
    }
}

/// Tries to place every still unbound index at any feasible position before
/// the finalizer gives up on it.
pub(crate) fn insert_leftovers(model: &RoutingModel, heuristic: &mut FilteredHeuristic<'_>) {
    for index in 0..model.size() {
        if model.is_start(index) || heuristic.is_bound(index) {
            continue;
        }

        'placement: for vehicle in 0..model.num_vehicles() {
            let mut positions = vec![model.start(vehicle)];
            positions.extend(heuristic.route_visits(vehicle));

            for previous in positions {
                heuristic.insert_visit(vehicle, previous, index);
                if heuristic.commit() {
                    break 'placement;
                }
            }
        }
    }
}

/// Builds a first solution with the strategy requested by the parameters.
pub fn build_first_solution(
    model: &RoutingModel,
    parameters: &SearchParameters,
    filters: &mut [Box<dyn LocalSearchFilter>],
) -> Option<Assignment> {
    match parameters.first_solution_strategy {
        FirstSolutionStrategy::GlobalCheapestInsertion => {
            GlobalCheapestInsertionBuilder::new(false, parameters).build(model, filters)
        }
        FirstSolutionStrategy::SequentialCheapestInsertion => {
            GlobalCheapestInsertionBuilder::new(true, parameters).build(model, filters)
        }
        FirstSolutionStrategy::LocalCheapestInsertion => LocalCheapestInsertionBuilder::default().build(model, filters),
        FirstSolutionStrategy::CheapestAddition => CheapestAdditionBuilder::default().build(model, filters),
        FirstSolutionStrategy::ParallelSavings => SavingsBuilder::new(false, parameters).build(model, filters),
        FirstSolutionStrategy::SequentialSavings => SavingsBuilder::new(true, parameters).build(model, filters),
        FirstSolutionStrategy::Christofides => ChristofidesBuilder::default().build(model, filters),
    }
}
