//! Conversions between route descriptions and assignments, solution
//! compaction and solution files.

use super::{evaluate_plan, RoutingModel};
use crate::lp::CumulOptimizer;
use crate::models::assignment::Assignment;
use rosomaxa::prelude::GenericResult;
use std::fs::File;
use std::path::Path;

impl RoutingModel {
    /// Builds an assignment of the path variables from per vehicle visit
    /// sequences. Indices absent from every route become inactive.
    pub fn routes_to_assignment(&self, routes: &[Vec<usize>]) -> GenericResult<Assignment> {
        if routes.len() != self.num_vehicles() {
            return Err(format!("expected {} routes, got {}", self.num_vehicles(), routes.len()).into());
        }

        let mut assignment = Assignment::new(self.arena.len());
        let mut on_route = vec![false; self.size()];

        for (vehicle, visits) in routes.iter().enumerate() {
            for &index in visits {
                if index >= self.size() || self.is_start(index) {
                    return Err(format!("index {index} cannot be visited on a route").into());
                }
                if on_route[index] {
                    return Err(format!("index {index} appears on more than one route").into());
                }
                on_route[index] = true;
            }

            let mut previous = self.start(vehicle);
            for &index in visits {
                assignment.set(self.next_var(previous), index as i64);
                previous = index;
            }
            assignment.set(self.next_var(previous), self.end(vehicle) as i64);

            assignment.set(self.vehicle_var(self.start(vehicle)), vehicle as i64);
            assignment.set(self.vehicle_var(self.end(vehicle)), vehicle as i64);
            assignment.set(self.active_var(self.start(vehicle)), 1);
            visits.iter().for_each(|&index| {
                assignment.set(self.vehicle_var(index), vehicle as i64);
                assignment.set(self.active_var(index), 1);
            });
        }

        for index in 0..self.size() {
            if !self.is_start(index) && !on_route[index] {
                assignment.set(self.next_var(index), index as i64);
                assignment.set(self.vehicle_var(index), -1);
                assignment.set(self.active_var(index), 0);
            }
        }

        Ok(assignment)
    }

    /// Extracts per vehicle visit sequences from an assignment by following
    /// the successor variables from every vehicle start.
    pub fn assignment_to_routes(&self, assignment: &Assignment) -> GenericResult<Vec<Vec<usize>>> {
        let mut routes = Vec::with_capacity(self.num_vehicles());

        for vehicle in 0..self.num_vehicles() {
            let mut visits = Vec::default();
            let mut current = self.start(vehicle);
            let mut steps = 0;

            while !self.is_end(current) {
                steps += 1;
                if steps > self.num_indices() {
                    return Err(format!("route of vehicle {vehicle} does not reach its end").into());
                }

                let next = assignment
                    .value(self.next_var(current))
                    .ok_or_else(|| format!("next variable of index {current} is unbound"))?;
                if next < 0 || next >= self.num_indices() as i64 {
                    return Err(format!("next({current}) = {next} is out of range").into());
                }

                current = next as usize;
                if !self.is_end(current) {
                    visits.push(current);
                }
            }

            if current != self.end(vehicle) {
                return Err(format!("route of vehicle {vehicle} ends at a foreign terminal").into());
            }

            routes.push(visits);
        }

        Ok(routes)
    }

    /// Remaps vehicles so used ones form a prefix, swapping only vehicles of
    /// the same vehicle class, and validates the result by recomputing its
    /// cost. The input assignment is left untouched.
    pub fn compact_assignment(&self, assignment: &Assignment) -> GenericResult<Assignment> {
        let mut routes = self.assignment_to_routes(assignment)?;

        for target in 0..routes.len() {
            if !routes[target].is_empty() {
                continue;
            }

            let target_class = self.vehicle_class_of_vehicle(target);
            let donor = (target + 1..routes.len())
                .find(|&donor| !routes[donor].is_empty() && self.vehicle_class_of_vehicle(donor) == target_class);

            if let Some(donor) = donor {
                routes.swap(target, donor);
            }
        }

        let mut compacted = self.routes_to_assignment(&routes)?;

        let mut optimizer = CumulOptimizer::new(self.num_vehicles());
        let plan = evaluate_plan(self, &routes, &mut optimizer)
            .ok_or_else(|| format!("compaction produced an infeasible assignment"))?;

        if let Some(objective) = assignment.objective() {
            if objective != plan.cost {
                return Err(format!("compaction changed the cost from {objective} to {}", plan.cost).into());
            }
        }
        compacted.set_objective(plan.cost);

        Ok(compacted)
    }

    /// Reads an assignment from a solution file.
    pub fn read_assignment<P: AsRef<Path>>(&self, path: P) -> GenericResult<Assignment> {
        let file = File::open(path)?;
        Assignment::read(file)
    }

    /// Writes an assignment into a solution file: one `(variable index,
    /// value)` tuple per line plus the objective.
    pub fn write_assignment<P: AsRef<Path>>(&self, assignment: &Assignment, path: P) -> GenericResult<()> {
        let mut file = File::create(path)?;
        assignment.write(&mut file)
    }

    /// Returns the bound successor of an index inside an assignment.
    pub fn next(&self, assignment: &Assignment, index: usize) -> Option<usize> {
        assignment.value(self.next_var(index)).map(|next| next as usize)
    }

    /// Returns true if the vehicle serves at least one index: its start is
    /// not wired straight to its end.
    pub fn is_vehicle_used(&self, assignment: &Assignment, vehicle: usize) -> bool {
        self.next(assignment, self.start(vehicle)).is_some_and(|next| next != self.end(vehicle))
    }
}
