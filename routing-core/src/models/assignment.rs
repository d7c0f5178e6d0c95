//! Provides arena allocated variables and assignments over them.

#[cfg(test)]
#[path = "../../tests/unit/models/assignment_test.rs"]
mod assignment_test;

use crate::models::common::{Cost, Value, ValueRange};
use rosomaxa::prelude::GenericResult;
use std::io::{BufRead, BufReader, Read, Write};

/// An integer handle of an arena allocated variable.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct VariableHandle(usize);

impl VariableHandle {
    /// Returns the position of the variable inside its arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Owns domains of all model variables and hands out integer handles. The
/// model and its dimensions keep handle arrays instead of references, which
/// avoids ownership cycles between them.
#[derive(Clone, Debug, Default)]
pub struct VariableArena {
    domains: Vec<ValueRange>,
}

impl VariableArena {
    /// Allocates a single variable with the given domain.
    pub fn allocate(&mut self, domain: ValueRange) -> VariableHandle {
        self.domains.push(domain);
        VariableHandle(self.domains.len() - 1)
    }

    /// Allocates a contiguous group of variables sharing a domain.
    pub fn allocate_many(&mut self, amount: usize, domain: ValueRange) -> Vec<VariableHandle> {
        (0..amount).map(|_| self.allocate(domain)).collect()
    }

    /// Returns the domain of a variable.
    pub fn domain(&self, variable: VariableHandle) -> ValueRange {
        self.domains[variable.0]
    }

    /// Replaces the domain of a variable.
    pub fn set_domain(&mut self, variable: VariableHandle, domain: ValueRange) {
        self.domains[variable.0] = domain;
    }

    /// Intersects the domain of a variable with the given range and returns
    /// false when the domain becomes empty.
    pub fn intersect_domain(&mut self, variable: VariableHandle, range: ValueRange) -> bool {
        let domain = self.domains[variable.0].intersect(&range);
        self.domains[variable.0] = domain;
        !domain.is_empty()
    }

    /// Returns the amount of allocated variables.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Returns true if no variable was allocated yet.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// A candidate change on top of a committed assignment: an ordered list of
/// `(variable, value)` pairs, the contract shared by filters and builders.
#[derive(Clone, Debug, Default)]
pub struct Delta {
    entries: Vec<(VariableHandle, Value)>,
}

impl Delta {
    /// Appends a value for a variable, replacing an earlier entry if any.
    pub fn set(&mut self, variable: VariableHandle, value: Value) {
        match self.entries.iter_mut().find(|(candidate, _)| *candidate == variable) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((variable, value)),
        }
    }

    /// Returns the value proposed for a variable, if any.
    pub fn value(&self, variable: VariableHandle) -> Option<Value> {
        self.entries.iter().find(|(candidate, _)| *candidate == variable).map(|(_, value)| *value)
    }

    /// Iterates over proposed `(variable, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (VariableHandle, Value)> + '_ {
        self.entries.iter().copied()
    }

    /// Returns the amount of proposed changes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the delta proposes nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forgets all proposed changes.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A (possibly partial) valuation of arena variables plus the objective value
/// of the solution it represents.
#[derive(Clone, Debug, Default)]
pub struct Assignment {
    values: Vec<Option<Value>>,
    objective: Option<Cost>,
}

impl Assignment {
    /// Creates an empty assignment able to hold the given amount of variables.
    pub fn new(num_variables: usize) -> Self {
        Self { values: vec![None; num_variables], objective: None }
    }

    /// Binds a variable to a value.
    pub fn set(&mut self, variable: VariableHandle, value: Value) {
        if variable.0 >= self.values.len() {
            self.values.resize(variable.0 + 1, None);
        }
        self.values[variable.0] = Some(value);
    }

    /// Returns the value of a variable, if bound.
    pub fn value(&self, variable: VariableHandle) -> Option<Value> {
        self.values.get(variable.0).copied().flatten()
    }

    /// Returns true if the variable is bound.
    pub fn is_bound(&self, variable: VariableHandle) -> bool {
        self.value(variable).is_some()
    }

    /// Unbinds a variable.
    pub fn unset(&mut self, variable: VariableHandle) {
        if let Some(value) = self.values.get_mut(variable.0) {
            *value = None;
        }
    }

    /// Applies all changes of a delta on top of this assignment.
    pub fn merge(&mut self, delta: &Delta) {
        delta.iter().for_each(|(variable, value)| self.set(variable, value));
    }

    /// Returns the objective value, if known.
    pub fn objective(&self) -> Option<Cost> {
        self.objective
    }

    /// Sets the objective value.
    pub fn set_objective(&mut self, objective: Cost) {
        self.objective = Some(objective);
    }

    /// Forgets the objective value.
    pub fn clear_objective(&mut self) {
        self.objective = None;
    }

    /// Returns the amount of bound variables.
    pub fn bound_count(&self) -> usize {
        self.values.iter().filter(|value| value.is_some()).count()
    }

    /// Iterates over bound `(variable, value)` pairs.
    pub fn iter_bound(&self) -> impl Iterator<Item = (VariableHandle, Value)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(index, value)| value.map(|value| (VariableHandle(index), value)))
    }

    /// Writes the assignment as a sequence of `(variable index, value)` tuples
    /// followed by the objective value.
    pub fn write<W: Write>(&self, writer: &mut W) -> GenericResult<()> {
        for (variable, value) in self.iter_bound() {
            writeln!(writer, "{} {}", variable.index(), value)?;
        }
        if let Some(objective) = self.objective {
            writeln!(writer, "objective {objective}")?;
        }

        Ok(())
    }

    /// Reads an assignment written by [`Assignment::write`].
    pub fn read<R: Read>(reader: R) -> GenericResult<Self> {
        let mut assignment = Self::default();

        for line in BufReader::new(reader).lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some("objective"), Some(value)) => {
                    assignment.objective = Some(value.parse::<Cost>().map_err(|err| err.to_string())?)
                }
                (Some(index), Some(value)) => {
                    let index = index.parse::<usize>().map_err(|err| err.to_string())?;
                    let value = value.parse::<Value>().map_err(|err| err.to_string())?;
                    assignment.set(VariableHandle(index), value);
                }
                _ => return Err(format!("malformed assignment line: '{line}'").into()),
            }
        }

        Ok(assignment)
    }
}
