//! A filter guarding disjunction cardinalities.

#[cfg(test)]
#[path = "../../tests/unit/filters/disjunction_test.rs"]
mod disjunction_test;

use super::LocalSearchFilter;
use crate::model::RoutingModel;
use crate::models::assignment::{Assignment, Delta};
use hashbrown::{HashMap, HashSet};

/// Tracks the amount of active indices per disjunction and rejects deltas
/// activating more than the allowed cardinality.
pub struct NodeDisjunctionFilter {
    active_counts: Vec<usize>,
    is_active: Vec<bool>,
}

impl NodeDisjunctionFilter {
    /// Creates the filter for a model.
    pub fn new(model: &RoutingModel) -> Self {
        Self { active_counts: vec![0; model.disjunctions().len()], is_active: vec![false; model.size()] }
    }
}

impl LocalSearchFilter for NodeDisjunctionFilter {
    fn name(&self) -> &str {
        "node_disjunction"
    }

    fn accept(&mut self, model: &RoutingModel, _: &Assignment, delta: &Delta) -> bool {
        let mut deltas: HashMap<usize, i64> = HashMap::default();
        let mut seen: HashSet<usize> = HashSet::default();

        for (variable, value) in delta.iter() {
            // activity shows up either on the successor or the active
            // variable of an index, whichever the delta carries
            let (index, becomes_active) = if let Some(index) = model.as_next_variable(variable) {
                (index, value as usize != index)
            } else if let Some(index) = model.as_active_variable(variable) {
                (index, value != 0)
            } else {
                continue;
            };

            if becomes_active == self.is_active[index] || !seen.insert(index) {
                continue;
            }

            for &disjunction in model.disjunctions_of_index(index) {
                *deltas.entry(disjunction).or_default() += if becomes_active { 1 } else { -1 };
            }
        }

        deltas.iter().all(|(&disjunction, &change)| {
            let count = self.active_counts[disjunction] as i64 + change;
            count >= 0 && count <= model.disjunction(disjunction).max_cardinality as i64
        })
    }

    fn synchronize(&mut self, model: &RoutingModel, assignment: &Assignment) {
        for index in 0..model.size() {
            self.is_active[index] = assignment
                .value(model.active_var(index))
                .map(|active| active != 0)
                .or_else(|| assignment.value(model.next_var(index)).map(|next| next as usize != index))
                .unwrap_or(false);
        }

        self.active_counts = model
            .disjunctions()
            .iter()
            .map(|disjunction| disjunction.indices.iter().filter(|&&index| self.is_active[index]).count())
            .collect();
    }
}
