//! Provides registration and memoization of transit callbacks.

#[cfg(test)]
#[path = "../../tests/unit/models/transit_test.rs"]
mod transit_test;

use crate::models::common::{cap_add, Value};
use hashbrown::HashMap;
use rustc_hash::FxHasher;
use std::cell::RefCell;
use std::hash::Hasher;
use std::sync::Arc;

/// A callback returning a transit value from a source index alone.
pub type TransitCallback1 = Arc<dyn Fn(usize) -> Value + Send + Sync>;

/// A callback returning a transit value for an arc.
pub type TransitCallback2 = Arc<dyn Fn(usize, usize) -> Value + Send + Sync>;

/// A callback returning a state dependent transit for an arc.
pub type StateDependentCallback2 = Arc<dyn Fn(usize, usize) -> StateDependentTransit + Send + Sync>;

/// A function over a bounded integer domain materialized as a lookup table
/// with constant time range min/max queries.
pub struct RangeIntToIntFunction {
    domain_min: Value,
    values: Vec<Value>,
    min_table: Vec<Vec<Value>>,
    max_table: Vec<Vec<Value>>,
}

impl RangeIntToIntFunction {
    /// Materializes the given function over `[domain_min, domain_max]`.
    pub fn new<F: Fn(Value) -> Value>(function: F, domain_min: Value, domain_max: Value) -> Self {
        debug_assert!(domain_min <= domain_max);
        let values = (domain_min..=domain_max).map(function).collect::<Vec<_>>();

        let build = |better: fn(Value, Value) -> Value| {
            let mut table: Vec<Vec<Value>> = vec![values.clone()];
            let mut width = 1;
            while 2 * width <= values.len() {
                let prev = table.last().unwrap();
                let row =
                    (0..=(values.len() - 2 * width)).map(|i| better(prev[i], prev[i + width])).collect::<Vec<_>>();
                table.push(row);
                width *= 2;
            }
            table
        };

        Self { domain_min, min_table: build(Value::min), max_table: build(Value::max), values }
    }

    /// Returns the function value, clamping the argument to the domain.
    pub fn value(&self, x: Value) -> Value {
        let offset = (x - self.domain_min).clamp(0, self.values.len() as Value - 1) as usize;
        self.values[offset]
    }

    /// Returns the minimum function value on `[from, to]` intersected with the domain.
    pub fn range_min(&self, from: Value, to: Value) -> Value {
        self.range_query(from, to, &self.min_table, Value::min)
    }

    /// Returns the maximum function value on `[from, to]` intersected with the domain.
    pub fn range_max(&self, from: Value, to: Value) -> Value {
        self.range_query(from, to, &self.max_table, Value::max)
    }

    fn range_query(&self, from: Value, to: Value, table: &[Vec<Value>], better: fn(Value, Value) -> Value) -> Value {
        let last = self.values.len() as Value - 1;
        let from = (from - self.domain_min).clamp(0, last) as usize;
        let to = (to - self.domain_min).clamp(0, last) as usize;
        debug_assert!(from <= to);

        let level = usize::BITS as usize - 1 - (to - from + 1).leading_zeros() as usize;
        let width = 1 << level;

        better(table[level][from], table[level][to + 1 - width])
    }
}

/// Keeps a state dependent transit function `f` over a parent cumul together
/// with `g(x) = f(x) + x` which local search queries for range extrema.
#[derive(Clone)]
pub struct StateDependentTransit {
    /// The transit function itself.
    pub transit: Arc<RangeIntToIntFunction>,
    /// The transit function plus identity.
    pub transit_plus_identity: Arc<RangeIntToIntFunction>,
}

/// Materializes a state dependent transit from a plain function and the
/// bounded domain of the parent cumul.
pub fn make_state_dependent_transit<F>(function: F, domain_min: Value, domain_max: Value) -> StateDependentTransit
where
    F: Fn(Value) -> Value,
{
    let transit = Arc::new(RangeIntToIntFunction::new(&function, domain_min, domain_max));
    let transit_plus_identity =
        Arc::new(RangeIntToIntFunction::new(|x| cap_add(function(x), x), domain_min, domain_max));

    StateDependentTransit { transit, transit_plus_identity }
}

/// Registers transit callbacks and memoizes their values once the model is
/// closed. Registration returns stable integer ids which the model and its
/// dimensions refer to.
#[derive(Default)]
pub struct TransitCallbackRegistry {
    evaluators: Vec<TransitCallback2>,
    unary_evaluators: Vec<Option<TransitCallback1>>,
    state_dependent_evaluators: Vec<StateDependentCallback2>,
    matrices: Vec<Option<Arc<Vec<Value>>>>,
    state_dependent_cache: RefCell<HashMap<(usize, usize, usize), StateDependentTransit>>,
    num_indices: usize,
}

impl TransitCallbackRegistry {
    /// Registers an arc transit callback and returns its id.
    pub fn register_transit_callback(&mut self, callback: TransitCallback2) -> usize {
        self.evaluators.push(callback);
        self.unary_evaluators.push(None);
        self.evaluators.len() - 1
    }

    /// Registers a transit callback which depends on the source index only.
    pub fn register_unary_transit_callback(&mut self, callback: TransitCallback1) -> usize {
        let unary = callback.clone();
        self.evaluators.push(Arc::new(move |from, _| unary(from)));
        self.unary_evaluators.push(Some(callback));
        self.evaluators.len() - 1
    }

    /// Registers a state dependent transit callback and returns its id.
    pub fn register_state_dependent_transit_callback(&mut self, callback: StateDependentCallback2) -> usize {
        self.state_dependent_evaluators.push(callback);
        self.state_dependent_evaluators.len() - 1
    }

    /// Returns the transit value of the given arc for a registered callback.
    pub fn transit(&self, callback: usize, from: usize, to: usize) -> Value {
        match self.matrices.get(callback) {
            Some(Some(matrix)) => matrix[from * self.num_indices + to],
            _ => (self.evaluators[callback])(from, to),
        }
    }

    /// Returns the unary shape of a registered callback when it has one.
    pub fn unary_transit_or_none(&self, callback: usize) -> Option<&TransitCallback1> {
        self.unary_evaluators.get(callback).and_then(|unary| unary.as_ref())
    }

    /// Returns the state dependent transit of an arc, caching the materialized
    /// function pair per callback and arc.
    pub fn state_dependent_transit(&self, callback: usize, from: usize, to: usize) -> StateDependentTransit {
        self.state_dependent_cache
            .borrow_mut()
            .entry((callback, from, to))
            .or_insert_with(|| (self.state_dependent_evaluators[callback])(from, to))
            .clone()
    }

    /// Returns the amount of registered arc callbacks.
    pub fn num_transit_callbacks(&self) -> usize {
        self.evaluators.len()
    }

    /// Returns the amount of registered state dependent callbacks.
    pub fn num_state_dependent_callbacks(&self) -> usize {
        self.state_dependent_evaluators.len()
    }

    /// Memoizes every registered arc callback over the closed index universe.
    /// Callbacks producing identical value tables share one matrix, detected
    /// by fingerprint.
    pub fn close(&mut self, num_indices: usize) {
        if !self.matrices.is_empty() {
            return;
        }

        self.num_indices = num_indices;

        let mut shared: HashMap<u64, Arc<Vec<Value>>> = HashMap::new();
        self.matrices = self
            .evaluators
            .iter()
            .map(|evaluator| {
                let values = (0..num_indices)
                    .flat_map(|from| (0..num_indices).map(move |to| evaluator(from, to)))
                    .collect::<Vec<_>>();

                let mut hasher = FxHasher::default();
                values.iter().for_each(|value| hasher.write_i64(*value));

                Some(shared.entry(hasher.finish()).or_insert_with(|| Arc::new(values)).clone())
            })
            .collect();
    }
}
