//! Scheduling primitives behind vehicle break handling.

mod disjunctive;

pub use self::disjunctive::{DisjunctivePropagator, Tasks};
