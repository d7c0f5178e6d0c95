//! A core crate with building blocks to model rich Vehicle Routing Problems
//! and to solve them with filtered construction heuristics and local search.
//!
//! # Key points
//!
//! A routing model is declared index by index: a fleet of vehicles with
//! duplicated start and end indices, optional visits grouped in
//! disjunctions, pickup and delivery coupling, and named [`dimensions`]
//! accumulating integer quantities (time, load, distance) along each route.
//! All quantities are bounded integers.
//!
//! Solving runs in two stages. A filtered first solution heuristic
//! (cheapest insertion, cheapest addition, savings or Christofides) commits
//! an assignment step by step, every step validated by fast local search
//! [`filters`]. Local search then explores a set of classic routing
//! neighborhoods under an optional metaheuristic, and every improving
//! solution gets its cumuls finalized by an exact per route optimizer.
//!
//! # Examples
//!
//! ```
//! use routing_core::prelude::*;
//! use std::sync::Arc;
//!
//! // a 4 city tour for one vehicle starting and ending at city 0
//! let manager = RoutingIndexManager::new_single_depot(4, 1, 0)?;
//! let mut model = RoutingModel::new(manager);
//!
//! let transit = model.register_transit_callback(Arc::new(|from, to| (from + to) as i64));
//! model.set_arc_cost_evaluator_of_all_vehicles(transit)?;
//!
//! let solution = model.solve().cloned();
//! assert_eq!(model.status(), RoutingSearchStatus::Success);
//! assert!(solution.is_some());
//! # Ok::<(), GenericError>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

#[cfg(test)]
#[path = "../tests/helpers/mod.rs"]
pub mod helpers;

pub mod prelude;

pub mod construction;
pub mod dimensions;
pub mod filters;
pub mod lp;
pub mod model;
pub mod models;
pub mod scheduling;
pub mod search;

pub use rosomaxa;
