//! Exact minimization of cumul dependent costs on fixed routes.

mod cumul;

pub use self::cumul::{CumulCostTerm, CumulOptimizer, CumulSchedule, RouteCumulProblem};
