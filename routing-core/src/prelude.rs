//! This module reimports commonly used types.

pub use crate::model::{
    PickupAndDeliveryPolicy, RoutingModel, RoutingSearchStatus, NO_PENALTY,
};
pub use crate::models::index::RoutingIndexManager;

pub use crate::construction::FirstSolutionStrategy;
pub use crate::dimensions::{BreakInterval, RoutingDimension};
pub use crate::models::assignment::Assignment;
pub use crate::models::common::{Cost, Value, ValueRange};
pub use crate::models::piecewise::PiecewiseLinearFunction;
pub use crate::search::{Metaheuristic, SearchParameters};

// Reimport rosomaxa utils
pub use rosomaxa::prelude::{GenericError, GenericResult};
pub use rosomaxa::utils::Environment;
pub use rosomaxa::utils::InfoLogger;
