//! Fast feasibility checks consuming delta assignments during construction
//! and local search.

mod breaks;
mod cumul;
mod disjunction;
mod feasibility;
mod path;
mod pickup;
mod vehicle;

pub use self::breaks::VehicleBreaksFilter;
pub use self::cumul::PathCumulFilter;
pub use self::disjunction::NodeDisjunctionFilter;
pub use self::feasibility::CpFeasibilityFilter;
pub use self::pickup::{PickupDeliveryFilter, TypeIncompatibilityFilter};
pub use self::vehicle::{VehicleAmortizedCostFilter, VehicleVarFilter};

pub(crate) use self::path::PathState;

use crate::model::RoutingModel;
use crate::models::assignment::{Assignment, Delta};

/// A filter judges a delta on top of the committed assignment without
/// restoring it into the constraint network. Filters keep incremental per
/// path state refreshed through [`LocalSearchFilter::synchronize`].
pub trait LocalSearchFilter {
    /// Returns the name of the filter.
    fn name(&self) -> &str;

    /// Returns false if the delta provably violates the concern of this
    /// filter.
    fn accept(&mut self, model: &RoutingModel, committed: &Assignment, delta: &Delta) -> bool;

    /// Adopts the given assignment as the new reference point.
    fn synchronize(&mut self, model: &RoutingModel, assignment: &Assignment);
}

/// Creates the filter stack of a model, cheapest first; the constraint
/// network catch-all comes last.
pub fn create_default_filters(model: &RoutingModel) -> Vec<Box<dyn LocalSearchFilter>> {
    let mut filters: Vec<Box<dyn LocalSearchFilter>> = Vec::default();

    if !model.disjunctions().is_empty() {
        filters.push(Box::new(NodeDisjunctionFilter::new(model)));
    }
    filters.push(Box::new(VehicleVarFilter::new(model)));

    for dimension in model.dimensions() {
        filters.push(Box::new(PathCumulFilter::new(model, dimension.index())));
        if dimension.has_break_constraints() {
            filters.push(Box::new(VehicleBreaksFilter::new(model, dimension.index())));
        }
    }

    if !model.pickup_delivery_pairs().is_empty() {
        filters.push(Box::new(PickupDeliveryFilter::new(model)));
    }
    if (0..model.size()).any(|index| model.visit_type(index) >= 0) {
        filters.push(Box::new(TypeIncompatibilityFilter::new(model)));
    }
    if model.has_amortized_costs() {
        filters.push(Box::new(VehicleAmortizedCostFilter::new(model)));
    }

    filters.push(Box::new(CpFeasibilityFilter::new(model)));

    filters
}
