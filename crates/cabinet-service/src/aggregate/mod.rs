//! Aggregate (size and visibility) propagation.

pub mod propagator;
pub mod visibility;

pub use propagator::{AggregatePropagator, RecalculateReport};
pub use visibility::VisibilityReport;
