//! Activity tracking and idle deactivation.

mod idle;
mod tracker;

pub use idle::{
    DeactivationHandler, DeactivationPolicy, IdleDeactivationConfig, IdleDeactivationService,
    IdleTimeoutDeactivationPolicy,
};
pub use tracker::{ActivityMetrics, ActivityTracker};
