//! HTTP middleware for booking-service.

pub mod actor;
pub mod metrics;

pub use actor::ActorContext;
pub use metrics::metrics_middleware;
