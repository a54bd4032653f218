//! HTTP handlers for booking-service.

pub mod availability;
pub mod bookings;
pub mod health;
pub mod payments;

pub use health::{health_check, metrics_handler, readiness_check};
