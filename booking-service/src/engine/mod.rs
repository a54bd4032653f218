//! Booking engine: availability, pricing and the booking lifecycle.

pub mod audit;
pub mod availability;
pub mod clock;
mod error;
pub mod lifecycle;
pub mod pricing;

pub use audit::AuditLog;
pub use availability::AvailabilityIndex;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{BookingError, ErrorKind};
pub use lifecycle::{BookingEngine, PricePreview};
