//! Domain models for booking-service.

mod audit;
mod availability;
mod booking;
mod date_range;
mod inventory;
mod pricing;

pub use audit::{AuditAction, AuditEntry, NewAuditEntry};
pub use availability::{DayAvailability, DayStatus};
pub use booking::{Booking, BookingStatus, NewBooking, PaymentStatus};
pub use date_range::DateRange;
pub use inventory::{Actor, Billboard, DiscountLimits, PlatformPolicy};
pub use pricing::{PriceBreakdown, PricingInputs};
