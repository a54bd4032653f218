//! Storage contract for bookings and their audit trail.

use crate::engine::BookingError;
use crate::models::{AuditEntry, Booking, DateRange, NewAuditEntry};
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

/// A pure transition applied to a booking while storage holds it exclusively.
///
/// Returning `Ok(Some(entry))` persists the mutated booking and appends `entry`
/// in the same atomic unit. `Ok(None)` means the booking already is in the
/// requested state: nothing is written. `Err` discards the mutation.
pub type BookingMutation =
    Box<dyn FnOnce(&mut Booking) -> Result<Option<NewAuditEntry>, BookingError> + Send>;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert `booking` unless an active booking on the same billboard overlaps
    /// its range. Check and insert are linearizable per billboard.
    async fn insert_if_available(
        &self,
        booking: Booking,
        audit: NewAuditEntry,
    ) -> Result<Booking, BookingError>;

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, BookingError>;

    /// Active (PENDING/APPROVED) bookings on `billboard_id` overlapping `range`.
    async fn list_active_in_range(
        &self,
        billboard_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<Booking>, BookingError>;

    /// Apply `mutation` under an exclusive lock on the booking.
    ///
    /// Returns the resulting booking and whether a transition was written.
    async fn update_booking(
        &self,
        booking_id: Uuid,
        mutation: BookingMutation,
    ) -> Result<(Booking, bool), BookingError>;

    /// Audit entries for a booking, oldest first.
    async fn list_audit_entries(&self, booking_id: Uuid) -> Result<Vec<AuditEntry>, BookingError>;

    /// Ids of APPROVED + PAID bookings whose end date is before `today`.
    async fn list_completable(&self, today: NaiveDate, limit: i64)
        -> Result<Vec<Uuid>, BookingError>;
}
