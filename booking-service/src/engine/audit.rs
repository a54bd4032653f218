//! Audit log: the append side lives inside each repository mutation, this is
//! the read side plus the entry builders the lifecycle manager uses.

use super::error::BookingError;
use crate::models::{Actor, AuditAction, AuditEntry, Booking, NewAuditEntry};
use crate::services::BookingRepository;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AuditLog {
    repository: Arc<dyn BookingRepository>,
}

impl AuditLog {
    pub fn new(repository: Arc<dyn BookingRepository>) -> Self {
        Self { repository }
    }

    /// Entries for a booking ordered by timestamp, then insertion order.
    pub async fn history(&self, booking_id: Uuid) -> Result<Vec<AuditEntry>, BookingError> {
        if self.repository.get_booking(booking_id).await?.is_none() {
            return Err(BookingError::BookingNotFound(booking_id));
        }
        self.repository.list_audit_entries(booking_id).await
    }
}

/// Entry for a status/payment transition, stamped with the booking's state after it.
pub(crate) fn entry(
    action: AuditAction,
    actor: Actor,
    booking: &Booking,
    extra: serde_json::Value,
) -> NewAuditEntry {
    let mut details = json!({
        "status": booking.status,
        "payment_status": booking.payment_status,
    });
    if let (Some(target), serde_json::Value::Object(extra)) = (details.as_object_mut(), extra) {
        target.extend(extra);
    }
    NewAuditEntry::new(action, actor).with_details(details)
}
