//! In-process adapters with the same semantics as the PostgreSQL ones.
//!
//! Used by the test suite and when the engine is embedded without a database.

use super::repository::{BookingMutation, BookingRepository};
use super::{PolicyStore, RateSource};
use crate::engine::{availability, BookingError};
use crate::models::{
    AuditEntry, Billboard, Booking, BookingStatus, DateRange, NewAuditEntry, PaymentStatus,
    PlatformPolicy,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

type Ledger = Arc<Mutex<Vec<Booking>>>;

/// Bookings partitioned per billboard, each partition behind its own mutex.
#[derive(Default)]
pub struct InMemoryBookingRepository {
    ledgers: DashMap<Uuid, Ledger>,
    billboard_of: DashMap<Uuid, Uuid>,
    audit: DashMap<Uuid, Vec<AuditEntry>>,
    next_entry_id: AtomicI64,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn ledger(&self, billboard_id: Uuid) -> Ledger {
        self.ledgers.entry(billboard_id).or_default().clone()
    }

    fn append_audit(&self, booking_id: Uuid, entry: NewAuditEntry) {
        let record = AuditEntry {
            entry_id: self.next_entry_id.fetch_add(1, Ordering::SeqCst) + 1,
            booking_id,
            action: entry.action,
            performed_by: entry.performed_by,
            details: entry.details,
            created_utc: entry.recorded_utc,
        };
        self.audit.entry(booking_id).or_default().push(record);
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert_if_available(
        &self,
        booking: Booking,
        audit: NewAuditEntry,
    ) -> Result<Booking, BookingError> {
        let ledger = self.ledger(booking.billboard_id);
        let mut bookings = ledger.lock().await;

        let range = booking.range();
        if availability::conflicts_with(&range, &bookings, None) {
            return Err(BookingError::DateRangeUnavailable {
                start: range.start,
                end: range.end,
            });
        }

        self.billboard_of
            .insert(booking.booking_id, booking.billboard_id);
        self.append_audit(booking.booking_id, audit);
        bookings.push(booking.clone());

        Ok(booking)
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, BookingError> {
        let Some(billboard_id) = self.billboard_of.get(&booking_id).map(|e| *e.value()) else {
            return Ok(None);
        };
        let ledger = self.ledger(billboard_id);
        let bookings = ledger.lock().await;
        Ok(bookings.iter().find(|b| b.booking_id == booking_id).cloned())
    }

    async fn list_active_in_range(
        &self,
        billboard_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<Booking>, BookingError> {
        let ledger = self.ledger(billboard_id);
        let bookings = ledger.lock().await;
        Ok(bookings
            .iter()
            .filter(|b| b.is_active() && b.range().overlaps(&range))
            .cloned()
            .collect())
    }

    async fn update_booking(
        &self,
        booking_id: Uuid,
        mutation: BookingMutation,
    ) -> Result<(Booking, bool), BookingError> {
        let billboard_id = self
            .billboard_of
            .get(&booking_id)
            .map(|e| *e.value())
            .ok_or(BookingError::BookingNotFound(booking_id))?;

        let ledger = self.ledger(billboard_id);
        let mut bookings = ledger.lock().await;
        let slot = bookings
            .iter_mut()
            .find(|b| b.booking_id == booking_id)
            .ok_or(BookingError::BookingNotFound(booking_id))?;

        let mut working = slot.clone();
        match mutation(&mut working)? {
            Some(entry) => {
                *slot = working.clone();
                self.append_audit(booking_id, entry);
                Ok((working, true))
            }
            None => Ok((slot.clone(), false)),
        }
    }

    async fn list_audit_entries(&self, booking_id: Uuid) -> Result<Vec<AuditEntry>, BookingError> {
        let mut entries = self
            .audit
            .get(&booking_id)
            .map(|e| e.value().clone())
            .unwrap_or_default();
        entries.sort_by_key(|e| (e.created_utc, e.entry_id));
        Ok(entries)
    }

    async fn list_completable(
        &self,
        today: NaiveDate,
        limit: i64,
    ) -> Result<Vec<Uuid>, BookingError> {
        let ledgers: Vec<Ledger> = self.ledgers.iter().map(|e| e.value().clone()).collect();
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);

        let mut ids = Vec::new();
        for ledger in ledgers {
            let bookings = ledger.lock().await;
            ids.extend(
                bookings
                    .iter()
                    .filter(|b| {
                        b.status == BookingStatus::Approved
                            && b.payment_status == PaymentStatus::Paid
                            && b.end_date < today
                    })
                    .map(|b| b.booking_id),
            );
            if ids.len() >= limit {
                ids.truncate(limit);
                break;
            }
        }
        Ok(ids)
    }
}

/// Billboard listings held in memory.
#[derive(Default)]
pub struct InMemoryRateSource {
    billboards: DashMap<Uuid, Billboard>,
}

impl InMemoryRateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, billboard: Billboard) {
        self.billboards.insert(billboard.billboard_id, billboard);
    }

    /// Change the listed rate. Locked bookings keep their own snapshot.
    pub fn set_price_per_day(&self, billboard_id: Uuid, price_per_day: Decimal) {
        if let Some(mut entry) = self.billboards.get_mut(&billboard_id) {
            entry.price_per_day = price_per_day;
        }
    }

    pub fn set_open_for_booking(&self, billboard_id: Uuid, open: bool) {
        if let Some(mut entry) = self.billboards.get_mut(&billboard_id) {
            entry.is_open_for_booking = open;
        }
    }

    pub fn set_admin_blocked(&self, billboard_id: Uuid, blocked: bool) {
        if let Some(mut entry) = self.billboards.get_mut(&billboard_id) {
            entry.admin_blocked = blocked;
        }
    }
}

#[async_trait]
impl RateSource for InMemoryRateSource {
    async fn get_billboard(&self, billboard_id: Uuid) -> Result<Option<Billboard>, BookingError> {
        Ok(self.billboards.get(&billboard_id).map(|e| e.value().clone()))
    }
}

/// Platform policy held in memory; also serves policy loaded from configuration.
pub struct InMemoryPolicyStore {
    policy: RwLock<PlatformPolicy>,
}

impl InMemoryPolicyStore {
    pub fn new(policy: PlatformPolicy) -> Self {
        Self {
            policy: RwLock::new(policy),
        }
    }

    pub async fn replace(&self, policy: PlatformPolicy) {
        *self.policy.write().await = policy;
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn current_policy(&self) -> Result<PlatformPolicy, BookingError> {
        Ok(self.policy.read().await.clone())
    }
}
