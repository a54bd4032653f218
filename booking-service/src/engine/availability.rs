//! Availability index: per-day status and range-level conflict checks.

use super::error::BookingError;
use crate::models::{Billboard, Booking, BookingStatus, DateRange, DayAvailability, DayStatus};
use crate::services::BookingRepository;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Longest window a single availability query may span.
pub const MAX_AVAILABILITY_WINDOW_DAYS: i64 = 366;

/// Fold active bookings into one status per day of `window`.
///
/// APPROVED coverage wins over PENDING; a billboard that is closed or
/// admin-blocked reports every day UNAVAILABLE.
pub fn day_statuses(
    billboard: &Billboard,
    window: DateRange,
    bookings: &[Booking],
) -> Vec<DayAvailability> {
    window
        .iter_days()
        .map(|date| {
            let status = if !billboard.is_bookable() {
                DayStatus::Unavailable
            } else {
                status_for_day(date, bookings)
            };
            DayAvailability { date, status }
        })
        .collect()
}

fn status_for_day(date: NaiveDate, bookings: &[Booking]) -> DayStatus {
    let mut status = DayStatus::Available;
    for booking in bookings.iter().filter(|b| b.range().contains(date)) {
        match booking.status {
            BookingStatus::Approved => return DayStatus::Booked,
            BookingStatus::Pending => status = DayStatus::Pending,
            _ => {}
        }
    }
    status
}

/// Whether `range` collides with any active booking other than `exclude`.
pub fn conflicts_with(range: &DateRange, bookings: &[Booking], exclude: Option<Uuid>) -> bool {
    bookings
        .iter()
        .filter(|b| b.is_active())
        .filter(|b| Some(b.booking_id) != exclude)
        .any(|b| b.range().overlaps(range))
}

/// Read side of availability, backed by the booking repository.
#[derive(Clone)]
pub struct AvailabilityIndex {
    repository: Arc<dyn BookingRepository>,
}

impl AvailabilityIndex {
    pub fn new(repository: Arc<dyn BookingRepository>) -> Self {
        Self { repository }
    }

    /// Ordered per-day statuses for `[from, to]`.
    #[instrument(skip(self, billboard), fields(billboard_id = %billboard.billboard_id))]
    pub async fn get_day_statuses(
        &self,
        billboard: &Billboard,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DayAvailability>, BookingError> {
        let window = DateRange::new(from, to).ok_or_else(|| {
            BookingError::InvalidDateRange(format!("'to' ({}) is before 'from' ({})", to, from))
        })?;
        if window.days() > MAX_AVAILABILITY_WINDOW_DAYS {
            return Err(BookingError::InvalidDateRange(format!(
                "availability window may not exceed {} days",
                MAX_AVAILABILITY_WINDOW_DAYS
            )));
        }

        let bookings = self
            .repository
            .list_active_in_range(billboard.billboard_id, window)
            .await?;

        Ok(day_statuses(billboard, window, &bookings))
    }

    /// Range-level conflict query. `exclude` lets a booking re-check its own range.
    #[instrument(skip(self))]
    pub async fn has_conflict(
        &self,
        billboard_id: Uuid,
        range: DateRange,
        exclude: Option<Uuid>,
    ) -> Result<bool, BookingError> {
        let bookings = self.repository.list_active_in_range(billboard_id, range).await?;
        Ok(conflicts_with(&range, &bookings, exclude))
    }
}
