//! PostgreSQL booking repository.

use super::database::Database;
use super::metrics::DB_QUERY_DURATION;
use super::repository::{BookingMutation, BookingRepository};
use crate::engine::BookingError;
use crate::models::{AuditEntry, Booking, DateRange, NewAuditEntry, PriceBreakdown};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

/// SQLSTATE for `exclusion_violation`.
const EXCLUSION_VIOLATION: &str = "23P01";

const BOOKING_COLUMNS: &str = r#"
    booking_id, billboard_id, advertiser_id, start_date, end_date, status, payment_status,
    payment_reference, price_per_day, days, original_base_amount, discount_percent,
    discount_amount, base_amount, commission_percent, commission_amount, gst_percent,
    gst_amount, total_amount, pricing_locked, locked_utc, created_utc, updated_utc
"#;

/// Flattened `bookings` row.
#[derive(Debug, FromRow)]
struct BookingRow {
    booking_id: Uuid,
    billboard_id: Uuid,
    advertiser_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    payment_status: String,
    payment_reference: Option<String>,
    price_per_day: Decimal,
    days: i32,
    original_base_amount: Decimal,
    discount_percent: Decimal,
    discount_amount: Decimal,
    base_amount: Decimal,
    commission_percent: Decimal,
    commission_amount: Decimal,
    gst_percent: Decimal,
    gst_amount: Decimal,
    total_amount: Decimal,
    pricing_locked: bool,
    locked_utc: Option<DateTime<Utc>>,
    created_utc: DateTime<Utc>,
    updated_utc: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = BookingError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            booking_id: row.booking_id,
            billboard_id: row.billboard_id,
            advertiser_id: row.advertiser_id,
            start_date: row.start_date,
            end_date: row.end_date,
            status: row.status.parse()?,
            payment_status: row.payment_status.parse()?,
            payment_reference: row.payment_reference,
            pricing: PriceBreakdown {
                price_per_day: row.price_per_day,
                days: row.days,
                original_base_amount: row.original_base_amount,
                discount_percent: row.discount_percent,
                discount_amount: row.discount_amount,
                base_amount: row.base_amount,
                commission_percent: row.commission_percent,
                commission_amount: row.commission_amount,
                gst_percent: row.gst_percent,
                gst_amount: row.gst_amount,
                total_amount: row.total_amount,
                locked: row.pricing_locked,
                locked_utc: row.locked_utc,
            },
            created_utc: row.created_utc,
            updated_utc: row.updated_utc,
        })
    }
}

#[derive(Debug, FromRow)]
struct AuditRow {
    entry_id: i64,
    booking_id: Uuid,
    action: String,
    performed_by: String,
    details: serde_json::Value,
    created_utc: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = BookingError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(AuditEntry {
            entry_id: row.entry_id,
            booking_id: row.booking_id,
            action: row.action.parse()?,
            performed_by: row.performed_by,
            details: row.details,
            created_utc: row.created_utc,
        })
    }
}

fn storage(context: &str, e: sqlx::Error) -> BookingError {
    BookingError::Storage(anyhow::anyhow!("{}: {}", context, e))
}

/// Bookings and audit entries in PostgreSQL.
#[derive(Clone)]
pub struct PgBookingRepository {
    db: Database,
}

impl PgBookingRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn append_audit(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
        entry: &NewAuditEntry,
    ) -> Result<(), BookingError> {
        sqlx::query(
            r#"
            INSERT INTO booking_audit_entries (booking_id, action, performed_by, details, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(booking_id)
        .bind(entry.action.as_str())
        .bind(&entry.performed_by)
        .bind(&entry.details)
        .bind(entry.recorded_utc)
        .execute(&mut **tx)
        .await
        .map_err(|e| storage("Failed to append audit entry", e))?;
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    #[instrument(skip(self, booking, audit), fields(billboard_id = %booking.billboard_id))]
    async fn insert_if_available(
        &self,
        booking: Booking,
        audit: NewAuditEntry,
    ) -> Result<Booking, BookingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_booking"])
            .start_timer();

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| storage("Failed to begin transaction", e))?;

        // Serialises creates per billboard until commit; other billboards never contend.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(booking.billboard_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| storage("Failed to lock billboard", e))?;

        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM bookings
                WHERE billboard_id = $1
                  AND status IN ('pending', 'approved')
                  AND start_date <= $3
                  AND $2 <= end_date
            )
            "#,
        )
        .bind(booking.billboard_id)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| storage("Failed to check availability", e))?;

        if taken {
            return Err(BookingError::DateRangeUnavailable {
                start: booking.start_date,
                end: booking.end_date,
            });
        }

        let p = &booking.pricing;
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            INSERT INTO bookings (
                booking_id, billboard_id, advertiser_id, start_date, end_date, status, payment_status,
                payment_reference, price_per_day, days, original_base_amount, discount_percent,
                discount_amount, base_amount, commission_percent, commission_amount, gst_percent,
                gst_amount, total_amount, pricing_locked, locked_utc, created_utc, updated_utc
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20, $21, $22, $22)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking.booking_id)
        .bind(booking.billboard_id)
        .bind(booking.advertiser_id)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(&booking.payment_reference)
        .bind(p.price_per_day)
        .bind(p.days)
        .bind(p.original_base_amount)
        .bind(p.discount_percent)
        .bind(p.discount_amount)
        .bind(p.base_amount)
        .bind(p.commission_percent)
        .bind(p.commission_amount)
        .bind(p.gst_percent)
        .bind(p.gst_amount)
        .bind(p.total_amount)
        .bind(p.locked)
        .bind(p.locked_utc)
        .bind(booking.created_utc)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.code().as_deref() == Some(EXCLUSION_VIOLATION) =>
            {
                BookingError::DateRangeUnavailable {
                    start: booking.start_date,
                    end: booking.end_date,
                }
            }
            _ => storage("Failed to insert booking", e),
        })?;

        Self::append_audit(&mut tx, booking.booking_id, &audit).await?;

        tx.commit()
            .await
            .map_err(|e| storage("Failed to commit booking", e))?;

        timer.observe_duration();

        info!(booking_id = %row.booking_id, "Booking persisted");

        Booking::try_from(row)
    }

    #[instrument(skip(self), fields(booking_id = %booking_id))]
    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, BookingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_booking"])
            .start_timer();

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| storage("Failed to get booking", e))?;

        timer.observe_duration();

        row.map(Booking::try_from).transpose()
    }

    #[instrument(skip(self), fields(billboard_id = %billboard_id))]
    async fn list_active_in_range(
        &self,
        billboard_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<Booking>, BookingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_active_in_range"])
            .start_timer();

        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE billboard_id = $1
              AND status IN ('pending', 'approved')
              AND start_date <= $3
              AND $2 <= end_date
            ORDER BY start_date
            "#
        ))
        .bind(billboard_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| storage("Failed to list bookings", e))?;

        timer.observe_duration();

        rows.into_iter().map(Booking::try_from).collect()
    }

    #[instrument(skip(self, mutation), fields(booking_id = %booking_id))]
    async fn update_booking(
        &self,
        booking_id: Uuid,
        mutation: BookingMutation,
    ) -> Result<(Booking, bool), BookingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_booking"])
            .start_timer();

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| storage("Failed to begin transaction", e))?;

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_id = $1 FOR UPDATE"
        ))
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| storage("Failed to lock booking", e))?
        .ok_or(BookingError::BookingNotFound(booking_id))?;

        let current = Booking::try_from(row)?;
        let mut working = current.clone();
        let Some(entry) = mutation(&mut working)? else {
            tx.rollback()
                .await
                .map_err(|e| storage("Failed to release booking", e))?;
            return Ok((current, false));
        };

        let p = &working.pricing;
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET status = $2,
                payment_status = $3,
                payment_reference = $4,
                price_per_day = $5,
                days = $6,
                original_base_amount = $7,
                discount_percent = $8,
                discount_amount = $9,
                base_amount = $10,
                commission_percent = $11,
                commission_amount = $12,
                gst_percent = $13,
                gst_amount = $14,
                total_amount = $15,
                pricing_locked = $16,
                locked_utc = $17,
                updated_utc = $18
            WHERE booking_id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(working.status.as_str())
        .bind(working.payment_status.as_str())
        .bind(&working.payment_reference)
        .bind(p.price_per_day)
        .bind(p.days)
        .bind(p.original_base_amount)
        .bind(p.discount_percent)
        .bind(p.discount_amount)
        .bind(p.base_amount)
        .bind(p.commission_percent)
        .bind(p.commission_amount)
        .bind(p.gst_percent)
        .bind(p.gst_amount)
        .bind(p.total_amount)
        .bind(p.locked)
        .bind(p.locked_utc)
        .bind(working.updated_utc)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| storage("Failed to update booking", e))?;

        Self::append_audit(&mut tx, booking_id, &entry).await?;

        tx.commit()
            .await
            .map_err(|e| storage("Failed to commit booking update", e))?;

        timer.observe_duration();

        Ok((Booking::try_from(row)?, true))
    }

    #[instrument(skip(self), fields(booking_id = %booking_id))]
    async fn list_audit_entries(&self, booking_id: Uuid) -> Result<Vec<AuditEntry>, BookingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_audit_entries"])
            .start_timer();

        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT entry_id, booking_id, action, performed_by, details, created_utc
            FROM booking_audit_entries
            WHERE booking_id = $1
            ORDER BY created_utc, entry_id
            "#,
        )
        .bind(booking_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| storage("Failed to list audit entries", e))?;

        timer.observe_duration();

        rows.into_iter().map(AuditEntry::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn list_completable(
        &self,
        today: NaiveDate,
        limit: i64,
    ) -> Result<Vec<Uuid>, BookingError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT booking_id
            FROM bookings
            WHERE status = 'approved'
              AND payment_status = 'paid'
              AND end_date < $1
            ORDER BY end_date
            LIMIT $2
            "#,
        )
        .bind(today)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| storage("Failed to list completable bookings", e))?;

        Ok(ids)
    }
}
