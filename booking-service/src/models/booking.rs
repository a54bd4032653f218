//! Booking model for booking-service.

use super::{DateRange, PriceBreakdown};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Booking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    CancelledNoRefund,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::CancelledNoRefund => "cancelled_no_refund",
            BookingStatus::Completed => "completed",
        }
    }

    /// Statuses whose date range blocks other reservations.
    pub fn blocks_dates(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Approved)
    }

    pub fn is_terminal(&self) -> bool {
        !self.blocks_dates()
    }

    /// Whether `self -> next` is an edge of the booking state machine.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Approved, Cancelled)
                | (Approved, CancelledNoRefund)
                | (Approved, Completed)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "approved" => Ok(BookingStatus::Approved),
            "rejected" => Ok(BookingStatus::Rejected),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "cancelled_no_refund" => Ok(BookingStatus::CancelledNoRefund),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(anyhow::anyhow!("unknown booking status '{}'", other)),
        }
    }
}

/// Payment status, driven by the payment collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    NotPaid,
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::NotPaid => "not_paid",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Whether `self -> next` is an edge of the payment state machine.
    ///
    /// `Failed -> Pending` and `Failed -> Paid` cover a re-attempted payment.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (NotPaid, Pending)
                | (NotPaid, Paid)
                | (Pending, Paid)
                | (Pending, Failed)
                | (Failed, Pending)
                | (Failed, Paid)
                | (Paid, Refunded)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_paid" => Ok(PaymentStatus::NotPaid),
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(anyhow::anyhow!("unknown payment status '{}'", other)),
        }
    }
}

/// A reservation of one contiguous inclusive date range on one billboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: Uuid,
    pub billboard_id: Uuid,
    pub advertiser_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub pricing: PriceBreakdown,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Booking {
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.blocks_dates()
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

/// Input for inserting a booking.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub billboard_id: Uuid,
    pub advertiser_id: Uuid,
    pub range: DateRange,
    pub pricing: PriceBreakdown,
}

impl NewBooking {
    /// Materialise the initial PENDING / NOT_PAID record.
    pub fn into_booking(self, now: DateTime<Utc>) -> Booking {
        Booking {
            booking_id: Uuid::new_v4(),
            billboard_id: self.billboard_id,
            advertiser_id: self.advertiser_id,
            start_date: self.range.start,
            end_date: self.range.end,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::NotPaid,
            payment_reference: None,
            pricing: self.pricing,
            created_utc: now,
            updated_utc: now,
        }
    }
}
