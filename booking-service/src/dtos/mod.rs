//! Request and response bodies of the HTTP API.

use crate::models::{AuditEntry, DayAvailability};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateBookingRequest {
    pub billboard_id: Uuid,
    /// Defaults to the acting user.
    #[serde(default)]
    pub advertiser_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct DateWindowQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct PricePreviewQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub discount_percent: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct DiscountQuery {
    pub percent: Decimal,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MarkPaidRequest {
    pub payment_reference: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PaymentFailedRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub billboard_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: Vec<DayAvailability>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditHistoryResponse {
    pub booking_id: Uuid,
    pub entries: Vec<AuditEntry>,
}
