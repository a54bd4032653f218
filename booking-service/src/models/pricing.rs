//! Price breakdown embedded in every booking.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Monetary breakdown of a booking, all amounts at two decimal places.
///
/// `price_per_day`, `commission_percent` and `gst_percent` are the snapshot the
/// amounts were computed from; once `locked` they never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub price_per_day: Decimal,
    pub days: i32,
    pub original_base_amount: Decimal,
    pub discount_percent: Decimal,
    pub discount_amount: Decimal,
    pub base_amount: Decimal,
    pub commission_percent: Decimal,
    pub commission_amount: Decimal,
    pub gst_percent: Decimal,
    pub gst_amount: Decimal,
    pub total_amount: Decimal,
    pub locked: bool,
    pub locked_utc: Option<DateTime<Utc>>,
}

impl PriceBreakdown {
    /// `total == base + commission + gst`, exactly.
    pub fn is_balanced(&self) -> bool {
        self.total_amount == self.base_amount + self.commission_amount + self.gst_amount
    }
}

/// Inputs to a price computation, read once at the start of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingInputs {
    pub price_per_day: Decimal,
    pub days: i64,
    pub discount_percent: Decimal,
    pub commission_percent: Decimal,
    pub gst_percent: Decimal,
}
