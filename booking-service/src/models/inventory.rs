//! Read-only snapshots from the rate source and the platform policy store.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Billboard listing as seen by the booking engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Billboard {
    pub billboard_id: Uuid,
    pub owner_id: Uuid,
    pub price_per_day: Decimal,
    pub is_open_for_booking: bool,
    pub admin_blocked: bool,
}

impl Billboard {
    /// Open for booking at all, independent of date-level conflicts.
    pub fn is_bookable(&self) -> bool {
        self.is_open_for_booking && !self.admin_blocked
    }
}

/// Platform commission, tax and discount caps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PlatformPolicy {
    pub commission_percent: Decimal,
    pub gst_percent: Decimal,
    pub weekday_max_discount_percent: Decimal,
    pub weekend_max_discount_percent: Decimal,
}

impl PlatformPolicy {
    pub fn max_discount_percent(&self, is_weekend_window: bool) -> Decimal {
        if is_weekend_window {
            self.weekend_max_discount_percent
        } else {
            self.weekday_max_discount_percent
        }
    }
}

/// Discount limits for a date range, derived per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountLimits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<Uuid>,
    pub max_discount_percent: Decimal,
    pub current_discount_percent: Decimal,
    pub is_weekend_window: bool,
}

/// Who performed an action, as recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Actor {
    User(Uuid),
    PaymentGateway,
    System,
}

impl Actor {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Actor::User(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::User(id) => write!(f, "user:{}", id),
            Actor::PaymentGateway => f.write_str("payment-gateway"),
            Actor::System => f.write_str("system"),
        }
    }
}
