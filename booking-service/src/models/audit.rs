//! Audit trail model for booking-service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of transition recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Created,
    Approved,
    Rejected,
    DiscountApplied,
    DiscountRemoved,
    PaymentInitiated,
    Paid,
    PaymentFailed,
    Cancelled,
    CancelledNoRefund,
    Completed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::Approved => "approved",
            AuditAction::Rejected => "rejected",
            AuditAction::DiscountApplied => "discount_applied",
            AuditAction::DiscountRemoved => "discount_removed",
            AuditAction::PaymentInitiated => "payment_initiated",
            AuditAction::Paid => "paid",
            AuditAction::PaymentFailed => "payment_failed",
            AuditAction::Cancelled => "cancelled",
            AuditAction::CancelledNoRefund => "cancelled_no_refund",
            AuditAction::Completed => "completed",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "created" => AuditAction::Created,
            "approved" => AuditAction::Approved,
            "rejected" => AuditAction::Rejected,
            "discount_applied" => AuditAction::DiscountApplied,
            "discount_removed" => AuditAction::DiscountRemoved,
            "payment_initiated" => AuditAction::PaymentInitiated,
            "paid" => AuditAction::Paid,
            "payment_failed" => AuditAction::PaymentFailed,
            "cancelled" => AuditAction::Cancelled,
            "cancelled_no_refund" => AuditAction::CancelledNoRefund,
            "completed" => AuditAction::Completed,
            other => return Err(anyhow::anyhow!("unknown audit action '{}'", other)),
        })
    }
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entry_id: i64,
    pub booking_id: Uuid,
    pub action: AuditAction,
    pub performed_by: String,
    pub details: serde_json::Value,
    pub created_utc: DateTime<Utc>,
}

/// Audit record before storage assigns it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub action: AuditAction,
    pub performed_by: String,
    pub details: serde_json::Value,
    pub recorded_utc: DateTime<Utc>,
}

impl NewAuditEntry {
    pub fn new(action: AuditAction, performed_by: impl fmt::Display) -> Self {
        Self {
            action,
            performed_by: performed_by.to_string(),
            details: serde_json::Value::Object(Default::default()),
            recorded_utc: Utc::now(),
        }
    }

    /// Stamp the entry with the time the transition happened.
    pub fn at(mut self, recorded_utc: DateTime<Utc>) -> Self {
        self.recorded_utc = recorded_utc;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}
