//! Booking lifecycle manager.
//!
//! Every mutating operation reads its Rate/Policy snapshot up front, then hands
//! a pure transition to the repository, which applies it while holding the
//! booking exclusively and appends the audit entry in the same unit.

use super::audit::{self, AuditLog};
use super::availability::AvailabilityIndex;
use super::clock::Clock;
use super::error::BookingError;
use super::pricing;
use crate::models::{
    Actor, AuditAction, AuditEntry, Billboard, Booking, BookingStatus, DateRange,
    DayAvailability, DiscountLimits, NewBooking, PaymentStatus, PlatformPolicy, PriceBreakdown,
    PricingInputs,
};
use crate::services::metrics::{BOOKING_CONFLICTS_TOTAL, BOOKING_TRANSITIONS_TOTAL, LOCKED_AMOUNT_TOTAL};
use crate::services::{BookingMutation, BookingRepository, PolicyStore, RateSource};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Upper bound on bookings completed per sweep pass.
const COMPLETION_BATCH_SIZE: i64 = 500;

/// Price preview for a prospective range; nothing is persisted.
#[derive(Debug, Clone, Serialize)]
pub struct PricePreview {
    pub billboard_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub breakdown: PriceBreakdown,
    pub discount_limits: DiscountLimits,
}

#[derive(Clone)]
pub struct BookingEngine {
    repository: Arc<dyn BookingRepository>,
    rates: Arc<dyn RateSource>,
    policies: Arc<dyn PolicyStore>,
    availability: AvailabilityIndex,
    audit_log: AuditLog,
    clock: Arc<dyn Clock>,
}

impl BookingEngine {
    pub fn new(
        repository: Arc<dyn BookingRepository>,
        rates: Arc<dyn RateSource>,
        policies: Arc<dyn PolicyStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            availability: AvailabilityIndex::new(repository.clone()),
            audit_log: AuditLog::new(repository.clone()),
            repository,
            rates,
            policies,
            clock,
        }
    }

    pub fn availability(&self) -> &AvailabilityIndex {
        &self.availability
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    async fn billboard(&self, billboard_id: Uuid) -> Result<Billboard, BookingError> {
        self.rates
            .get_billboard(billboard_id)
            .await?
            .ok_or(BookingError::BillboardNotFound(billboard_id))
    }

    async fn load(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.repository
            .get_booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))
    }

    /// Load a booking together with its billboard, requiring `actor` to own the billboard.
    async fn load_as_owner(
        &self,
        booking_id: Uuid,
        actor: Actor,
        action: &str,
    ) -> Result<(Booking, Billboard), BookingError> {
        let booking = self.load(booking_id).await?;
        let billboard = self.billboard(booking.billboard_id).await?;
        if actor.user_id() != Some(billboard.owner_id) {
            return Err(BookingError::Forbidden(format!(
                "only the billboard owner may {} this booking",
                action
            )));
        }
        Ok((booking, billboard))
    }

    /// Wrap `mutation` so a written transition carries the engine's current time.
    fn stamped(&self, mutation: BookingMutation) -> BookingMutation {
        let now = self.clock.now();
        Box::new(move |booking| {
            let entry = mutation(booking)?;
            if entry.is_some() {
                booking.updated_utc = now;
            }
            Ok(entry.map(|entry| entry.at(now)))
        })
    }

    async fn apply(
        &self,
        booking_id: Uuid,
        action: AuditAction,
        mutation: BookingMutation,
    ) -> Result<(Booking, bool), BookingError> {
        let (booking, changed) = self
            .repository
            .update_booking(booking_id, self.stamped(mutation))
            .await?;
        if changed {
            BOOKING_TRANSITIONS_TOTAL
                .with_label_values(&[action.as_str()])
                .inc();
            info!(
                booking_id = %booking_id,
                action = %action,
                status = %booking.status,
                payment_status = %booking.payment_status,
                "Booking transition recorded"
            );
        }
        Ok((booking, changed))
    }

    /// Reserve `[start, end]` on a billboard as PENDING / NOT_PAID.
    #[instrument(skip(self), fields(billboard_id = %billboard_id, advertiser_id = %advertiser_id))]
    pub async fn create_booking(
        &self,
        billboard_id: Uuid,
        advertiser_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Booking, BookingError> {
        let range = DateRange::new(start_date, end_date).ok_or_else(|| {
            BookingError::InvalidDateRange(format!(
                "end date {} is before start date {}",
                end_date, start_date
            ))
        })?;
        let today = self.clock.today();
        if range.start < today {
            return Err(BookingError::InvalidDateRange(format!(
                "start date {} is in the past",
                range.start
            )));
        }

        let billboard = self.billboard(billboard_id).await?;
        if !billboard.is_bookable() {
            return Err(BookingError::BillboardUnavailable(billboard_id));
        }
        let policy = self.policies.current_policy().await?;

        let pricing = pricing::compute(PricingInputs {
            price_per_day: billboard.price_per_day,
            days: range.days(),
            discount_percent: Decimal::ZERO,
            commission_percent: policy.commission_percent,
            gst_percent: policy.gst_percent,
        });

        let booking = NewBooking {
            billboard_id,
            advertiser_id,
            range,
            pricing,
        }
        .into_booking(self.clock.now());
        let entry = audit::entry(
            AuditAction::Created,
            Actor::User(advertiser_id),
            &booking,
            json!({
                "start_date": range.start,
                "end_date": range.end,
                "days": booking.pricing.days,
                "price_per_day": booking.pricing.price_per_day,
                "total_amount": booking.pricing.total_amount,
            }),
        )
        .at(booking.created_utc);

        match self.repository.insert_if_available(booking, entry).await {
            Ok(booking) => {
                BOOKING_TRANSITIONS_TOTAL
                    .with_label_values(&[AuditAction::Created.as_str()])
                    .inc();
                info!(booking_id = %booking.booking_id, total = %booking.pricing.total_amount, "Booking created");
                Ok(booking)
            }
            Err(err @ BookingError::DateRangeUnavailable { .. }) => {
                BOOKING_CONFLICTS_TOTAL.inc();
                warn!(start = %range.start, end = %range.end, "Requested dates are already taken");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.load(booking_id).await
    }

    /// PENDING -> APPROVED, by the billboard owner.
    #[instrument(skip(self))]
    pub async fn approve_booking(
        &self,
        booking_id: Uuid,
        actor: Actor,
    ) -> Result<Booking, BookingError> {
        self.load_as_owner(booking_id, actor, "approve").await?;

        let mutation: BookingMutation = Box::new(move |booking| {
            if booking.status == BookingStatus::Approved {
                return Ok(None);
            }
            if !booking.status.can_transition_to(BookingStatus::Approved) {
                return Err(BookingError::invalid_transition("approve", booking.status));
            }
            booking.status = BookingStatus::Approved;
            Ok(Some(audit::entry(
                AuditAction::Approved,
                actor,
                booking,
                json!({}),
            )))
        });
        let (booking, _) = self.apply(booking_id, AuditAction::Approved, mutation).await?;
        Ok(booking)
    }

    /// PENDING -> REJECTED, by the billboard owner, before any payment began.
    #[instrument(skip(self))]
    pub async fn reject_booking(
        &self,
        booking_id: Uuid,
        actor: Actor,
    ) -> Result<Booking, BookingError> {
        self.load_as_owner(booking_id, actor, "reject").await?;

        let mutation: BookingMutation = Box::new(move |booking| {
            if booking.status == BookingStatus::Rejected {
                return Ok(None);
            }
            if !booking.status.can_transition_to(BookingStatus::Rejected) {
                return Err(BookingError::invalid_transition("reject", booking.status));
            }
            if booking.payment_status != PaymentStatus::NotPaid {
                return Err(BookingError::invalid_transition(
                    "reject",
                    format!("pending with payment {}", booking.payment_status),
                ));
            }
            booking.status = BookingStatus::Rejected;
            Ok(Some(audit::entry(
                AuditAction::Rejected,
                actor,
                booking,
                json!({}),
            )))
        });
        let (booking, _) = self.apply(booking_id, AuditAction::Rejected, mutation).await?;
        Ok(booking)
    }

    /// Set the booking's discount and reprice it from the current rate and policy.
    #[instrument(skip(self))]
    pub async fn apply_discount(
        &self,
        booking_id: Uuid,
        percent: Decimal,
        actor: Actor,
    ) -> Result<Booking, BookingError> {
        let percent = pricing::validate_discount(percent)?;

        let (current, billboard) = self.load_as_owner(booking_id, actor, "discount").await?;
        if current.is_paid() || current.pricing.locked {
            return Err(BookingError::AlreadyLocked(booking_id));
        }

        let range = current.range();
        let policy = self.policies.current_policy().await?;
        let max = policy.max_discount_percent(range.is_weekend_window());
        if percent > max {
            return Err(BookingError::DiscountExceedsLimit {
                requested: percent,
                max,
            });
        }

        if current.is_active()
            && self
                .availability
                .has_conflict(current.billboard_id, range, Some(booking_id))
                .await?
        {
            return Err(BookingError::DateRangeUnavailable {
                start: range.start,
                end: range.end,
            });
        }

        let repriced = pricing::compute(PricingInputs {
            price_per_day: billboard.price_per_day,
            days: range.days(),
            discount_percent: percent,
            commission_percent: policy.commission_percent,
            gst_percent: policy.gst_percent,
        });
        let action = if percent.is_zero() {
            AuditAction::DiscountRemoved
        } else {
            AuditAction::DiscountApplied
        };

        let mutation: BookingMutation = Box::new(move |booking| {
            if booking.is_paid() || booking.pricing.locked {
                return Err(BookingError::AlreadyLocked(booking.booking_id));
            }
            if !booking.is_active() {
                return Err(BookingError::invalid_transition(
                    "change the discount of",
                    booking.status,
                ));
            }
            if booking.pricing.discount_percent == repriced.discount_percent {
                return Ok(None);
            }

            let previous = std::mem::replace(&mut booking.pricing, repriced);
            Ok(Some(audit::entry(
                action,
                actor,
                booking,
                json!({
                    "old_percent": previous.discount_percent,
                    "new_percent": booking.pricing.discount_percent,
                    "old_total": previous.total_amount,
                    "new_total": booking.pricing.total_amount,
                }),
            )))
        });
        let (booking, _) = self.apply(booking_id, action, mutation).await?;
        Ok(booking)
    }

    pub async fn remove_discount(
        &self,
        booking_id: Uuid,
        actor: Actor,
    ) -> Result<Booking, BookingError> {
        self.apply_discount(booking_id, Decimal::ZERO, actor).await
    }

    /// Cap and current discount for a booking's range, from the live policy.
    #[instrument(skip(self))]
    pub async fn discount_limits(&self, booking_id: Uuid) -> Result<DiscountLimits, BookingError> {
        let booking = self.load(booking_id).await?;
        let policy = self.policies.current_policy().await?;
        let mut limits = limits_for(&policy, booking.range(), booking.pricing.discount_percent);
        limits.booking_id = Some(booking_id);
        Ok(limits)
    }

    /// Price a prospective booking with the live rate and policy.
    #[instrument(skip(self))]
    pub async fn preview_price(
        &self,
        billboard_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        discount_percent: Option<Decimal>,
    ) -> Result<PricePreview, BookingError> {
        let range = DateRange::new(start_date, end_date).ok_or_else(|| {
            BookingError::InvalidDateRange(format!(
                "end date {} is before start date {}",
                end_date, start_date
            ))
        })?;
        let discount = pricing::validate_discount(discount_percent.unwrap_or_default())?;

        let billboard = self.billboard(billboard_id).await?;
        if !billboard.is_bookable() {
            return Err(BookingError::BillboardUnavailable(billboard_id));
        }
        let policy = self.policies.current_policy().await?;
        let limits = limits_for(&policy, range, discount);
        if discount > limits.max_discount_percent {
            return Err(BookingError::DiscountExceedsLimit {
                requested: discount,
                max: limits.max_discount_percent,
            });
        }

        let breakdown = pricing::compute(PricingInputs {
            price_per_day: billboard.price_per_day,
            days: range.days(),
            discount_percent: discount,
            commission_percent: policy.commission_percent,
            gst_percent: policy.gst_percent,
        });
        Ok(PricePreview {
            billboard_id,
            start_date: range.start,
            end_date: range.end,
            breakdown,
            discount_limits: limits,
        })
    }

    /// The payment collaborator opened an intent: NOT_PAID | FAILED -> PENDING.
    #[instrument(skip(self))]
    pub async fn initiate_payment(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let mutation: BookingMutation = Box::new(move |booking| {
            match booking.payment_status {
                PaymentStatus::Pending => return Ok(None),
                PaymentStatus::Paid => return Err(BookingError::AlreadyLocked(booking.booking_id)),
                _ => {}
            }
            if booking.status != BookingStatus::Approved {
                return Err(BookingError::invalid_transition(
                    "initiate payment for",
                    booking.status,
                ));
            }
            if !booking.payment_status.can_transition_to(PaymentStatus::Pending) {
                return Err(BookingError::invalid_transition(
                    "initiate payment for",
                    format!("payment {}", booking.payment_status),
                ));
            }
            booking.payment_status = PaymentStatus::Pending;
            Ok(Some(audit::entry(
                AuditAction::PaymentInitiated,
                Actor::PaymentGateway,
                booking,
                json!({ "amount": booking.pricing.total_amount }),
            )))
        });
        let (booking, _) = self
            .apply(booking_id, AuditAction::PaymentInitiated, mutation)
            .await?;
        Ok(booking)
    }

    /// Record a successful payment and lock the price breakdown.
    ///
    /// Replaying the same reference is a no-op; a different reference against
    /// an already paid booking is refused.
    #[instrument(skip(self))]
    pub async fn mark_paid(
        &self,
        booking_id: Uuid,
        payment_reference: &str,
    ) -> Result<Booking, BookingError> {
        let reference = payment_reference.trim().to_string();
        if reference.is_empty() {
            return Err(BookingError::InvalidArgument(
                "payment reference must not be empty".to_string(),
            ));
        }
        let now = self.clock.now();

        let mutation: BookingMutation = Box::new(move |booking| {
            if booking.is_paid() {
                return if booking.payment_reference.as_deref() == Some(reference.as_str()) {
                    Ok(None)
                } else {
                    Err(BookingError::AlreadyLocked(booking.booking_id))
                };
            }
            if booking.status != BookingStatus::Approved {
                return Err(BookingError::invalid_transition("mark paid", booking.status));
            }
            if !booking.payment_status.can_transition_to(PaymentStatus::Paid) {
                return Err(BookingError::invalid_transition(
                    "mark paid",
                    format!("payment {}", booking.payment_status),
                ));
            }

            booking.payment_status = PaymentStatus::Paid;
            booking.payment_reference = Some(reference.clone());
            booking.pricing.locked = true;
            booking.pricing.locked_utc = Some(now);
            let p = &booking.pricing;
            let details = json!({
                "payment_reference": reference,
                "price_per_day": p.price_per_day,
                "discount_percent": p.discount_percent,
                "commission_percent": p.commission_percent,
                "gst_percent": p.gst_percent,
                "total_amount": p.total_amount,
            });
            Ok(Some(audit::entry(
                AuditAction::Paid,
                Actor::PaymentGateway,
                booking,
                details,
            )))
        });

        let (booking, changed) = self.apply(booking_id, AuditAction::Paid, mutation).await?;
        if changed {
            record_locked_amounts(&booking.pricing);
        }
        Ok(booking)
    }

    /// PENDING -> FAILED. The dates stay held until the booking is cancelled
    /// or payment is re-attempted.
    #[instrument(skip(self))]
    pub async fn mark_payment_failed(
        &self,
        booking_id: Uuid,
        reason: &str,
    ) -> Result<Booking, BookingError> {
        let reason = reason.trim().to_string();

        let mutation: BookingMutation = Box::new(move |booking| {
            match booking.payment_status {
                PaymentStatus::Failed => return Ok(None),
                PaymentStatus::Paid => return Err(BookingError::AlreadyLocked(booking.booking_id)),
                _ => {}
            }
            if !booking.payment_status.can_transition_to(PaymentStatus::Failed) {
                return Err(BookingError::invalid_transition(
                    "fail the payment of",
                    format!("{} with payment {}", booking.status, booking.payment_status),
                ));
            }
            booking.payment_status = PaymentStatus::Failed;
            Ok(Some(audit::entry(
                AuditAction::PaymentFailed,
                Actor::PaymentGateway,
                booking,
                json!({ "reason": reason }),
            )))
        });
        let (booking, _) = self
            .apply(booking_id, AuditAction::PaymentFailed, mutation)
            .await?;
        Ok(booking)
    }

    /// Cancel on behalf of the advertiser or the billboard owner.
    ///
    /// Unpaid bookings become CANCELLED and any open payment intent is voided.
    /// Approved and paid bookings become CANCELLED_NO_REFUND and stay PAID.
    #[instrument(skip(self))]
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        actor: Actor,
    ) -> Result<Booking, BookingError> {
        let current = self.load(booking_id).await?;
        let billboard = self.billboard(current.billboard_id).await?;
        let allowed = match actor {
            Actor::User(id) => id == current.advertiser_id || id == billboard.owner_id,
            Actor::System => true,
            Actor::PaymentGateway => false,
        };
        if !allowed {
            return Err(BookingError::Forbidden(
                "only the advertiser or the billboard owner may cancel this booking".to_string(),
            ));
        }

        let mutation: BookingMutation = Box::new(move |booking| {
            if matches!(
                booking.status,
                BookingStatus::Cancelled | BookingStatus::CancelledNoRefund
            ) {
                return Ok(None);
            }

            let target = if booking.is_paid() {
                BookingStatus::CancelledNoRefund
            } else {
                BookingStatus::Cancelled
            };
            if !booking.status.can_transition_to(target) {
                return Err(BookingError::invalid_transition(
                    "cancel",
                    format!("{} with payment {}", booking.status, booking.payment_status),
                ));
            }

            if target == BookingStatus::CancelledNoRefund {
                booking.status = BookingStatus::CancelledNoRefund;
                return Ok(Some(audit::entry(
                    AuditAction::CancelledNoRefund,
                    actor,
                    booking,
                    json!({
                        "refund": false,
                        "retained_amount": booking.pricing.total_amount,
                    }),
                )));
            }

            let voided_intent = booking.payment_status == PaymentStatus::Pending;
            if voided_intent {
                booking.payment_status = PaymentStatus::Failed;
            }
            booking.status = BookingStatus::Cancelled;
            Ok(Some(audit::entry(
                AuditAction::Cancelled,
                actor,
                booking,
                json!({ "refund": false, "voided_payment_intent": voided_intent }),
            )))
        });

        // The audit action is only known once the transition ran; label by outcome.
        let (booking, changed) = self
            .repository
            .update_booking(booking_id, self.stamped(mutation))
            .await?;
        if changed {
            let action = if booking.status == BookingStatus::CancelledNoRefund {
                AuditAction::CancelledNoRefund
            } else {
                AuditAction::Cancelled
            };
            BOOKING_TRANSITIONS_TOTAL
                .with_label_values(&[action.as_str()])
                .inc();
            info!(booking_id = %booking_id, action = %action, "Booking cancelled");
        }
        Ok(booking)
    }

    /// APPROVED + PAID -> COMPLETED once the last booked day is over.
    #[instrument(skip(self))]
    pub async fn complete_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let today = self.clock.today();

        let mutation: BookingMutation = Box::new(move |booking| {
            if booking.status == BookingStatus::Completed {
                return Ok(None);
            }
            if !booking.status.can_transition_to(BookingStatus::Completed) || !booking.is_paid() {
                return Err(BookingError::invalid_transition(
                    "complete",
                    format!("{} with payment {}", booking.status, booking.payment_status),
                ));
            }
            if booking.end_date >= today {
                return Err(BookingError::invalid_transition(
                    "complete",
                    format!("running until {}", booking.end_date),
                ));
            }
            booking.status = BookingStatus::Completed;
            Ok(Some(audit::entry(
                AuditAction::Completed,
                Actor::System,
                booking,
                json!({ "completed_on": today }),
            )))
        });
        let (booking, _) = self
            .apply(booking_id, AuditAction::Completed, mutation)
            .await?;
        Ok(booking)
    }

    /// Complete every booking that has run its course. Returns how many were completed.
    #[instrument(skip(self))]
    pub async fn run_completion_sweep(&self) -> Result<usize, BookingError> {
        let today = self.clock.today();
        let mut completed = 0;

        loop {
            let due = self
                .repository
                .list_completable(today, COMPLETION_BATCH_SIZE)
                .await?;
            let batch = due.len();
            let mut progressed = false;

            for booking_id in due {
                match self.complete_booking(booking_id).await {
                    Ok(_) => {
                        completed += 1;
                        progressed = true;
                    }
                    Err(e) => warn!(booking_id = %booking_id, error = %e, "Failed to complete booking"),
                }
            }

            if !progressed || (batch as i64) < COMPLETION_BATCH_SIZE {
                break;
            }
        }

        if completed > 0 {
            info!(completed, %today, "Completion sweep finished");
        }
        Ok(completed)
    }

    /// Per-day statuses for `[from, to]` on a billboard.
    #[instrument(skip(self))]
    pub async fn get_availability(
        &self,
        billboard_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DayAvailability>, BookingError> {
        let billboard = self.billboard(billboard_id).await?;
        self.availability.get_day_statuses(&billboard, from, to).await
    }

    pub async fn audit_history(&self, booking_id: Uuid) -> Result<Vec<AuditEntry>, BookingError> {
        self.audit_log.history(booking_id).await
    }
}

fn limits_for(policy: &PlatformPolicy, range: DateRange, current: Decimal) -> DiscountLimits {
    let is_weekend_window = range.is_weekend_window();
    DiscountLimits {
        booking_id: None,
        max_discount_percent: policy.max_discount_percent(is_weekend_window),
        current_discount_percent: current,
        is_weekend_window,
    }
}

fn record_locked_amounts(p: &PriceBreakdown) {
    for (component, amount) in [
        ("base", p.base_amount),
        ("commission", p.commission_amount),
        ("gst", p.gst_amount),
        ("total", p.total_amount),
    ] {
        LOCKED_AMOUNT_TOTAL
            .with_label_values(&[component])
            .inc_by(amount.to_f64().unwrap_or_default());
    }
}
