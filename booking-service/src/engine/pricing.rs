//! Pricing calculator.
//!
//! Pure fixed-point arithmetic at two decimal places. Every product/quotient is
//! rounded half-up before it feeds the next step, so identical inputs always
//! produce identical breakdowns and `total == base + commission + gst` holds
//! exactly.

use super::error::BookingError;
use crate::models::{PriceBreakdown, PricingInputs};
use rust_decimal::{Decimal, RoundingStrategy};

/// Currency subunit precision.
pub const MONEY_SCALE: u32 = 2;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Round to two decimals, halves away from zero (half-up for non-negative amounts).
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Normalise a requested discount. Negative values and more than two decimals
/// are rejected; the same rule applies to previews and persisted changes.
pub fn validate_discount(percent: Decimal) -> Result<Decimal, BookingError> {
    let percent = percent.normalize();
    if percent.is_sign_negative() || percent.scale() > MONEY_SCALE {
        return Err(BookingError::InvalidArgument(format!(
            "discount percent {} must be non-negative with at most two decimals",
            percent
        )));
    }
    Ok(percent)
}

fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    round_money(amount * percent / HUNDRED)
}

/// Compute an unlocked breakdown.
pub fn compute(inputs: PricingInputs) -> PriceBreakdown {
    let price_per_day = round_money(inputs.price_per_day);
    let original_base_amount = round_money(price_per_day * Decimal::from(inputs.days));
    let discount_amount = percent_of(original_base_amount, inputs.discount_percent);
    let base_amount = original_base_amount - discount_amount;
    let commission_amount = percent_of(base_amount, inputs.commission_percent);
    let taxable = base_amount + commission_amount;
    let gst_amount = percent_of(taxable, inputs.gst_percent);
    let total_amount = taxable + gst_amount;

    PriceBreakdown {
        price_per_day,
        days: i32::try_from(inputs.days).unwrap_or(i32::MAX),
        original_base_amount,
        discount_percent: inputs.discount_percent.normalize(),
        discount_amount,
        base_amount,
        commission_percent: inputs.commission_percent.normalize(),
        commission_amount,
        gst_percent: inputs.gst_percent.normalize(),
        gst_amount,
        total_amount,
        locked: false,
        locked_utc: None,
    }
}
