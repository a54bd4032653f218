//! Typed failures of the booking engine.

use crate::services::metrics::ERRORS_TOTAL;
use axum::http::StatusCode;
use rust_decimal::Decimal;
use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; never retried.
    Validation,
    /// Someone else holds the dates, or the booking is in the wrong state.
    Conflict,
    /// Attempt to mutate a locked or terminal booking.
    Locking,
    NotFound,
    Forbidden,
    /// Storage or another collaborator failed; safe to retry.
    Downstream,
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("date range {start} to {end} is unavailable on this billboard")]
    DateRangeUnavailable {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("discount {requested}% exceeds the {max}% limit for this date range")]
    DiscountExceedsLimit { requested: Decimal, max: Decimal },

    #[error("cannot {action} a booking that is {from}")]
    InvalidStateTransition { action: &'static str, from: String },

    #[error("booking {0} is paid and its pricing is locked")]
    AlreadyLocked(Uuid),

    #[error("billboard {0} is not open for booking")]
    BillboardUnavailable(Uuid),

    #[error("booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("billboard {0} not found")]
    BillboardNotFound(Uuid),

    #[error("{0}")]
    Forbidden(String),

    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

impl BookingError {
    pub fn invalid_transition(action: &'static str, from: impl ToString) -> Self {
        BookingError::InvalidStateTransition {
            action,
            from: from.to_string(),
        }
    }

    /// Stable machine-readable code surfaced to API callers.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::InvalidDateRange(_) => "INVALID_DATE_RANGE",
            BookingError::InvalidArgument(_) => "INVALID_ARGUMENT",
            BookingError::DateRangeUnavailable { .. } => "DATE_RANGE_UNAVAILABLE",
            BookingError::DiscountExceedsLimit { .. } => "DISCOUNT_EXCEEDS_LIMIT",
            BookingError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            BookingError::AlreadyLocked(_) => "ALREADY_LOCKED",
            BookingError::BillboardUnavailable(_) => "BILLBOARD_UNAVAILABLE",
            BookingError::BookingNotFound(_) => "BOOKING_NOT_FOUND",
            BookingError::BillboardNotFound(_) => "BILLBOARD_NOT_FOUND",
            BookingError::Forbidden(_) => "FORBIDDEN",
            BookingError::Storage(_) => "STORAGE_FAILURE",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::InvalidDateRange(_)
            | BookingError::InvalidArgument(_)
            | BookingError::DiscountExceedsLimit { .. }
            | BookingError::BillboardUnavailable(_) => ErrorKind::Validation,
            BookingError::DateRangeUnavailable { .. }
            | BookingError::InvalidStateTransition { .. } => ErrorKind::Conflict,
            BookingError::AlreadyLocked(_) => ErrorKind::Locking,
            BookingError::BookingNotFound(_) | BookingError::BillboardNotFound(_) => {
                ErrorKind::NotFound
            }
            BookingError::Forbidden(_) => ErrorKind::Forbidden,
            BookingError::Storage(_) => ErrorKind::Downstream,
        }
    }

    /// Only downstream failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Downstream
    }
}

impl From<sqlx::Error> for BookingError {
    fn from(err: sqlx::Error) -> Self {
        BookingError::Storage(anyhow::Error::new(err))
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        ERRORS_TOTAL.with_label_values(&[err.code()]).inc();
        let status = match err.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Locking => StatusCode::LOCKED,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Downstream => return AppError::DatabaseError(anyhow::anyhow!("{}", err)),
        };
        AppError::rejected(status, err.code(), err.to_string())
    }
}
