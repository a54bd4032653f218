//! Callbacks from the payment collaborator.

use crate::dtos::{MarkPaidRequest, PaymentFailedRequest};
use crate::models::Booking;
use crate::startup::AppState;
use axum::extract::{Path, State};
use axum::Json;
use service_core::error::AppError;
use uuid::Uuid;

#[tracing::instrument(skip(state))]
pub async fn initiate_payment(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.engine.initiate_payment(booking_id).await?))
}

#[tracing::instrument(skip(state, body))]
pub async fn mark_paid(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<MarkPaidRequest>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(
        state
            .engine
            .mark_paid(booking_id, &body.payment_reference)
            .await?,
    ))
}

#[tracing::instrument(skip(state, body))]
pub async fn mark_payment_failed(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    body: Option<Json<PaymentFailedRequest>>,
) -> Result<Json<Booking>, AppError> {
    let reason = body.map(|Json(b)| b.reason).unwrap_or_default();
    Ok(Json(
        state
            .engine
            .mark_payment_failed(booking_id, &reason)
            .await?,
    ))
}
