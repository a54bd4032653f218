use crate::dtos::{AuditHistoryResponse, CreateBookingRequest, DiscountQuery};
use crate::middleware::ActorContext;
use crate::models::{Booking, DiscountLimits};
use crate::startup::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use service_core::error::AppError;
use uuid::Uuid;

#[tracing::instrument(skip(state, body))]
pub async fn create_booking(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let advertiser_id = body.advertiser_id.unwrap_or(actor.user_id);
    if advertiser_id != actor.user_id {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "bookings can only be created on your own behalf"
        )));
    }

    let booking = state
        .engine
        .create_booking(body.billboard_id, advertiser_id, body.start_date, body.end_date)
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[tracing::instrument(skip(state))]
pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.engine.get_booking(booking_id).await?))
}

#[tracing::instrument(skip(state))]
pub async fn approve_booking(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(
        state
            .engine
            .approve_booking(booking_id, actor.actor())
            .await?,
    ))
}

#[tracing::instrument(skip(state))]
pub async fn reject_booking(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(
        state
            .engine
            .reject_booking(booking_id, actor.actor())
            .await?,
    ))
}

#[tracing::instrument(skip(state))]
pub async fn cancel_booking(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(
        state
            .engine
            .cancel_booking(booking_id, actor.actor())
            .await?,
    ))
}

#[tracing::instrument(skip(state))]
pub async fn apply_discount(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(booking_id): Path<Uuid>,
    Query(query): Query<DiscountQuery>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(
        state
            .engine
            .apply_discount(booking_id, query.percent, actor.actor())
            .await?,
    ))
}

#[tracing::instrument(skip(state))]
pub async fn remove_discount(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(
        state
            .engine
            .remove_discount(booking_id, actor.actor())
            .await?,
    ))
}

#[tracing::instrument(skip(state))]
pub async fn discount_limits(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<DiscountLimits>, AppError> {
    Ok(Json(state.engine.discount_limits(booking_id).await?))
}

#[tracing::instrument(skip(state))]
pub async fn audit_history(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<AuditHistoryResponse>, AppError> {
    let entries = state.engine.audit_history(booking_id).await?;
    Ok(Json(AuditHistoryResponse {
        booking_id,
        entries,
    }))
}
