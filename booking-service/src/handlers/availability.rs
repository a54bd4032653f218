use crate::dtos::{AvailabilityResponse, DateWindowQuery, PricePreviewQuery};
use crate::engine::PricePreview;
use crate::startup::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use service_core::error::AppError;
use uuid::Uuid;

#[tracing::instrument(skip(state))]
pub async fn get_availability(
    State(state): State<AppState>,
    Path(billboard_id): Path<Uuid>,
    Query(query): Query<DateWindowQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let days = state
        .engine
        .get_availability(billboard_id, query.from, query.to)
        .await?;

    Ok(Json(AvailabilityResponse {
        billboard_id,
        from: query.from,
        to: query.to,
        days,
    }))
}

#[tracing::instrument(skip(state))]
pub async fn preview_price(
    State(state): State<AppState>,
    Path(billboard_id): Path<Uuid>,
    Query(query): Query<PricePreviewQuery>,
) -> Result<Json<PricePreview>, AppError> {
    let preview = state
        .engine
        .preview_price(billboard_id, query.from, query.to, query.discount_percent)
        .await?;
    Ok(Json(preview))
}
