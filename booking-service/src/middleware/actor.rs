//! Acting-user context.
//!
//! The gateway authenticates callers and forwards their id in `X-User-ID`;
//! this service only authorizes. Payment callbacks and system jobs do not go
//! through this extractor.

use crate::models::Actor;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorContext {
    pub user_id: Uuid,
}

impl ActorContext {
    pub fn actor(&self) -> Actor {
        Actor::User(self.user_id)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Missing X-User-ID header")))?;

        let user_id = Uuid::parse_str(raw.trim()).map_err(|_| {
            AppError::Unauthorized(anyhow::anyhow!("X-User-ID is not a valid UUID"))
        })?;

        tracing::Span::current().record("user_id", tracing::field::display(user_id));

        Ok(ActorContext { user_id })
    }
}
