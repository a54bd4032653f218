//! Rate source and platform policy store adapters.
//!
//! Both are external, read-only state. The engine takes one snapshot per
//! operation and passes it to the pricing calculator explicitly.

use super::database::Database;
use super::metrics::DB_QUERY_DURATION;
use crate::engine::BookingError;
use crate::models::{Billboard, PlatformPolicy};
use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

/// Current per-day price and bookability of billboards.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn get_billboard(&self, billboard_id: Uuid) -> Result<Option<Billboard>, BookingError>;
}

/// Current commission, GST and discount caps.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn current_policy(&self) -> Result<PlatformPolicy, BookingError>;
}

/// Reads billboard listings from the `billboards` table.
#[derive(Clone)]
pub struct PgRateSource {
    db: Database,
}

impl PgRateSource {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RateSource for PgRateSource {
    #[instrument(skip(self), fields(billboard_id = %billboard_id))]
    async fn get_billboard(&self, billboard_id: Uuid) -> Result<Option<Billboard>, BookingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_billboard"])
            .start_timer();

        let billboard = sqlx::query_as::<_, Billboard>(
            r#"
            SELECT billboard_id, owner_id, price_per_day, is_open_for_booking, admin_blocked
            FROM billboards
            WHERE billboard_id = $1
            "#,
        )
        .bind(billboard_id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| BookingError::Storage(anyhow::anyhow!("Failed to get billboard: {}", e)))?;

        timer.observe_duration();

        Ok(billboard)
    }
}

/// Reads the single active row of `platform_policy`.
#[derive(Clone)]
pub struct PgPolicyStore {
    db: Database,
}

impl PgPolicyStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PolicyStore for PgPolicyStore {
    #[instrument(skip(self))]
    async fn current_policy(&self) -> Result<PlatformPolicy, BookingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_platform_policy"])
            .start_timer();

        let policy = sqlx::query_as::<_, PlatformPolicy>(
            r#"
            SELECT commission_percent, gst_percent,
                weekday_max_discount_percent, weekend_max_discount_percent
            FROM platform_policy
            WHERE policy_id = 1
            "#,
        )
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| BookingError::Storage(anyhow::anyhow!("Failed to get platform policy: {}", e)))?;

        timer.observe_duration();

        policy.ok_or_else(|| BookingError::Storage(anyhow::anyhow!("platform_policy row is missing")))
    }
}
