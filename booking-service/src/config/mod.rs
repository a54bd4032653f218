//! Configuration module for booking-service.

use crate::engine::pricing::MONEY_SCALE;
use crate::models::PlatformPolicy;
use rust_decimal::Decimal;
use service_core::config::{self as core_config, env_or, env_required};
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BookingConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub policy: PolicySource,
    pub completion_sweep: CompletionSweepConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Where commission, GST and discount caps come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySource {
    /// The `platform_policy` table, re-read on every operation.
    Database,
    /// Fixed values from `PLATFORM_*` environment variables.
    Config(PlatformPolicy),
}

#[derive(Debug, Clone)]
pub struct CompletionSweepConfig {
    pub enabled: bool,
    pub interval: Duration,
}

impl BookingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "booking-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: env_required("DATABASE_URL")?,
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: env_or("DATABASE_MIN_CONNECTIONS", 2)?,
            },
            policy: PolicySource::from_env()?,
            completion_sweep: CompletionSweepConfig {
                enabled: env_or("COMPLETION_SWEEP_ENABLED", true)?,
                interval: sweep_interval("COMPLETION_SWEEP_INTERVAL_SECS")?,
            },
        })
    }
}

impl PolicySource {
    pub fn from_env() -> Result<Self, AppError> {
        let source = env_or("POLICY_SOURCE", "database".to_string())?;
        match source.to_ascii_lowercase().as_str() {
            "database" => Ok(PolicySource::Database),
            "config" => {
                let policy = PlatformPolicy {
                    commission_percent: percent("PLATFORM_COMMISSION_PERCENT")?,
                    gst_percent: percent("PLATFORM_GST_PERCENT")?,
                    weekday_max_discount_percent: percent(
                        "PLATFORM_WEEKDAY_MAX_DISCOUNT_PERCENT",
                    )?,
                    weekend_max_discount_percent: percent(
                        "PLATFORM_WEEKEND_MAX_DISCOUNT_PERCENT",
                    )?,
                };
                Ok(PolicySource::Config(policy))
            }
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "POLICY_SOURCE must be 'database' or 'config', got '{}'",
                other
            ))),
        }
    }
}

/// Seconds between completion sweeps; zero is rejected.
fn sweep_interval(key: &str) -> Result<Duration, AppError> {
    let secs: u64 = env_or(key, 3600)?;
    if secs == 0 {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "{} must be at least 1 second",
            key
        )));
    }
    Ok(Duration::from_secs(secs))
}

/// A required percentage in `[0, 100]` with at most two decimals, the precision
/// bookings store it at.
fn percent(key: &str) -> Result<Decimal, AppError> {
    let raw: String = env_required(key)?;
    let value = Decimal::from_str(raw.trim()).map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e))
    })?;
    if value.is_sign_negative() || value > Decimal::ONE_HUNDRED {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "{} must be between 0 and 100, got {}",
            key,
            value
        )));
    }
    let value = value.normalize();
    if value.scale() > MONEY_SCALE {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "{} allows at most {} decimals, got {}",
            key,
            MONEY_SCALE,
            value
        )));
    }
    Ok(value)
}
