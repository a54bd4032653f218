#![allow(dead_code)]

use booking_service::config::{
    BookingConfig, CompletionSweepConfig, DatabaseConfig, PolicySource,
};
use booking_service::engine::{BookingEngine, ManualClock};
use booking_service::models::{Billboard, Booking, PlatformPolicy};
use booking_service::services::{
    Database, InMemoryBookingRepository, InMemoryPolicyStore, InMemoryRateSource,
};
use booking_service::startup::Application;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::config::Config as CoreConfig;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Monday 2026-05-04. Saturday is the 9th, Sunday the 10th.
pub const TODAY: &str = "2026-05-04";

pub fn d(s: &str) -> NaiveDate {
    NaiveDate::from_str(s).expect("valid test date")
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid test decimal")
}

/// Commission 15%, GST 18%, weekday cap 30%, weekend cap 20%.
pub fn test_policy() -> PlatformPolicy {
    PlatformPolicy {
        commission_percent: dec("15"),
        gst_percent: dec("18"),
        weekday_max_discount_percent: dec("30"),
        weekend_max_discount_percent: dec("20"),
    }
}

fn test_config(database_url: String, policy: PolicySource) -> BookingConfig {
    BookingConfig {
        common: CoreConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
        },
        service_name: "booking-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "warn".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: database_url,
            max_connections: 8,
            min_connections: 1,
        },
        policy,
        completion_sweep: CompletionSweepConfig {
            enabled: false,
            interval: Duration::from_secs(3600),
        },
    }
}

async fn wait_until_healthy(address: &str) -> reqwest::Client {
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if client.get(format!("{}/health", address)).send().await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    client
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub engine: BookingEngine,
    pub rates: Arc<InMemoryRateSource>,
    pub policies: Arc<InMemoryPolicyStore>,
    pub clock: Arc<ManualClock>,
    pub client: reqwest::Client,
    pub owner_id: Uuid,
    pub advertiser_id: Uuid,
    pub billboard_id: Uuid,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let rates = Arc::new(InMemoryRateSource::new());
        let policies = Arc::new(InMemoryPolicyStore::new(test_policy()));
        let clock = Arc::new(ManualClock::at_day(d(TODAY)));

        let engine = BookingEngine::new(
            Arc::new(InMemoryBookingRepository::new()),
            rates.clone(),
            policies.clone(),
            clock.clone(),
        );

        let config = test_config(String::new(), PolicySource::Config(test_policy()));

        let app = Application::build_with_engine(&config, engine.clone(), None)
            .await
            .expect("Failed to build test application");
        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped(std::future::pending()).await.ok();
        });

        let client = wait_until_healthy(&address).await;

        let owner_id = Uuid::new_v4();
        let billboard_id = Uuid::new_v4();
        rates.upsert(Billboard {
            billboard_id,
            owner_id,
            price_per_day: dec("1000"),
            is_open_for_booking: true,
            admin_blocked: false,
        });

        TestApp {
            address,
            port,
            engine,
            rates,
            policies,
            clock,
            client,
            owner_id,
            advertiser_id: Uuid::new_v4(),
            billboard_id,
        }
    }

    /// Register another open billboard owned by `owner_id`.
    pub fn add_billboard(&self, price_per_day: &str) -> Uuid {
        let billboard_id = Uuid::new_v4();
        self.rates.upsert(Billboard {
            billboard_id,
            owner_id: self.owner_id,
            price_per_day: dec(price_per_day),
            is_open_for_booking: true,
            admin_blocked: false,
        });
        billboard_id
    }

    pub fn owner(&self) -> booking_service::models::Actor {
        booking_service::models::Actor::User(self.owner_id)
    }

    pub fn advertiser(&self) -> booking_service::models::Actor {
        booking_service::models::Actor::User(self.advertiser_id)
    }

    /// Create a PENDING booking on the default billboard.
    pub async fn book(&self, start: &str, end: &str) -> Booking {
        self.engine
            .create_booking(self.billboard_id, self.advertiser_id, d(start), d(end))
            .await
            .expect("booking should be created")
    }

    /// Create, approve and pay for a booking.
    pub async fn book_and_pay(&self, start: &str, end: &str, reference: &str) -> Booking {
        let booking = self.book(start, end).await;
        self.engine
            .approve_booking(booking.booking_id, self.owner())
            .await
            .expect("approve");
        self.engine
            .mark_paid(booking.booking_id, reference)
            .await
            .expect("mark paid")
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

/// The full service built by `Application::build` against PostgreSQL.
///
/// Runs only when `TEST_DATABASE_URL` is set. The service uses the system
/// clock, so dates are offsets from the real current day. Every instance
/// registers its own billboard; the `platform_policy` row is shared and reset
/// to `test_policy()` on spawn.
pub struct PgTestApp {
    pub address: String,
    pub engine: BookingEngine,
    pub db: Database,
    pub client: reqwest::Client,
    pub owner_id: Uuid,
    pub advertiser_id: Uuid,
    pub billboard_id: Uuid,
    pub today: NaiveDate,
}

impl PgTestApp {
    pub async fn spawn() -> Option<Self> {
        let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL is not set; skipping PostgreSQL-backed test");
            return None;
        };

        let app = Application::build(test_config(database_url.clone(), PolicySource::Database))
            .await
            .expect("Failed to build application");
        let engine = app.engine().clone();
        let address = format!("http://127.0.0.1:{}", app.port());

        tokio::spawn(async move {
            app.run_until_stopped(std::future::pending()).await.ok();
        });
        let client = wait_until_healthy(&address).await;

        let db = Database::new(&database_url, 4, 1)
            .await
            .expect("Failed to connect to test database");

        let mut test_app = PgTestApp {
            address,
            engine,
            db,
            client,
            owner_id: Uuid::new_v4(),
            advertiser_id: Uuid::new_v4(),
            billboard_id: Uuid::nil(),
            today: Utc::now().date_naive(),
        };
        test_app.set_policy(&test_policy()).await;
        test_app.billboard_id = test_app.add_billboard("1000").await;
        Some(test_app)
    }

    /// `today + days`.
    pub fn day(&self, days: i64) -> NaiveDate {
        self.today + chrono::Duration::days(days)
    }

    pub async fn add_billboard(&self, price_per_day: &str) -> Uuid {
        let billboard_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO billboards (billboard_id, owner_id, price_per_day) VALUES ($1, $2, $3)",
        )
        .bind(billboard_id)
        .bind(self.owner_id)
        .bind(dec(price_per_day))
        .execute(self.db.pool())
        .await
        .expect("Failed to insert billboard");
        billboard_id
    }

    pub async fn set_price_per_day(&self, price_per_day: &str) {
        sqlx::query("UPDATE billboards SET price_per_day = $2 WHERE billboard_id = $1")
            .bind(self.billboard_id)
            .bind(dec(price_per_day))
            .execute(self.db.pool())
            .await
            .expect("Failed to update billboard price");
    }

    pub async fn set_policy(&self, policy: &PlatformPolicy) {
        sqlx::query(
            r#"
            INSERT INTO platform_policy (
                policy_id, commission_percent, gst_percent,
                weekday_max_discount_percent, weekend_max_discount_percent
            )
            VALUES (1, $1, $2, $3, $4)
            ON CONFLICT (policy_id) DO UPDATE
            SET commission_percent = EXCLUDED.commission_percent,
                gst_percent = EXCLUDED.gst_percent,
                weekday_max_discount_percent = EXCLUDED.weekday_max_discount_percent,
                weekend_max_discount_percent = EXCLUDED.weekend_max_discount_percent,
                updated_utc = NOW()
            "#,
        )
        .bind(policy.commission_percent)
        .bind(policy.gst_percent)
        .bind(policy.weekday_max_discount_percent)
        .bind(policy.weekend_max_discount_percent)
        .execute(self.db.pool())
        .await
        .expect("Failed to write platform policy");
    }

    pub fn owner(&self) -> booking_service::models::Actor {
        booking_service::models::Actor::User(self.owner_id)
    }

    pub async fn book(&self, start: NaiveDate, end: NaiveDate) -> Booking {
        self.engine
            .create_booking(self.billboard_id, self.advertiser_id, start, end)
            .await
            .expect("booking should be created")
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}
