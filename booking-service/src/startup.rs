//! Application startup and lifecycle management.

use crate::config::{BookingConfig, PolicySource};
use crate::engine::{BookingEngine, SystemClock};
use crate::handlers::{availability, bookings, health_check, metrics_handler, payments, readiness_check};
use crate::middleware::metrics_middleware;
use crate::services::{
    init_metrics, Database, InMemoryPolicyStore, PgBookingRepository, PgPolicyStore,
    PgRateSource, PolicyStore,
};
use crate::workers::CompletionWorker;
use axum::http::Request;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{request_id_middleware, request_id_of};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: BookingEngine,
    pub db: Option<Database>,
    pub service_name: String,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
    worker: Option<CompletionWorker>,
}

impl Application {
    /// Build the application against PostgreSQL.
    pub async fn build(config: BookingConfig) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            e
        })?;

        let policies: Arc<dyn PolicyStore> = match &config.policy {
            PolicySource::Database => {
                tracing::info!("Platform policy read from the database");
                Arc::new(PgPolicyStore::new(db.clone()))
            }
            PolicySource::Config(policy) => {
                tracing::info!(
                    commission_percent = %policy.commission_percent,
                    gst_percent = %policy.gst_percent,
                    "Platform policy read from configuration"
                );
                Arc::new(InMemoryPolicyStore::new(policy.clone()))
            }
        };

        let engine = BookingEngine::new(
            Arc::new(PgBookingRepository::new(db.clone())),
            Arc::new(PgRateSource::new(db.clone())),
            policies,
            Arc::new(SystemClock),
        );

        let worker = CompletionWorker::new(config.completion_sweep.clone(), engine.clone());
        let mut app = Self::build_with_engine(&config, engine, Some(db)).await?;
        app.worker = Some(worker);
        Ok(app)
    }

    /// Build around an already assembled engine. No background worker is started.
    pub async fn build_with_engine(
        config: &BookingConfig,
        engine: BookingEngine,
        db: Option<Database>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let host = config.common.host.as_str();
        let listener = TcpListener::bind((host, config.common.port))
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    host = %host,
                    port = config.common.port,
                    "Failed to bind HTTP listener"
                );
                AppError::from(e)
            })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Booking service listener bound");

        Ok(Self {
            port,
            listener,
            state: AppState {
                engine,
                db,
                service_name: config.service_name.clone(),
            },
            worker: None,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn engine(&self) -> &BookingEngine {
        &self.state.engine
    }

    /// Serve until `signal` resolves, then drain in-flight requests and stop the worker.
    pub async fn run_until_stopped<F>(self, signal: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self
            .worker
            .as_ref()
            .map(CompletionWorker::shutdown_token)
            .unwrap_or_else(CancellationToken::new);
        let worker_handle = self.worker.and_then(CompletionWorker::start);

        let router = router(self.state);

        tracing::info!(
            service = "booking-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        let result = axum::serve(self.listener, router)
            .with_graceful_shutdown(signal)
            .await;

        shutdown.cancel();
        if let Some(handle) = worker_handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Completion sweep worker terminated abnormally");
            }
        }

        result.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/billboards/:billboard_id/availability", get(availability::get_availability))
        .route("/billboards/:billboard_id/price-preview", get(availability::preview_price))
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/:booking_id", get(bookings::get_booking))
        .route("/bookings/:booking_id/approve", post(bookings::approve_booking))
        .route("/bookings/:booking_id/reject", post(bookings::reject_booking))
        .route("/bookings/:booking_id/cancel", post(bookings::cancel_booking))
        .route(
            "/bookings/:booking_id/discount",
            post(bookings::apply_discount).delete(bookings::remove_discount),
        )
        .route("/bookings/:booking_id/discount-limits", get(bookings::discount_limits))
        .route("/bookings/:booking_id/audit", get(bookings::audit_history))
        .route("/bookings/:booking_id/payment/initiate", post(payments::initiate_payment))
        .route("/bookings/:booking_id/payment/paid", post(payments::mark_paid))
        .route("/bookings/:booking_id/payment/failed", post(payments::mark_payment_failed));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .merge(api)
        .route_layer(middleware::from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %req.method(),
                        uri = %req.uri().path(),
                        request_id = %request_id_of(req),
                        user_id = tracing::field::Empty,
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
