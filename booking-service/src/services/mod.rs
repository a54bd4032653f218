//! Services module for booking-service.

pub mod database;
pub mod inventory;
pub mod memory;
pub mod metrics;
pub mod postgres;
pub mod repository;

pub use database::Database;
pub use inventory::{PgPolicyStore, PgRateSource, PolicyStore, RateSource};
pub use memory::{InMemoryBookingRepository, InMemoryPolicyStore, InMemoryRateSource};
pub use metrics::{get_metrics, init_metrics};
pub use postgres::PgBookingRepository;
pub use repository::{BookingMutation, BookingRepository};
