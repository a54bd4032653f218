use crate::config::CompletionSweepConfig;
use crate::engine::BookingEngine;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Periodically completes bookings whose last day has passed.
///
/// A single worker drives the sweep; request handlers never do.
pub struct CompletionWorker {
    config: CompletionSweepConfig,
    engine: BookingEngine,
    shutdown_token: CancellationToken,
}

impl CompletionWorker {
    pub fn new(config: CompletionSweepConfig, engine: BookingEngine) -> Self {
        Self {
            config,
            engine,
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Spawn the sweep loop. Returns `None` when disabled by configuration.
    pub fn start(self) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            tracing::info!("Completion sweep disabled by configuration");
            return None;
        }
        if self.config.interval.is_zero() {
            tracing::error!("Completion sweep interval must be positive; worker not started");
            return None;
        }

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting completion sweep worker"
        );

        Some(tokio::spawn(async move {
            let mut ticker = interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = self.shutdown_token.cancelled() => {
                        tracing::info!("Completion sweep worker shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        match self.engine.run_completion_sweep().await {
                            Ok(completed) => tracing::debug!(completed, "Completion sweep ran"),
                            Err(e) => tracing::error!(error = %e, "Completion sweep failed"),
                        }
                    }
                }
            }
        }))
    }
}
