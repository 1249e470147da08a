//! Venue health monitoring.
//!
//! A background task that periodically refreshes every venue's profile
//! (availability, latency, fee rate) and force-opens the circuit breaker of
//! a venue that reports itself unavailable. Runs on its own schedule,
//! decoupled from the order-processing path.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::resilience::BreakerRegistry;

use super::VenueRegistry;

/// Periodic venue health monitor.
pub struct VenueMonitor {
    registry: Arc<VenueRegistry>,
    breakers: Arc<BreakerRegistry>,
    interval: Duration,
}

impl VenueMonitor {
    /// Create a new monitor.
    #[must_use]
    pub const fn new(
        registry: Arc<VenueRegistry>,
        breakers: Arc<BreakerRegistry>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            breakers,
            interval,
        }
    }

    /// Run the monitor loop until the shutdown signal fires.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(self.interval);
        // The first tick completes immediately; that initial sweep doubles
        // as the startup health check.
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Venue monitor started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep();
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Venue monitor shutting down");
                    break;
                }
            }
        }
    }

    /// Refresh every registered venue once.
    fn sweep(&self) {
        for venue_id in self.registry.venue_ids() {
            self.registry.refresh_health(&venue_id);

            let available = self
                .registry
                .profile(&venue_id)
                .is_some_and(|p| p.available);
            if !available {
                tracing::warn!(venue = %venue_id, "Venue unavailable, opening circuit");
                self.breakers.for_venue(&venue_id).force_open();
            }
        }
    }
}
