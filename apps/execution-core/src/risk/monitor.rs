//! Background risk monitoring.
//!
//! Recomputes portfolio risk on a fixed interval, independent of order
//! flow, and raises proactive alerts. This is necessary because drawdown
//! and VaR breaches can occur purely from market movement without any new
//! order being submitted.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use super::RiskGate;

/// Periodic risk monitor task.
pub struct RiskMonitor {
    gate: Arc<RiskGate>,
    interval: Duration,
}

impl RiskMonitor {
    /// Create a monitor over the given gate.
    #[must_use]
    pub const fn new(gate: Arc<RiskGate>, interval: Duration) -> Self {
        Self { gate, interval }
    }

    /// Run until the shutdown signal fires.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(self.interval);
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Risk monitor started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.gate.run_periodic_checks();
                    self.gate.run_stress_test();
                    let risk = self.gate.portfolio_risk();
                    tracing::debug!(
                        exposure = %risk.total_exposure,
                        var_95 = %risk.var_95,
                        concentration = risk.concentration,
                        risk_score = risk.risk_score,
                        "Portfolio risk recomputed"
                    );
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Risk monitor shutting down");
                    break;
                }
            }
        }
    }
}
