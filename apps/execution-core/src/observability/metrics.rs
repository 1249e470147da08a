//! Prometheus metrics for the execution core.
//!
//! Provides operational metrics for order submission, execution, routing,
//! risk gating, and alerting.
//!
//! # Example
//!
//! ```ignore
//! use execution_core::observability::{init_metrics, MetricsConfig};
//!
//! let config = MetricsConfig::default();
//! init_metrics(&config).expect("Failed to initialize metrics");
//!
//! // Record an order submission
//! record_order_submission("twap", "accepted");
//! ```

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for latency measurements (in seconds).
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9090".parse().expect("valid default address"),
            // Latency buckets from 100us to 10s
            latency_buckets: vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 10.0,
            ],
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration with a custom address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port
/// already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

// ============================================================================
// Order Metrics
// ============================================================================

/// Record an order submission.
///
/// # Arguments
///
/// * `algorithm` - Algorithm label (e.g., "twap", "market")
/// * `status` - Submission outcome (e.g., "accepted", "rejected", "queue_full")
pub fn record_order_submission(algorithm: &str, status: &str) {
    counter!(
        "order_submissions_total",
        "algorithm" => algorithm.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a terminal order outcome with its processing duration.
pub fn record_order_outcome(algorithm: &str, status: &str, duration_seconds: f64) {
    counter!(
        "order_outcomes_total",
        "algorithm" => algorithm.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        "order_duration_seconds",
        "algorithm" => algorithm.to_string()
    )
    .record(duration_seconds);
}

/// Record a child execution against a venue.
pub fn record_venue_execution(venue: &str, status: &str, latency_seconds: f64) {
    counter!(
        "venue_executions_total",
        "venue" => venue.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        "venue_latency_seconds",
        "venue" => venue.to_string()
    )
    .record(latency_seconds);
}

/// Update the execution queue depth gauge.
pub fn update_queue_depth(depth: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("execution_queue_depth").set(depth as f64);
}

// ============================================================================
// Routing Metrics
// ============================================================================

/// Record a routing decision.
pub fn record_routing_decision(strategy: &str, venue_count: usize) {
    counter!(
        "routing_decisions_total",
        "strategy" => strategy.to_string()
    )
    .increment(1);

    #[allow(clippy::cast_precision_loss)]
    histogram!("routing_venues_per_decision").record(venue_count as f64);
}

/// Record a routing rejection.
pub fn record_routing_rejection(reason: &str) {
    counter!(
        "routing_rejections_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

// ============================================================================
// Risk Metrics
// ============================================================================

/// Record a risk-gate rejection.
pub fn record_risk_rejection(code: &str) {
    counter!(
        "risk_rejections_total",
        "code" => code.to_string()
    )
    .increment(1);
}

/// Record an alert being raised.
pub fn record_alert(alert_type: &str, severity: &str) {
    counter!(
        "risk_alerts_total",
        "type" => alert_type.to_string(),
        "severity" => severity.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_buckets() {
        let config = MetricsConfig::default();
        assert!(!config.latency_buckets.is_empty());
        assert_eq!(config.listen_addr.port(), 9090);
    }

    #[test]
    fn with_addr_overrides_listener() {
        let addr: SocketAddr = "127.0.0.1:9191".parse().unwrap();
        let config = MetricsConfig::with_addr(addr);
        assert_eq!(config.listen_addr, addr);
    }

    #[test]
    fn recording_without_exporter_is_a_noop() {
        // The metrics macros are safe to call before an exporter is installed.
        record_order_submission("twap", "accepted");
        record_venue_execution("alpha", "filled", 0.02);
        record_routing_decision("best_price", 3);
        record_risk_rejection("QUEUE_FULL");
        update_queue_depth(10);
    }
}
