//! Observability configuration.

use serde::{Deserialize, Serialize};

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Start the Prometheus metrics exporter.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// Listen address for the metrics HTTP endpoint.
    #[serde(default = "default_metrics_addr")]
    pub metrics_addr: String,
}

const fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: default_metrics_enabled(),
            metrics_addr: default_metrics_addr(),
        }
    }
}
