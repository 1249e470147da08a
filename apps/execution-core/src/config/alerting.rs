//! Alert channel configuration.

use serde::{Deserialize, Serialize};

/// Alerting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertingConfig {
    /// Webhook endpoint receiving alert payloads, if any.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Emit alerts to the structured log.
    #[serde(default = "default_log_alerts")]
    pub log_alerts: bool,
}

const fn default_log_alerts() -> bool {
    true
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            log_alerts: default_log_alerts(),
        }
    }
}
