//! Risk gate configuration.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::RiskLimits;

/// Risk gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Limits applied to bots registered without explicit overrides.
    #[serde(default)]
    pub default_limits: RiskLimits,
    /// Per-bot limit overrides, registered at startup.
    #[serde(default)]
    pub bot_overrides: HashMap<String, RiskLimits>,
    /// Halt the offending bot (bot-tier breach) or engage the emergency
    /// stop (portfolio-tier breach) automatically on violation.
    #[serde(default = "default_auto_halt")]
    pub auto_halt_on_violation: bool,
    /// Background risk monitor interval (seconds).
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,
    /// Rolling return window length used for VaR and correlation.
    #[serde(default = "default_return_window")]
    pub return_window: usize,
}

const fn default_auto_halt() -> bool {
    true
}

const fn default_monitor_interval_secs() -> u64 {
    10
}

const fn default_return_window() -> usize {
    64
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            default_limits: RiskLimits::default(),
            bot_overrides: HashMap::new(),
            auto_halt_on_violation: default_auto_halt(),
            monitor_interval_secs: default_monitor_interval_secs(),
            return_window: default_return_window(),
        }
    }
}

impl RiskConfig {
    /// Monitor interval as a [`Duration`].
    #[must_use]
    pub const fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RiskConfig::default();
        assert!(config.auto_halt_on_violation);
        assert_eq!(config.monitor_interval(), Duration::from_secs(10));
        assert_eq!(config.return_window, 64);
    }
}
