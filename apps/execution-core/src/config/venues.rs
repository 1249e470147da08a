//! Venue adapter configuration.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Configuration for one simulated (paper) venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperVenueConfig {
    /// Venue identifier.
    pub name: String,
    /// Fee rate as a fraction of notional.
    #[serde(default = "default_fee_rate")]
    pub fee_rate: Decimal,
    /// Simulated round-trip latency (milliseconds).
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    /// Simulated slippage in basis points of the decision price.
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: Decimal,
    /// Probability a call fills (1.0 = always).
    #[serde(default = "default_fill_probability")]
    pub fill_probability: f64,
    /// Supported symbols; empty means all.
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Per-symbol liquidity reported by the venue.
    #[serde(default = "default_liquidity")]
    pub liquidity: Decimal,
}

impl PaperVenueConfig {
    /// Simulated latency as a [`Duration`].
    #[must_use]
    pub const fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

fn default_fee_rate() -> Decimal {
    dec!(0.001)
}

const fn default_latency_ms() -> u64 {
    20
}

fn default_slippage_bps() -> Decimal {
    dec!(2)
}

const fn default_fill_probability() -> f64 {
    1.0
}

fn default_liquidity() -> Decimal {
    dec!(1_000_000)
}

/// Venue configuration bundle.
///
/// Real venue adapters are registered programmatically at startup; the paper
/// section exists for demo runs and tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenuesConfig {
    /// Venue health monitor interval (seconds).
    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,
    /// Simulated venues to register at startup.
    #[serde(default = "default_paper_venues")]
    pub paper: Vec<PaperVenueConfig>,
}

const fn default_monitor_interval_secs() -> u64 {
    15
}

fn default_paper_venues() -> Vec<PaperVenueConfig> {
    vec![
        PaperVenueConfig {
            name: "paper-alpha".to_string(),
            fee_rate: dec!(0.001),
            latency_ms: 20,
            slippage_bps: dec!(2),
            fill_probability: 1.0,
            symbols: Vec::new(),
            liquidity: dec!(1_000_000),
        },
        PaperVenueConfig {
            name: "paper-beta".to_string(),
            fee_rate: dec!(0.002),
            latency_ms: 35,
            slippage_bps: dec!(3),
            fill_probability: 1.0,
            symbols: Vec::new(),
            liquidity: dec!(750_000),
        },
        PaperVenueConfig {
            name: "paper-gamma".to_string(),
            fee_rate: dec!(0.0005),
            latency_ms: 60,
            slippage_bps: dec!(5),
            fill_probability: 1.0,
            symbols: Vec::new(),
            liquidity: dec!(2_000_000),
        },
    ]
}

impl Default for VenuesConfig {
    fn default() -> Self {
        Self {
            monitor_interval_secs: default_monitor_interval_secs(),
            paper: default_paper_venues(),
        }
    }
}

impl VenuesConfig {
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
    fn default_paper_venues_have_distinct_fees() {
        let config = VenuesConfig::default();
        assert_eq!(config.paper.len(), 3);
        let mut fees: Vec<Decimal> = config.paper.iter().map(|v| v.fee_rate).collect();
        fees.dedup();
        assert_eq!(fees.len(), 3);
    }
}
