//! Execution algorithm configuration.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Configuration for the TWAP algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwapConfig {
    /// Number of equal slices.
    #[serde(default = "default_slice_count")]
    pub slice_count: u32,
    /// Execution window (seconds).
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
}

impl Default for TwapConfig {
    fn default() -> Self {
        Self {
            slice_count: default_slice_count(),
            duration_secs: default_duration_secs(),
        }
    }
}

impl TwapConfig {
    /// Execution window as a [`Duration`].
    #[must_use]
    pub const fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

/// Configuration for the VWAP algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VwapConfig {
    /// Number of slices (buckets of the volume profile).
    #[serde(default = "default_slice_count")]
    pub slice_count: u32,
    /// Execution window (seconds).
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
    /// Maximum fraction of expected interval volume a slice may take.
    #[serde(default = "default_participation_rate")]
    pub participation_rate: Decimal,
    /// Expected market volume over the whole window, used to bound
    /// participation per interval.
    #[serde(default = "default_expected_window_volume")]
    pub expected_window_volume: Decimal,
    /// Relative intraday volume weights; resampled to `slice_count`
    /// buckets. Defaults to a U-shaped curve when absent.
    #[serde(default)]
    pub volume_profile: Option<Vec<f64>>,
}

impl Default for VwapConfig {
    fn default() -> Self {
        Self {
            slice_count: default_slice_count(),
            duration_secs: default_duration_secs(),
            participation_rate: default_participation_rate(),
            expected_window_volume: default_expected_window_volume(),
            volume_profile: None,
        }
    }
}

impl VwapConfig {
    /// Execution window as a [`Duration`].
    #[must_use]
    pub const fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

/// Configuration for the Iceberg algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IcebergConfig {
    /// Visible fraction of the total quantity per peak.
    #[serde(default = "default_visible_fraction")]
    pub visible_fraction: Decimal,
    /// Randomization factor perturbing each visible size (0.0 disables).
    #[serde(default = "default_randomization")]
    pub randomization: f64,
}

impl Default for IcebergConfig {
    fn default() -> Self {
        Self {
            visible_fraction: default_visible_fraction(),
            randomization: default_randomization(),
        }
    }
}

/// Algorithm configuration bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    /// TWAP settings.
    #[serde(default)]
    pub twap: TwapConfig,
    /// VWAP settings.
    #[serde(default)]
    pub vwap: VwapConfig,
    /// Iceberg settings.
    #[serde(default)]
    pub iceberg: IcebergConfig,
}

const fn default_slice_count() -> u32 {
    10
}

const fn default_duration_secs() -> u64 {
    600
}

fn default_participation_rate() -> Decimal {
    dec!(0.10)
}

fn default_expected_window_volume() -> Decimal {
    dec!(1_000_000)
}

fn default_visible_fraction() -> Decimal {
    dec!(0.05)
}

const fn default_randomization() -> f64 {
    0.2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twap_defaults() {
        let config = TwapConfig::default();
        assert_eq!(config.slice_count, 10);
        assert_eq!(config.duration(), Duration::from_secs(600));
    }

    #[test]
    fn vwap_defaults() {
        let config = VwapConfig::default();
        assert_eq!(config.participation_rate, dec!(0.10));
        assert!(config.volume_profile.is_none());
    }

    #[test]
    fn iceberg_defaults() {
        let config = IcebergConfig::default();
        assert_eq!(config.visible_fraction, dec!(0.05));
        assert!(config.randomization > 0.0);
    }
}
