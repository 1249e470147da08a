//! Configuration module for the execution core.
//!
//! Provides configuration loading, validation, and environment variable
//! interpolation for all engine components.
//!
//! # Usage
//!
//! ```rust,ignore
//! use execution_core::config::{Config, load_config};
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("custom/config.yaml"))?;
//! ```

mod alerting;
mod algorithm;
mod engine;
mod observability;
mod risk;
mod router;
mod venues;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use alerting::AlertingConfig;
pub use algorithm::{AlgorithmConfig, IcebergConfig, TwapConfig, VwapConfig};
pub use engine::EngineConfig;
pub use observability::ObservabilityConfig;
pub use risk::RiskConfig;
pub use router::RouterConfig;
pub use venues::{PaperVenueConfig, VenuesConfig};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Worker pool and queue configuration.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Smart order router configuration.
    #[serde(default)]
    pub router: RouterConfig,
    /// Risk gate configuration.
    #[serde(default)]
    pub risk: RiskConfig,
    /// Execution algorithm configuration.
    #[serde(default)]
    pub algorithms: AlgorithmConfig,
    /// Venue adapter configuration.
    #[serde(default)]
    pub venues: VenuesConfig,
    /// Alerting configuration.
    #[serde(default)]
    pub alerting: AlertingConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable
/// interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let mut result = input.to_string();

    // Match ${VAR} or ${VAR:-default} patterns
    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    for cap in re.captures_iter(input) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        let Some(var_match) = cap.get(1) else {
            continue;
        };
        let full_match = full_match.as_str();
        let var_name = var_match.as_str();
        let default_value = cap.get(2).map(|m| m.as_str());

        let value = match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        };

        result = result.replace(full_match, &value);
    }

    result
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.engine.worker_count == 0 {
        return Err(ConfigError::ValidationError(
            "engine.worker_count must be at least 1".to_string(),
        ));
    }

    if config.engine.queue_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "engine.queue_capacity must be at least 1".to_string(),
        ));
    }

    if config.router.max_venues_per_order == 0 {
        return Err(ConfigError::ValidationError(
            "router.max_venues_per_order must be at least 1".to_string(),
        ));
    }

    if config.algorithms.twap.slice_count == 0 {
        return Err(ConfigError::ValidationError(
            "algorithms.twap.slice_count must be at least 1".to_string(),
        ));
    }

    if config.algorithms.vwap.slice_count == 0 {
        return Err(ConfigError::ValidationError(
            "algorithms.vwap.slice_count must be at least 1".to_string(),
        ));
    }

    let participation = config.algorithms.vwap.participation_rate;
    if participation <= Decimal::ZERO || participation > Decimal::ONE {
        return Err(ConfigError::ValidationError(
            "algorithms.vwap.participation_rate must be in (0, 1]".to_string(),
        ));
    }

    let visible = config.algorithms.iceberg.visible_fraction;
    if visible <= Decimal::ZERO || visible > Decimal::ONE {
        return Err(ConfigError::ValidationError(
            "algorithms.iceberg.visible_fraction must be in (0, 1]".to_string(),
        ));
    }

    let randomization = config.algorithms.iceberg.randomization;
    if !(0.0..1.0).contains(&randomization) {
        return Err(ConfigError::ValidationError(
            "algorithms.iceberg.randomization must be in [0, 1)".to_string(),
        ));
    }

    let limits = &config.risk.default_limits;
    if limits.max_position_size <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "risk.default_limits.max_position_size must be positive".to_string(),
        ));
    }

    if limits.max_daily_loss <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "risk.default_limits.max_daily_loss must be positive".to_string(),
        ));
    }

    if limits.max_portfolio_exposure <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "risk.default_limits.max_portfolio_exposure must be positive".to_string(),
        ));
    }

    if config.risk.return_window < 2 {
        return Err(ConfigError::ValidationError(
            "risk.return_window must be at least 2".to_string(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        return Err(ConfigError::ValidationError(format!(
            "observability.metrics_addr '{}' is not a valid socket address",
            config.observability.metrics_addr
        )));
    }

    Ok(())
}
