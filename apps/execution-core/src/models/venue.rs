//! Venue profile model.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A venue's static and rolling profile.
///
/// Written by the venue monitoring task and execution outcome recording;
/// read by the router on every routing decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueInfo {
    /// Unique venue identifier.
    pub venue_id: String,
    /// Fee rate as a fraction of notional (0.001 = 10 bps).
    pub fee_rate: Decimal,
    /// Minimum accepted order quantity.
    pub min_order_size: Decimal,
    /// Maximum accepted order quantity.
    pub max_order_size: Decimal,
    /// Supported symbols; empty means all symbols.
    pub supported_symbols: Vec<String>,
    /// Available liquidity per symbol.
    pub liquidity: HashMap<String, Decimal>,
    /// Rolling average round-trip latency.
    pub avg_latency: Duration,
    /// Historical fill rate (0.0-1.0).
    pub fill_rate: f64,
    /// Rolling average slippage as a fraction of decision price.
    pub avg_slippage: Decimal,
    /// Reliability score (0.0-1.0).
    pub reliability: f64,
    /// Whether the venue currently accepts orders.
    pub available: bool,
    /// Last successful health check.
    pub last_health_check: Option<DateTime<Utc>>,
}

impl VenueInfo {
    /// Build a profile with neutral rolling statistics.
    #[must_use]
    pub fn new(venue_id: impl Into<String>, fee_rate: Decimal, avg_latency: Duration) -> Self {
        Self {
            venue_id: venue_id.into(),
            fee_rate,
            min_order_size: Decimal::ZERO,
            max_order_size: Decimal::MAX,
            supported_symbols: Vec::new(),
            liquidity: HashMap::new(),
            avg_latency,
            fill_rate: 1.0,
            avg_slippage: Decimal::ZERO,
            reliability: 1.0,
            available: true,
            last_health_check: None,
        }
    }

    /// Restrict the venue to a fixed symbol set.
    #[must_use]
    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        self.supported_symbols = symbols;
        self
    }

    /// Set order size bounds.
    #[must_use]
    pub const fn with_size_bounds(mut self, min: Decimal, max: Decimal) -> Self {
        self.min_order_size = min;
        self.max_order_size = max;
        self
    }

    /// Whether the venue supports a symbol. An empty symbol list means the
    /// venue accepts all symbols.
    #[must_use]
    pub fn supports(&self, symbol: &str) -> bool {
        self.supported_symbols.is_empty() || self.supported_symbols.iter().any(|s| s == symbol)
    }

    /// Available liquidity for a symbol (zero when unknown).
    #[must_use]
    pub fn liquidity_for(&self, symbol: &str) -> Decimal {
        self.liquidity.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    /// Whether a quantity is within the venue's accepted size bounds.
    #[must_use]
    pub fn accepts_quantity(&self, quantity: Decimal) -> bool {
        quantity >= self.min_order_size && quantity <= self.max_order_size
    }
}
