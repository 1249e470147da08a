//! Routing decision and router metrics models.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Venue selection strategy applied by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    /// Ascending fee rate, even split across the top venues.
    BestPrice,
    /// Single venue with minimum latency.
    LowestLatency,
    /// Single venue with the highest historical fill rate.
    HighestFill,
    /// Single venue minimizing fee rate plus average slippage.
    LowestCost,
    /// Composite score, allocation proportional to score.
    Balanced,
    /// Single venue with the greatest liquidity for the symbol.
    Liquidity,
}

impl RoutingStrategy {
    /// Stable label used for metrics keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BestPrice => "best_price",
            Self::LowestLatency => "lowest_latency",
            Self::HighestFill => "highest_fill",
            Self::LowestCost => "lowest_cost",
            Self::Balanced => "balanced",
            Self::Liquidity => "liquidity",
        }
    }
}

impl std::fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One venue's share of a routed slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueAllocation {
    /// Target venue.
    pub venue_id: String,
    /// Quantity allocated to this venue.
    pub quantity: Decimal,
    /// Fraction of the slice quantity (sums to 1.0 across allocations).
    pub percentage: f64,
    /// Execution priority (1 = highest).
    pub priority: u8,
    /// Human-readable selection reason.
    pub reason: String,
}

/// The router's output for one slice. Ephemeral; retained only for metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Strategy that produced the allocations.
    pub strategy: RoutingStrategy,
    /// One or more venue allocations.
    pub allocations: Vec<VenueAllocation>,
    /// Estimated total cost (sum of qty x price x fee rate).
    pub estimated_cost: Decimal,
    /// Estimated latency (max venue latency among allocations).
    pub estimated_latency: Duration,
    /// Confidence score (0.0-1.0) reflecting eligible venue depth.
    pub confidence: f64,
    /// Decision timestamp.
    pub decided_at: DateTime<Utc>,
}

impl RoutingDecision {
    /// Whether the slice was split across more than one venue.
    #[must_use]
    pub fn is_split(&self) -> bool {
        self.allocations.len() > 1
    }
}

/// Aggregate router counters, updated on every routing call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterMetrics {
    /// Total routing decisions attempted.
    pub total_decisions: u64,
    /// Successful decisions per strategy label.
    pub decisions_by_strategy: HashMap<String, u64>,
    /// Decisions that split a slice across multiple venues.
    pub split_orders: u64,
    /// Calls that ended in rejection (no venue, rule rejection).
    pub rejections: u64,
}

impl RouterMetrics {
    /// Record a successful decision.
    pub fn record_decision(&mut self, decision: &RoutingDecision) {
        self.total_decisions += 1;
        *self
            .decisions_by_strategy
            .entry(decision.strategy.as_str().to_string())
            .or_insert(0) += 1;
        if decision.is_split() {
            self.split_orders += 1;
        }
    }

    /// Record a rejected routing call.
    pub fn record_rejection(&mut self) {
        self.total_decisions += 1;
        self.rejections += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn decision(strategy: RoutingStrategy, venues: usize) -> RoutingDecision {
        let allocations = (0..venues)
            .map(|i| VenueAllocation {
                venue_id: format!("venue-{i}"),
                quantity: dec!(10),
                percentage: 1.0 / venues as f64,
                priority: u8::try_from(i + 1).unwrap_or(u8::MAX),
                reason: "test".to_string(),
            })
            .collect();
        RoutingDecision {
            strategy,
            allocations,
            estimated_cost: dec!(0.1),
            estimated_latency: Duration::from_millis(50),
            confidence: 0.9,
            decided_at: Utc::now(),
        }
    }

    #[test]
    fn strategy_serde_uses_snake_case() {
        let json = serde_json::to_string(&RoutingStrategy::BestPrice).unwrap();
        assert_eq!(json, "\"best_price\"");

        let parsed: RoutingStrategy = serde_json::from_str("\"lowest_latency\"").unwrap();
        assert_eq!(parsed, RoutingStrategy::LowestLatency);
    }

    #[test]
    fn single_allocation_is_not_split() {
        assert!(!decision(RoutingStrategy::LowestLatency, 1).is_split());
        assert!(decision(RoutingStrategy::BestPrice, 3).is_split());
    }

    #[test]
    fn metrics_count_decisions_and_splits() {
        let mut metrics = RouterMetrics::default();
        metrics.record_decision(&decision(RoutingStrategy::BestPrice, 3));
        metrics.record_decision(&decision(RoutingStrategy::LowestLatency, 1));
        metrics.record_rejection();

        assert_eq!(metrics.total_decisions, 3);
        assert_eq!(metrics.split_orders, 1);
        assert_eq!(metrics.rejections, 1);
        assert_eq!(metrics.decisions_by_strategy.get("best_price"), Some(&1));
        assert_eq!(
            metrics.decisions_by_strategy.get("lowest_latency"),
            Some(&1)
        );
    }
}
