//! Smart order router.
//!
//! Given a slice ready for release, selects one or more venues and splits
//! quantity across them according to the configured strategy. Routing rules
//! (priority-sorted, first match wins) may override the strategy, force a
//! venue, or reject the order before venue selection runs.
//!
//! The router only reads venue state; it never mutates it outside of the
//! periodic venue-monitoring task.

mod rules;
mod strategy;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::config::RouterConfig;
use crate::models::{
    AlgorithmType, ExecutionOrder, OrderSlice, RouterMetrics, RoutingDecision, RoutingStrategy,
    VenueInfo,
};
use crate::observability;
use crate::resilience::BreakerRegistry;
use crate::venue::VenueRegistry;

pub use rules::{RoutingRule, RuleAction, find_match};
pub use strategy::{allocate, balanced_score};

/// Errors returned by the router.
#[derive(Debug, Error)]
pub enum RouterError {
    /// No active venue supports the order.
    #[error("no venue available for {symbol} quantity {quantity}")]
    NoVenueAvailable {
        /// Symbol that could not be routed.
        symbol: String,
        /// Slice quantity.
        quantity: Decimal,
    },
    /// A routing rule rejected the order.
    #[error("routing rule '{rule}' rejected order: {reason}")]
    RuleRejected {
        /// Name of the matching rule.
        rule: String,
        /// Rule-supplied reason.
        reason: String,
    },
}

/// Multi-venue order router.
pub struct SmartOrderRouter {
    registry: Arc<VenueRegistry>,
    breakers: Arc<BreakerRegistry>,
    config: RouterConfig,
    metrics: Mutex<RouterMetrics>,
}

impl SmartOrderRouter {
    /// Create a router. Rules are sorted by priority once at construction.
    #[must_use]
    pub fn new(
        registry: Arc<VenueRegistry>,
        breakers: Arc<BreakerRegistry>,
        mut config: RouterConfig,
    ) -> Self {
        config.rules.sort_by_key(|rule| rule.priority);
        Self {
            registry,
            breakers,
            config,
            metrics: Mutex::new(RouterMetrics::default()),
        }
    }

    /// Route one slice.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::NoVenueAvailable`] when no eligible venue
    /// remains after filtering, or [`RouterError::RuleRejected`] when a
    /// matching rule rejects the order. Either way the router metrics are
    /// updated.
    pub fn route(
        &self,
        slice: &OrderSlice,
        order: &ExecutionOrder,
    ) -> Result<RoutingDecision, RouterError> {
        let mut strategy = self.strategy_for(order);
        let mut forced_venue: Option<String> = None;

        if let Some(rule) = find_match(&self.config.rules, order, slice) {
            match &rule.action {
                RuleAction::UseStrategy {
                    strategy: override_strategy,
                } => {
                    tracing::debug!(
                        rule = %rule.name,
                        strategy = %override_strategy,
                        "Routing rule overrides strategy"
                    );
                    strategy = *override_strategy;
                }
                RuleAction::ForceVenue { venue } => {
                    forced_venue = Some(venue.clone());
                }
                RuleAction::Reject { reason } => {
                    self.record_rejection("rule_rejected");
                    return Err(RouterError::RuleRejected {
                        rule: rule.name.clone(),
                        reason: reason.clone(),
                    });
                }
            }
        }

        // Eligibility: available, symbol supported, size within bounds,
        // circuit breaker closed.
        let mut eligible: Vec<VenueInfo> = self
            .registry
            .eligible(&order.symbol, slice.quantity)
            .into_iter()
            .filter(|info| self.breakers.is_call_permitted(&info.venue_id))
            .collect();

        if let Some(venue) = &forced_venue {
            eligible.retain(|info| &info.venue_id == venue);
        }

        if eligible.is_empty() {
            self.record_rejection("no_venue");
            return Err(RouterError::NoVenueAvailable {
                symbol: order.symbol.clone(),
                quantity: slice.quantity,
            });
        }

        let eligible_count = eligible.len();
        let allocations = allocate(
            strategy,
            &order.symbol,
            &eligible,
            slice.quantity,
            self.config.max_venues_per_order,
        );

        if allocations.is_empty() {
            self.record_rejection("no_venue");
            return Err(RouterError::NoVenueAvailable {
                symbol: order.symbol.clone(),
                quantity: slice.quantity,
            });
        }

        let reference_price = slice
            .limit_price
            .or(order.limit_price)
            .unwrap_or(order.decision_price);

        let estimated_cost = allocations
            .iter()
            .map(|allocation| {
                let fee = eligible
                    .iter()
                    .find(|info| info.venue_id == allocation.venue_id)
                    .map_or(Decimal::ZERO, |info| info.fee_rate);
                allocation.quantity * reference_price * fee
            })
            .sum();

        let estimated_latency = allocations
            .iter()
            .filter_map(|allocation| {
                eligible
                    .iter()
                    .find(|info| info.venue_id == allocation.venue_id)
                    .map(|info| info.avg_latency)
            })
            .max()
            .unwrap_or(Duration::ZERO);

        let decision = RoutingDecision {
            strategy,
            allocations,
            estimated_cost,
            estimated_latency,
            confidence: self.confidence(&eligible, eligible_count),
            decided_at: Utc::now(),
        };

        {
            let mut metrics = self.lock_metrics();
            metrics.record_decision(&decision);
        }
        observability::record_routing_decision(strategy.as_str(), decision.allocations.len());

        tracing::debug!(
            order_id = %order.id,
            slice = slice.slice_number,
            strategy = %strategy,
            venues = decision.allocations.len(),
            "Slice routed"
        );

        Ok(decision)
    }

    /// Snapshot of the router counters.
    #[must_use]
    pub fn metrics(&self) -> RouterMetrics {
        self.lock_metrics().clone()
    }

    /// Strategy for an order: sniper orders always route for latency.
    fn strategy_for(&self, order: &ExecutionOrder) -> RoutingStrategy {
        if order.algorithm == AlgorithmType::Sniper {
            RoutingStrategy::LowestLatency
        } else {
            self.config.strategy
        }
    }

    /// Confidence reflects how deep the eligible venue set is relative to
    /// the configured split width, scaled by average reliability.
    fn confidence(&self, eligible: &[VenueInfo], eligible_count: usize) -> f64 {
        let depth = (eligible_count as f64 / self.config.max_venues_per_order as f64).min(1.0);
        let avg_reliability =
            eligible.iter().map(|v| v.reliability).sum::<f64>() / eligible.len() as f64;
        depth * avg_reliability
    }

    fn record_rejection(&self, reason: &str) {
        self.lock_metrics().record_rejection();
        observability::record_routing_rejection(reason);
    }

    fn lock_metrics(&self) -> std::sync::MutexGuard<'_, RouterMetrics> {
        self.metrics
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
