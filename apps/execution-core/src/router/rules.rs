//! Routing rules.
//!
//! Rules are evaluated before venue selection, in ascending priority order;
//! the first matching rule wins. A rule can override the selection strategy,
//! force a specific venue, or reject the order outright.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{ExecutionOrder, OrderSide, OrderSlice, OrderType, RoutingStrategy};

/// Action applied when a rule matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RuleAction {
    /// Override the default selection strategy.
    UseStrategy {
        /// Strategy to apply.
        strategy: RoutingStrategy,
    },
    /// Route the whole slice to one venue.
    ForceVenue {
        /// Target venue id.
        venue: String,
    },
    /// Reject the order.
    Reject {
        /// Rejection reason surfaced to the caller.
        reason: String,
    },
}

/// A conditional routing rule.
///
/// Absent conditions match everything; present conditions must all hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    /// Rule name, surfaced in rejections and logs.
    pub name: String,
    /// Evaluation priority; lower values are evaluated first.
    pub priority: u32,
    /// Match a specific symbol.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Match a specific side.
    #[serde(default)]
    pub side: Option<OrderSide>,
    /// Match slices at or above this quantity.
    #[serde(default)]
    pub min_quantity: Option<Decimal>,
    /// Match slices at or below this quantity.
    #[serde(default)]
    pub max_quantity: Option<Decimal>,
    /// Match a specific order type.
    #[serde(default)]
    pub order_type: Option<OrderType>,
    /// Action applied on match.
    #[serde(flatten)]
    pub action: RuleAction,
}

impl RoutingRule {
    /// Whether this rule matches the order/slice pair.
    #[must_use]
    pub fn matches(&self, order: &ExecutionOrder, slice: &OrderSlice) -> bool {
        if let Some(symbol) = &self.symbol
            && symbol != &order.symbol
        {
            return false;
        }
        if let Some(side) = self.side
            && side != order.side
        {
            return false;
        }
        if let Some(min) = self.min_quantity
            && slice.quantity < min
        {
            return false;
        }
        if let Some(max) = self.max_quantity
            && slice.quantity > max
        {
            return false;
        }
        if let Some(order_type) = self.order_type
            && order_type != order.order_type
        {
            return false;
        }
        true
    }
}

/// Find the first matching rule. `rules` must already be sorted by
/// ascending priority.
#[must_use]
pub fn find_match<'a>(
    rules: &'a [RoutingRule],
    order: &ExecutionOrder,
    slice: &OrderSlice,
) -> Option<&'a RoutingRule> {
    rules.iter().find(|rule| rule.matches(order, slice))
}
