//! Core data model for the execution engine.
//!
//! Orders, slices, child executions, venue profiles, routing decisions,
//! risk limits/metrics, and alerts.

mod order;
mod risk;
mod routing;
mod venue;

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use order::{
    AlgorithmType, ChildExecution, ExecutionOrder, ExecutionStatus, OrderError, OrderRequest,
    OrderSide, OrderSlice, OrderStateMachine, OrderStatus, OrderType, SliceStatus, TimeInForce,
};
pub use risk::{
    AlertSeverity, AlertStatus, AlertType, BotRiskMetrics, PortfolioRisk, RiskAlert, RiskLimits,
};
pub use routing::{RouterMetrics, RoutingDecision, RoutingStrategy, VenueAllocation};
pub use venue::VenueInfo;

/// Final (or partial-final) outcome of one order, pushed to the result
/// stream when the order reaches a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Engine order id.
    pub order_id: Uuid,
    /// Owning bot id.
    pub bot_id: String,
    /// Instrument symbol.
    pub symbol: String,
    /// Algorithm that worked the order.
    pub algorithm: AlgorithmType,
    /// Terminal order status.
    pub status: OrderStatus,
    /// Requested quantity.
    pub requested_quantity: Decimal,
    /// Filled quantity.
    pub filled_quantity: Decimal,
    /// Quantity-weighted average fill price.
    pub avg_fill_price: Decimal,
    /// Cumulative slippage.
    pub total_slippage: Decimal,
    /// Cumulative commission.
    pub total_commission: Decimal,
    /// Distinct venues that produced fills.
    pub venues_used: usize,
    /// Number of child executions (including failed calls).
    pub child_count: usize,
    /// Wall-clock processing duration.
    pub duration: Duration,
    /// Completion timestamp.
    pub completed_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// Build a result from a terminal order.
    #[must_use]
    pub fn from_order(order: &ExecutionOrder) -> Self {
        let completed_at = order.completed_at.unwrap_or_else(Utc::now);
        let duration = completed_at
            .signed_duration_since(order.submitted_at)
            .to_std()
            .unwrap_or_default();
        let mut venues: Vec<&str> = order
            .executions
            .iter()
            .filter(|e| e.is_fill())
            .map(|e| e.venue.as_str())
            .collect();
        venues.sort_unstable();
        venues.dedup();

        Self {
            order_id: order.id,
            bot_id: order.bot_id.clone(),
            symbol: order.symbol.clone(),
            algorithm: order.algorithm,
            status: order.status,
            requested_quantity: order.quantity,
            filled_quantity: order.filled_quantity,
            avg_fill_price: order.avg_fill_price,
            total_slippage: order.total_slippage,
            total_commission: order.total_commission,
            venues_used: venues.len(),
            child_count: order.executions.len(),
            duration,
            completed_at,
        }
    }
}
