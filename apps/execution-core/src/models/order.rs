//! Order, slice, and child-execution models.
//!
//! An [`ExecutionOrder`] is owned exclusively by the engine from submission to
//! terminal status and is immutable once terminal. Status transitions are
//! guarded by [`OrderStateMachine`]; child executions are append-only records.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::risk::RiskLimits;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buy the asset.
    Buy,
    /// Sell the asset.
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Execution algorithm used to work an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmType {
    /// Single immediate execution for the full quantity.
    Market,
    /// Time-weighted slicing over a fixed window.
    Twap,
    /// Volume-weighted slicing with a participation cap.
    Vwap,
    /// Hidden order showing only a visible fraction per peak.
    Iceberg,
    /// Single opportunistic shot under the tightest latency budget.
    Sniper,
}

impl AlgorithmType {
    /// Stable label used for metrics keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Twap => "twap",
            Self::Vwap => "vwap",
            Self::Iceberg => "iceberg",
            Self::Sniper => "sniper",
        }
    }
}

impl std::fmt::Display for AlgorithmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order type forwarded to venues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Execute at the prevailing market price.
    Market,
    /// Execute at the limit price or better.
    Limit,
    /// Trigger a market order at the stop price.
    Stop,
    /// Stop that trails the market price.
    TrailingStop,
}

/// Time-in-force instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    /// Valid for the trading day.
    Day,
    /// Good till canceled.
    Gtc,
    /// Immediate or cancel.
    Ioc,
    /// Fill or kill.
    Fok,
}

/// Lifecycle status of an [`ExecutionOrder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Accepted and queued, not yet picked up by a worker.
    Pending,
    /// Owned by a worker, slices in flight.
    Executing,
    /// Terminal: some but not all quantity filled.
    Partial,
    /// Terminal: full quantity filled.
    Completed,
    /// Terminal: canceled before completion.
    Canceled,
    /// Terminal: no quantity filled.
    Failed,
    /// Terminal: rejected before enqueue.
    Rejected,
}

impl OrderStatus {
    /// Whether this status is terminal (order immutable afterwards).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Partial | Self::Completed | Self::Canceled | Self::Failed | Self::Rejected
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Executing => "executing",
            Self::Partial => "partial",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
        };
        write!(f, "{label}")
    }
}

/// Lifecycle status of an [`OrderSlice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceStatus {
    /// Created, not yet scheduled for release.
    Pending,
    /// Waiting for its release time.
    Scheduled,
    /// Routed and executing against venues.
    Executing,
    /// Terminal: filled (fully or partially).
    Filled,
    /// Terminal: canceled before release.
    Canceled,
    /// Terminal: no venue produced a fill.
    Failed,
}

impl SliceStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Canceled | Self::Failed)
    }
}

/// Outcome of a single venue execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Full allocated quantity filled.
    Filled,
    /// Partial quantity filled.
    PartiallyFilled,
    /// Rejected by the venue.
    Rejected,
    /// Venue call exceeded its latency budget.
    TimedOut,
}

/// Immutable record of one execution against one venue.
///
/// Append-only: never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildExecution {
    /// Unique execution id.
    pub id: Uuid,
    /// Venue that produced this execution.
    pub venue: String,
    /// Filled quantity (zero for rejected/timed-out calls).
    pub quantity: Decimal,
    /// Execution price.
    pub price: Decimal,
    /// Commission charged by the venue.
    pub commission: Decimal,
    /// Slippage versus the decision price.
    pub slippage: Decimal,
    /// Round-trip latency of the venue call.
    pub latency: Duration,
    /// Outcome of the venue call.
    pub status: ExecutionStatus,
    /// Execution timestamp.
    pub executed_at: DateTime<Utc>,
}

impl ChildExecution {
    /// Build a zero-quantity record for a failed venue call.
    #[must_use]
    pub fn failed(venue: &str, status: ExecutionStatus, latency: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            venue: venue.to_string(),
            quantity: Decimal::ZERO,
            price: Decimal::ZERO,
            commission: Decimal::ZERO,
            slippage: Decimal::ZERO,
            latency,
            status,
            executed_at: Utc::now(),
        }
    }

    /// Whether any quantity was filled.
    #[must_use]
    pub fn is_fill(&self) -> bool {
        self.quantity > Decimal::ZERO
            && matches!(
                self.status,
                ExecutionStatus::Filled | ExecutionStatus::PartiallyFilled
            )
    }
}

/// A planned fragment of an order.
///
/// Slices belong to exactly one parent order; their quantities sum to the
/// parent's requested quantity (rounding absorbed by the final slice).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSlice {
    /// Slice number (0-indexed).
    pub slice_number: usize,
    /// Target quantity for this slice.
    pub quantity: Decimal,
    /// Optional limit price.
    pub limit_price: Option<Decimal>,
    /// Scheduled release time (always >= the parent's submission time).
    pub scheduled_at: DateTime<Utc>,
    /// Slice lifecycle status.
    pub status: SliceStatus,
}

impl OrderSlice {
    /// Create a new pending slice.
    #[must_use]
    pub const fn new(
        slice_number: usize,
        quantity: Decimal,
        limit_price: Option<Decimal>,
        scheduled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            slice_number,
            quantity,
            limit_price,
            scheduled_at,
            status: SliceStatus::Pending,
        }
    }
}

/// Trading intent submitted by a strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Caller-supplied correlation id.
    pub client_order_id: Option<String>,
    /// Owning strategy (bot) id.
    pub bot_id: String,
    /// Instrument symbol.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Execution algorithm.
    pub algorithm: AlgorithmType,
    /// Venue order type.
    pub order_type: OrderType,
    /// Requested quantity.
    pub quantity: Decimal,
    /// Limit price, required for limit orders.
    pub limit_price: Option<Decimal>,
    /// The strategy's reference price at decision time, used for slippage
    /// measurement and cost estimation.
    pub decision_price: Decimal,
    /// Time in force.
    pub time_in_force: TimeInForce,
}

/// An order owned by the engine from submission to terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOrder {
    /// Engine-assigned order id.
    pub id: Uuid,
    /// Caller-supplied correlation id.
    pub client_order_id: Option<String>,
    /// Owning strategy (bot) id.
    pub bot_id: String,
    /// Instrument symbol.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Execution algorithm.
    pub algorithm: AlgorithmType,
    /// Venue order type.
    pub order_type: OrderType,
    /// Requested quantity.
    pub quantity: Decimal,
    /// Limit price, if any.
    pub limit_price: Option<Decimal>,
    /// The strategy's reference price at decision time.
    pub decision_price: Decimal,
    /// Time in force.
    pub time_in_force: TimeInForce,
    /// Risk limits in force at submission time.
    pub risk_snapshot: RiskLimits,
    /// Quantity filled so far.
    pub filled_quantity: Decimal,
    /// Quantity-weighted average fill price.
    pub avg_fill_price: Decimal,
    /// Cumulative slippage across fills.
    pub total_slippage: Decimal,
    /// Cumulative commission across fills.
    pub total_commission: Decimal,
    /// Append-only child executions.
    pub executions: Vec<ChildExecution>,
    /// Order lifecycle status.
    pub status: OrderStatus,
    /// Submission timestamp.
    pub submitted_at: DateTime<Utc>,
    /// Terminal timestamp, set once.
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExecutionOrder {
    /// Build an order from a request, attaching the risk snapshot taken at
    /// submission time.
    #[must_use]
    pub fn from_request(request: OrderRequest, risk_snapshot: RiskLimits) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_order_id: request.client_order_id,
            bot_id: request.bot_id,
            symbol: request.symbol,
            side: request.side,
            algorithm: request.algorithm,
            order_type: request.order_type,
            quantity: request.quantity,
            limit_price: request.limit_price,
            decision_price: request.decision_price,
            time_in_force: request.time_in_force,
            risk_snapshot,
            filled_quantity: Decimal::ZERO,
            avg_fill_price: Decimal::ZERO,
            total_slippage: Decimal::ZERO,
            total_commission: Decimal::ZERO,
            executions: Vec::new(),
            status: OrderStatus::Pending,
            submitted_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Remaining unfilled quantity.
    #[must_use]
    pub fn remaining_quantity(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }

    /// Append a child execution and roll its fill into the order state.
    ///
    /// The average fill price is recomputed as the quantity-weighted mean
    /// over all fills.
    pub fn record_execution(&mut self, execution: ChildExecution) {
        if execution.is_fill() {
            let prev_notional = self.avg_fill_price * self.filled_quantity;
            let fill_notional = execution.price * execution.quantity;
            self.filled_quantity += execution.quantity;
            if self.filled_quantity > Decimal::ZERO {
                self.avg_fill_price = (prev_notional + fill_notional) / self.filled_quantity;
            }
            self.total_slippage += execution.slippage;
            self.total_commission += execution.commission;
        }
        self.executions.push(execution);
    }

    /// Transition to a new status, enforcing the order state machine.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidStateTransition`] for disallowed moves.
    pub fn transition(&mut self, to: OrderStatus) -> Result<(), OrderError> {
        OrderStateMachine::validate_transition(self.status, to)?;
        self.status = to;
        if to.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}

/// Errors raised by order lifecycle operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// A disallowed status transition was attempted.
    #[error("invalid order transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },
}

/// Validates order status transitions.
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Check if a status transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        matches!(
            (from, to),
            // From Pending
            (OrderStatus::Pending, OrderStatus::Executing)
                | (OrderStatus::Pending, OrderStatus::Rejected)
                | (OrderStatus::Pending, OrderStatus::Canceled)
                // From Executing
                | (OrderStatus::Executing, OrderStatus::Completed)
                | (OrderStatus::Executing, OrderStatus::Partial)
                | (OrderStatus::Executing, OrderStatus::Failed)
                | (OrderStatus::Executing, OrderStatus::Canceled)
        )
    }

    /// Validate a status transition.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition is invalid.
    pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(OrderError::InvalidStateTransition { from, to })
        }
    }

    /// All valid next statuses from a given status.
    #[must_use]
    pub fn valid_next_states(from: OrderStatus) -> Vec<OrderStatus> {
        match from {
            OrderStatus::Pending => vec![
                OrderStatus::Executing,
                OrderStatus::Rejected,
                OrderStatus::Canceled,
            ],
            OrderStatus::Executing => vec![
                OrderStatus::Completed,
                OrderStatus::Partial,
                OrderStatus::Failed,
                OrderStatus::Canceled,
            ],
            // Terminal states
            OrderStatus::Partial
            | OrderStatus::Completed
            | OrderStatus::Canceled
            | OrderStatus::Failed
            | OrderStatus::Rejected => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_request() -> OrderRequest {
        OrderRequest {
            client_order_id: Some("cli-1".to_string()),
            bot_id: "bot-a".to_string(),
            symbol: "BTC-USD".to_string(),
            side: OrderSide::Buy,
            algorithm: AlgorithmType::Twap,
            order_type: OrderType::Market,
            quantity: dec!(10),
            limit_price: None,
            decision_price: dec!(100),
            time_in_force: TimeInForce::Day,
        }
    }

    fn fill(venue: &str, quantity: Decimal, price: Decimal) -> ChildExecution {
        ChildExecution {
            id: Uuid::new_v4(),
            venue: venue.to_string(),
            quantity,
            price,
            commission: dec!(0.1),
            slippage: dec!(0.02),
            latency: Duration::from_millis(20),
            status: ExecutionStatus::Filled,
            executed_at: Utc::now(),
        }
    }

    #[test]
    fn order_from_request_starts_pending() {
        let order = ExecutionOrder::from_request(sample_request(), RiskLimits::default());
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.filled_quantity, Decimal::ZERO);
        assert_eq!(order.remaining_quantity(), dec!(10));
        assert!(order.completed_at.is_none());
    }

    #[test]
    fn record_execution_weighted_average() {
        let mut order = ExecutionOrder::from_request(sample_request(), RiskLimits::default());

        order.record_execution(fill("alpha", dec!(4), dec!(100)));
        order.record_execution(fill("beta", dec!(6), dec!(110)));

        assert_eq!(order.filled_quantity, dec!(10));
        // (4*100 + 6*110) / 10 = 106
        assert_eq!(order.avg_fill_price, dec!(106));
        assert_eq!(order.executions.len(), 2);
    }

    #[test]
    fn failed_execution_does_not_move_fill_state() {
        let mut order = ExecutionOrder::from_request(sample_request(), RiskLimits::default());

        order.record_execution(ChildExecution::failed(
            "alpha",
            ExecutionStatus::TimedOut,
            Duration::from_millis(500),
        ));

        assert_eq!(order.filled_quantity, Decimal::ZERO);
        assert_eq!(order.avg_fill_price, Decimal::ZERO);
        assert_eq!(order.executions.len(), 1);
    }

    #[test]
    fn valid_lifecycle_transitions() {
        let mut order = ExecutionOrder::from_request(sample_request(), RiskLimits::default());

        order.transition(OrderStatus::Executing).unwrap();
        order.transition(OrderStatus::Completed).unwrap();

        assert_eq!(order.status, OrderStatus::Completed);
        assert!(order.completed_at.is_some());
    }

    #[test]
    fn terminal_orders_reject_transitions() {
        let mut order = ExecutionOrder::from_request(sample_request(), RiskLimits::default());
        order.transition(OrderStatus::Executing).unwrap();
        order.transition(OrderStatus::Partial).unwrap();

        let err = order.transition(OrderStatus::Completed).unwrap_err();
        assert_eq!(
            err,
            OrderError::InvalidStateTransition {
                from: OrderStatus::Partial,
                to: OrderStatus::Completed,
            }
        );
    }

    #[test]
    fn order_round_trips_through_json() {
        let order = ExecutionOrder::from_request(sample_request(), RiskLimits::default());
        let json = serde_json::to_string(&order).unwrap();
        let parsed: ExecutionOrder = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.id, order.id);
        assert_eq!(parsed.status, OrderStatus::Pending);
        assert_eq!(parsed.quantity, order.quantity);
    }

    #[test]
    fn pending_cannot_jump_to_completed() {
        assert!(!OrderStateMachine::is_valid_transition(
            OrderStatus::Pending,
            OrderStatus::Completed
        ));
    }

    #[test]
    fn terminal_states_have_no_next_states() {
        for status in [
            OrderStatus::Completed,
            OrderStatus::Partial,
            OrderStatus::Canceled,
            OrderStatus::Failed,
            OrderStatus::Rejected,
        ] {
            assert!(OrderStateMachine::valid_next_states(status).is_empty());
            assert!(status.is_terminal());
        }
    }
}
