//! Execution venue adapters.
//!
//! A venue adapter is the boundary to one external execution destination
//! (exchange, dark pool, market maker). Adapters are registered with the
//! [`VenueRegistry`] at startup and may be added or removed at runtime.

mod monitor;
mod paper;
mod registry;

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ChildExecution, OrderSide, TimeInForce};

pub use monitor::VenueMonitor;
pub use paper::PaperVenue;
pub use registry::VenueRegistry;

/// Errors returned by venue adapters.
#[derive(Debug, Error)]
pub enum VenueError {
    /// The venue is not currently accepting orders.
    #[error("venue {0} is unavailable")]
    Unavailable(String),
    /// The venue rejected the child order.
    #[error("venue {venue} rejected order: {reason}")]
    Rejected {
        /// Venue name.
        venue: String,
        /// Venue-supplied rejection reason.
        reason: String,
    },
    /// Transport-level failure talking to the venue.
    #[error("venue {venue} transport error: {message}")]
    Transport {
        /// Venue name.
        venue: String,
        /// Failure description.
        message: String,
    },
}

/// A slice-level child order sent to one venue.
#[derive(Debug, Clone)]
pub struct SliceRequest {
    /// Parent order id.
    pub order_id: Uuid,
    /// Instrument symbol.
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Quantity allocated to this venue.
    pub quantity: Decimal,
    /// Optional limit price.
    pub limit_price: Option<Decimal>,
    /// Decision price used for slippage measurement.
    pub decision_price: Decimal,
    /// Time in force.
    pub time_in_force: TimeInForce,
}

/// Capability interface for one execution destination.
///
/// Implementations must be cheap to query: `latency`, `liquidity`,
/// `fee_rate`, and `is_available` are read on every routing decision and
/// must not perform I/O.
#[async_trait]
pub trait ExecutionVenue: Send + Sync {
    /// Venue identifier.
    fn name(&self) -> &str;

    /// Expected round-trip latency.
    fn latency(&self) -> Duration;

    /// Available liquidity for a symbol.
    fn liquidity(&self, symbol: &str) -> Decimal;

    /// Fee rate as a fraction of notional.
    fn fee_rate(&self) -> Decimal;

    /// Whether the venue currently accepts orders.
    fn is_available(&self) -> bool;

    /// Execute a child order.
    ///
    /// # Errors
    ///
    /// Returns a [`VenueError`] when the venue is unavailable, rejects the
    /// order, or the transport fails. Timeouts are enforced by the caller.
    async fn execute(&self, request: SliceRequest) -> Result<ChildExecution, VenueError>;
}
