//! Execution algorithms.
//!
//! Each algorithm expands an [`ExecutionOrder`] into a release plan: an
//! ordered list of [`OrderSlice`]s with scheduled release times. The engine
//! worker drives the plan, releasing slices strictly in order.

pub mod iceberg;
pub mod twap;
pub mod vwap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::config::AlgorithmConfig;
use crate::models::{AlgorithmType, ExecutionOrder, OrderSlice};

/// Errors raised while planning an order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlgorithmError {
    /// The order or algorithm parameters do not produce a valid plan.
    #[error("invalid algorithm parameters: {0}")]
    InvalidParameters(String),
}

/// Expand an order into its release plan.
///
/// Market and sniper orders produce a single immediate slice; sniper orders
/// additionally run under the tightened latency budget enforced by the
/// engine. Slice quantities always sum to the order quantity, with rounding
/// absorbed by the final slice.
///
/// # Errors
///
/// Returns [`AlgorithmError::InvalidParameters`] when the order quantity is
/// not positive.
pub fn plan(
    order: &ExecutionOrder,
    config: &AlgorithmConfig,
    start: DateTime<Utc>,
) -> Result<Vec<OrderSlice>, AlgorithmError> {
    if order.quantity <= Decimal::ZERO {
        return Err(AlgorithmError::InvalidParameters(format!(
            "order quantity must be positive, got {}",
            order.quantity
        )));
    }

    let slices = match order.algorithm {
        AlgorithmType::Market | AlgorithmType::Sniper => {
            vec![OrderSlice::new(0, order.quantity, order.limit_price, start)]
        }
        AlgorithmType::Twap => twap::plan(order.quantity, order.limit_price, start, &config.twap),
        AlgorithmType::Vwap => vwap::plan(order.quantity, order.limit_price, start, &config.vwap),
        AlgorithmType::Iceberg => {
            iceberg::plan(order.quantity, order.limit_price, start, &config.iceberg)
        }
    };

    debug_assert_eq!(
        slices.iter().map(|s| s.quantity).sum::<Decimal>(),
        order.quantity,
        "slice quantities must sum to the order quantity"
    );

    Ok(slices)
}
