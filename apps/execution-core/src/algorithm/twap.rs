//! Time-Weighted Average Price slicing.
//!
//! Splits an order into `slice_count` equal slices spaced evenly across the
//! execution window. Slice `i` is scheduled at
//! `start + i * (duration / slice_count)`.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;

use crate::config::TwapConfig;
use crate::models::OrderSlice;

/// Decimal places kept when rounding slice quantities.
const QTY_SCALE: u32 = 8;

/// Build a TWAP release plan.
///
/// The final slice absorbs rounding so that slice quantities sum exactly to
/// `quantity`.
#[must_use]
pub fn plan(
    quantity: Decimal,
    limit_price: Option<Decimal>,
    start: DateTime<Utc>,
    config: &TwapConfig,
) -> Vec<OrderSlice> {
    let count = config.slice_count.max(1) as usize;
    let interval = slice_interval(config);

    let per_slice = (quantity / Decimal::from(count as u64)).round_dp(QTY_SCALE);

    let mut slices = Vec::with_capacity(count);
    let mut allocated = Decimal::ZERO;

    for i in 0..count {
        let scheduled_at = start + interval * i32::try_from(i).unwrap_or(i32::MAX);
        let slice_qty = if i == count - 1 {
            quantity - allocated
        } else {
            per_slice
        };
        allocated += slice_qty;
        slices.push(OrderSlice::new(i, slice_qty, limit_price, scheduled_at));
    }

    slices
}

/// Time between consecutive slices.
fn slice_interval(config: &TwapConfig) -> TimeDelta {
    let total_ms = i64::try_from(config.duration().as_millis()).unwrap_or(i64::MAX);
    TimeDelta::milliseconds(total_ms / i64::from(config.slice_count.max(1)))
}
