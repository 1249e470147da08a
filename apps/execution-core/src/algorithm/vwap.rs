//! Volume-Weighted Average Price slicing.
//!
//! Uses TWAP's temporal skeleton but weights slice sizes by an intraday
//! volume profile instead of splitting equally. A participation cap bounds
//! each slice to a configured fraction of the volume expected in its
//! interval; capped excess rolls into later slices, and any residue lands on
//! the final slice so quantities still sum to the parent order.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;

use crate::config::VwapConfig;
use crate::models::OrderSlice;

/// Decimal places kept when rounding slice quantities.
const QTY_SCALE: u32 = 8;

/// Build a VWAP release plan.
#[must_use]
pub fn plan(
    quantity: Decimal,
    limit_price: Option<Decimal>,
    start: DateTime<Utc>,
    config: &VwapConfig,
) -> Vec<OrderSlice> {
    let count = config.slice_count.max(1) as usize;
    let weights = bucket_weights(config.volume_profile.as_deref(), count);

    let interval = {
        let total_ms = i64::try_from(config.duration().as_millis()).unwrap_or(i64::MAX);
        TimeDelta::milliseconds(total_ms / i64::from(config.slice_count.max(1)))
    };

    // Target quantity and participation cap per bucket.
    let mut targets = Vec::with_capacity(count);
    for weight in &weights {
        let share = Decimal::try_from(*weight).unwrap_or(Decimal::ONE);
        let target = (quantity * share).round_dp(QTY_SCALE);
        let expected_volume = config.expected_window_volume * share;
        let cap = (config.participation_rate * expected_volume).round_dp(QTY_SCALE);
        targets.push((target, cap));
    }

    let mut slices = Vec::with_capacity(count);
    let mut carry = Decimal::ZERO;
    let mut allocated = Decimal::ZERO;

    for (i, (target, cap)) in targets.iter().enumerate() {
        let scheduled_at = start + interval * i32::try_from(i).unwrap_or(i32::MAX);
        let wanted = target + carry;

        let slice_qty = if i == count - 1 {
            // The final slice takes whatever remains, cap notwithstanding,
            // to preserve the quantity-sum invariant.
            quantity - allocated
        } else if wanted > *cap {
            carry = wanted - cap;
            *cap
        } else {
            carry = Decimal::ZERO;
            wanted
        };

        allocated += slice_qty;
        slices.push(OrderSlice::new(i, slice_qty, limit_price, scheduled_at));
    }

    slices
}

/// Resample the configured profile (or the default U-shaped curve) into
/// `count` normalized bucket weights.
fn bucket_weights(profile: Option<&[f64]>, count: usize) -> Vec<f64> {
    let raw: Vec<f64> = match profile {
        Some(p) if !p.is_empty() => resample(p, count),
        _ => u_shape(count),
    };

    let total: f64 = raw.iter().sum();
    if total <= 0.0 {
        return vec![1.0 / count as f64; count];
    }
    raw.iter().map(|w| w / total).collect()
}

/// Default intraday curve: heavier at the open and close, lighter midday.
fn u_shape(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let x = (i as f64 + 0.5) / count as f64;
            1.5 - (std::f64::consts::PI * x).sin()
        })
        .collect()
}

/// Nearest-bucket resampling of an arbitrary-length profile.
fn resample(profile: &[f64], count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let idx = i * profile.len() / count;
            profile[idx.min(profile.len() - 1)].max(0.0)
        })
        .collect()
}
