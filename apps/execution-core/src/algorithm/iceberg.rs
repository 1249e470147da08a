//! Iceberg slicing.
//!
//! The order is never shown in full: a visible fraction is released per
//! peak, and the next peak is released only after the previous one
//! completes. An optional randomization factor perturbs each visible size
//! to reduce detectability. All peaks are scheduled immediately; the
//! release-on-fill behavior comes from the engine driving slices strictly
//! in order.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;

use crate::config::IcebergConfig;
use crate::models::OrderSlice;

/// Decimal places kept when rounding peak quantities.
const QTY_SCALE: u32 = 8;

/// Build an iceberg release plan.
///
/// Peak quantities sum exactly to `quantity`; the final peak clips to the
/// remainder.
#[must_use]
pub fn plan(
    quantity: Decimal,
    limit_price: Option<Decimal>,
    start: DateTime<Utc>,
    config: &IcebergConfig,
) -> Vec<OrderSlice> {
    let visible = (quantity * config.visible_fraction).round_dp(QTY_SCALE);
    if visible <= Decimal::ZERO {
        // Degenerate fraction; fall back to a single full-size slice.
        return vec![OrderSlice::new(0, quantity, limit_price, start)];
    }

    let mut rng = rand::rng();
    let mut slices = Vec::new();
    let mut remaining = quantity;
    let mut peak = 0usize;

    while remaining > Decimal::ZERO {
        let target = perturb(visible, config.randomization, &mut rng);
        let peak_qty = target.min(remaining);
        slices.push(OrderSlice::new(peak, peak_qty, limit_price, start));
        remaining -= peak_qty;
        peak += 1;
    }

    slices
}

/// Perturb a visible size by up to +/- `randomization`.
fn perturb(visible: Decimal, randomization: f64, rng: &mut impl Rng) -> Decimal {
    if randomization <= 0.0 {
        return visible;
    }
    let jitter: f64 = rng.random_range(-randomization..=randomization);
    let factor = Decimal::try_from(1.0 + jitter).unwrap_or(Decimal::ONE);
    let perturbed = (visible * factor).round_dp(QTY_SCALE);
    // Never let the perturbation zero out a peak.
    perturbed.max(Decimal::new(1, QTY_SCALE))
}
