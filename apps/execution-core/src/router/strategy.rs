//! Venue selection strategies.
//!
//! Each strategy turns a non-empty set of eligible venue profiles into one
//! or more [`VenueAllocation`]s. Multi-venue strategies split across at most
//! `max_venues` venues; single-venue strategies pick exactly one.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::models::{RoutingStrategy, VenueAllocation, VenueInfo};

/// Decimal places kept when rounding allocation quantities.
const QTY_SCALE: u32 = 8;

/// Allocate a slice quantity across venues according to the strategy.
///
/// `venues` must be non-empty; the caller guarantees eligibility filtering
/// has already happened.
#[must_use]
pub fn allocate(
    strategy: RoutingStrategy,
    symbol: &str,
    venues: &[VenueInfo],
    quantity: Decimal,
    max_venues: usize,
) -> Vec<VenueAllocation> {
    match strategy {
        RoutingStrategy::BestPrice => best_price(venues, quantity, max_venues),
        RoutingStrategy::LowestLatency => single(
            venues.iter().min_by_key(|v| v.avg_latency),
            quantity,
            |v| format!("lowest latency {}ms", v.avg_latency.as_millis()),
        ),
        RoutingStrategy::HighestFill => single(
            venues
                .iter()
                .max_by(|a, b| a.fill_rate.total_cmp(&b.fill_rate)),
            quantity,
            |v| format!("highest fill rate {:.2}", v.fill_rate),
        ),
        RoutingStrategy::LowestCost => single(
            venues
                .iter()
                .min_by_key(|v| v.fee_rate + v.avg_slippage),
            quantity,
            |v| format!("lowest cost (fee {} + slippage {})", v.fee_rate, v.avg_slippage),
        ),
        RoutingStrategy::Balanced => balanced(venues, quantity, max_venues),
        RoutingStrategy::Liquidity => single(
            venues.iter().max_by_key(|v| v.liquidity_for(symbol)),
            quantity,
            |v| format!("deepest liquidity {}", v.liquidity_for(symbol)),
        ),
    }
}

/// Composite score used by the balanced strategy:
/// reliability x (1 - fee rate) x fill rate x (1 / latency seconds).
#[must_use]
pub fn balanced_score(venue: &VenueInfo) -> f64 {
    let fee = venue.fee_rate.to_f64().unwrap_or(0.0);
    let latency_secs = venue.avg_latency.as_secs_f64().max(0.001);
    venue.reliability * (1.0 - fee) * venue.fill_rate * (1.0 / latency_secs)
}

fn single(
    venue: Option<&VenueInfo>,
    quantity: Decimal,
    reason: impl Fn(&VenueInfo) -> String,
) -> Vec<VenueAllocation> {
    let Some(venue) = venue else {
        return Vec::new();
    };
    vec![VenueAllocation {
        venue_id: venue.venue_id.clone(),
        quantity,
        percentage: 1.0,
        priority: 1,
        reason: reason(venue),
    }]
}

/// Ascending fee rate, even split across the top venues.
fn best_price(venues: &[VenueInfo], quantity: Decimal, max_venues: usize) -> Vec<VenueAllocation> {
    let mut sorted: Vec<&VenueInfo> = venues.iter().collect();
    sorted.sort_by_key(|v| v.fee_rate);
    let top = &sorted[..sorted.len().min(max_venues.max(1))];

    let count = Decimal::from(top.len() as u64);
    let per_venue = (quantity / count).round_dp(QTY_SCALE);
    let mut allocated = Decimal::ZERO;

    top.iter()
        .enumerate()
        .map(|(i, venue)| {
            let qty = if i == top.len() - 1 {
                quantity - allocated
            } else {
                per_venue
            };
            allocated += qty;
            VenueAllocation {
                venue_id: venue.venue_id.clone(),
                quantity: qty,
                percentage: 1.0 / top.len() as f64,
                priority: u8::try_from(i + 1).unwrap_or(u8::MAX),
                reason: format!("fee rate {}", venue.fee_rate),
            }
        })
        .collect()
}

/// Top venues by composite score, allocation proportional to score.
fn balanced(venues: &[VenueInfo], quantity: Decimal, max_venues: usize) -> Vec<VenueAllocation> {
    let mut scored: Vec<(&VenueInfo, f64)> =
        venues.iter().map(|v| (v, balanced_score(v))).collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    let top = &scored[..scored.len().min(max_venues.max(1))];

    let total_score: f64 = top.iter().map(|(_, s)| s).sum();
    if total_score <= 0.0 {
        // All scores degenerate; fall back to an even split.
        let profiles: Vec<VenueInfo> = top.iter().map(|(v, _)| (*v).clone()).collect();
        return best_price(&profiles, quantity, max_venues);
    }

    let mut allocated = Decimal::ZERO;
    top.iter()
        .enumerate()
        .map(|(i, (venue, score))| {
            let share = score / total_score;
            let qty = if i == top.len() - 1 {
                quantity - allocated
            } else {
                (quantity * Decimal::try_from(share).unwrap_or(Decimal::ZERO))
                    .round_dp(QTY_SCALE)
            };
            allocated += qty;
            VenueAllocation {
                venue_id: venue.venue_id.clone(),
                quantity: qty,
                percentage: share,
                priority: u8::try_from(i + 1).unwrap_or(u8::MAX),
                reason: format!("balanced score {score:.4}"),
            }
        })
        .collect()
}
