//! Simulated venue adapter.
//!
//! Returns deterministic fills without talking to a real venue. Used by
//! demo runs and by unit/integration tests that exercise the full
//! submit-route-execute path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::config::PaperVenueConfig;
use crate::models::{ChildExecution, ExecutionStatus, OrderSide};

use super::{ExecutionVenue, SliceRequest, VenueError};

/// Simulated venue with configurable fee, latency, and failure behavior.
#[derive(Debug)]
pub struct PaperVenue {
    config: PaperVenueConfig,
    available: AtomicBool,
    calls: AtomicU64,
    /// Reject the next N execute calls (failure injection for tests).
    reject_next: AtomicU64,
}

impl PaperVenue {
    /// Create a paper venue from its configuration.
    #[must_use]
    pub fn new(config: PaperVenueConfig) -> Self {
        Self {
            config,
            available: AtomicBool::new(true),
            calls: AtomicU64::new(0),
            reject_next: AtomicU64::new(0),
        }
    }

    /// Toggle availability (simulates an outage).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Reject the next `n` execute calls.
    pub fn reject_next(&self, n: u64) {
        self.reject_next.store(n, Ordering::SeqCst);
    }

    /// Total execute calls observed.
    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Simulated execution price: decision price moved against the order by
    /// the configured slippage.
    fn fill_price(&self, request: &SliceRequest) -> Decimal {
        let slip = request.decision_price * self.config.slippage_bps / dec!(10_000);
        match request.side {
            OrderSide::Buy => request.decision_price + slip,
            OrderSide::Sell => request.decision_price - slip,
        }
    }
}

#[async_trait]
impl ExecutionVenue for PaperVenue {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn latency(&self) -> Duration {
        self.config.latency()
    }

    fn liquidity(&self, _symbol: &str) -> Decimal {
        self.config.liquidity
    }

    fn fee_rate(&self) -> Decimal {
        self.config.fee_rate
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn execute(&self, request: SliceRequest) -> Result<ChildExecution, VenueError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.is_available() {
            return Err(VenueError::Unavailable(self.config.name.clone()));
        }

        // Simulate the venue round trip.
        tokio::time::sleep(self.config.latency()).await;

        let pending_rejects = self.reject_next.load(Ordering::SeqCst);
        if pending_rejects > 0 {
            self.reject_next.store(pending_rejects - 1, Ordering::SeqCst);
            return Err(VenueError::Rejected {
                venue: self.config.name.clone(),
                reason: "injected rejection".to_string(),
            });
        }

        // Deterministic drop pattern derived from the configured fill
        // probability: with probability p, every k-th call fails where
        // k = round(1 / (1 - p)).
        if self.config.fill_probability < 1.0 {
            let failure_every = (1.0 / (1.0 - self.config.fill_probability)).round().max(1.0);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let failure_every = failure_every as u64;
            if call % failure_every == failure_every - 1 {
                return Err(VenueError::Rejected {
                    venue: self.config.name.clone(),
                    reason: "simulated no-fill".to_string(),
                });
            }
        }

        let price = self.fill_price(&request);
        let price = match (request.limit_price, request.side) {
            // A limit buy never fills above its limit, a limit sell never
            // below it.
            (Some(limit), OrderSide::Buy) => price.min(limit),
            (Some(limit), OrderSide::Sell) => price.max(limit),
            (None, _) => price,
        };
        let slippage = (price - request.decision_price).abs();

        Ok(ChildExecution {
            id: Uuid::new_v4(),
            venue: self.config.name.clone(),
            quantity: request.quantity,
            price,
            commission: (request.quantity * price * self.config.fee_rate).round_dp(8),
            slippage,
            latency: self.config.latency(),
            status: ExecutionStatus::Filled,
            executed_at: Utc::now(),
        })
    }
}
