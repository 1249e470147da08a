//! Internal risk state: per-bot position accounting and the cross-symbol
//! return tracker used for correlation estimates.

use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::models::{BotRiskMetrics, OrderSide, RiskLimits};

use super::portfolio;

/// One open position held by a bot.
#[derive(Debug, Clone)]
pub(crate) struct Position {
    /// Signed quantity: positive long, negative short.
    pub quantity: Decimal,
    /// Average entry price.
    pub avg_price: Decimal,
    /// Last observed price.
    pub last_price: Decimal,
}

/// Mutable risk state for one bot. Guarded by the bot's own lock; only the
/// risk gate mutates it.
#[derive(Debug)]
pub(crate) struct BotState {
    pub limits: RiskLimits,
    pub metrics: BotRiskMetrics,
    pub positions: HashMap<String, Position>,
    /// Per-fill returns (realized P&L over exposure) for the VaR estimate.
    pub returns: VecDeque<f64>,
}

impl BotState {
    pub(crate) fn new(bot_id: &str, limits: RiskLimits) -> Self {
        Self {
            limits,
            metrics: BotRiskMetrics::new(bot_id),
            positions: HashMap::new(),
            returns: VecDeque::new(),
        }
    }

    /// Fold one fill into the position book and recompute the metrics.
    /// Returns the realized P&L of this fill.
    pub(crate) fn apply_fill(
        &mut self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
        window: usize,
    ) -> Decimal {
        let signed_qty = match side {
            OrderSide::Buy => quantity,
            OrderSide::Sell => -quantity,
        };

        let position = self.positions.entry(symbol.to_string()).or_insert(Position {
            quantity: Decimal::ZERO,
            avg_price: price,
            last_price: price,
        });
        position.last_price = price;

        let realized = if position.quantity.is_zero()
            || position.quantity.is_sign_positive() == signed_qty.is_sign_positive()
        {
            // Opening or increasing: re-average the entry price.
            let total = position.quantity + signed_qty;
            if !total.is_zero() {
                position.avg_price = (position.avg_price * position.quantity.abs()
                    + price * signed_qty.abs())
                    / total.abs();
            }
            position.quantity = total;
            Decimal::ZERO
        } else {
            // Reducing or flipping: realize P&L on the closed quantity.
            let closing = position.quantity.abs().min(signed_qty.abs());
            let direction = if position.quantity.is_sign_positive() {
                Decimal::ONE
            } else {
                Decimal::NEGATIVE_ONE
            };
            let realized = (price - position.avg_price) * closing * direction;

            position.quantity += signed_qty;
            if position.quantity.is_zero() {
                position.avg_price = Decimal::ZERO;
            } else if position.quantity.is_sign_positive()
                != (position.quantity - signed_qty).is_sign_positive()
            {
                // Flipped through zero: the remainder opens at this price.
                position.avg_price = price;
            }
            realized
        };

        if position.quantity.is_zero() {
            self.positions.remove(symbol);
        }

        self.metrics.realized_pnl += realized;
        self.metrics.daily_pnl += realized;

        if realized > Decimal::ZERO {
            self.metrics.consecutive_wins += 1;
            self.metrics.consecutive_losses = 0;
        } else if realized < Decimal::ZERO {
            self.metrics.consecutive_losses += 1;
            self.metrics.consecutive_wins = 0;
        }

        self.recompute();

        if !realized.is_zero() && self.metrics.exposure > Decimal::ZERO {
            let ret = (realized / self.metrics.exposure).to_f64().unwrap_or(0.0);
            self.returns.push_back(ret);
            while self.returns.len() > window {
                self.returns.pop_front();
            }
        }

        realized
    }

    /// Refresh a position's mark price and recompute the metrics.
    pub(crate) fn mark_price(&mut self, symbol: &str, price: Decimal) {
        if let Some(position) = self.positions.get_mut(symbol) {
            position.last_price = price;
            self.recompute();
        }
    }

    /// Recompute exposure, unrealized P&L, drawdown, VaR, and the risk
    /// score from the position book.
    pub(crate) fn recompute(&mut self) {
        self.metrics.exposure = self
            .positions
            .values()
            .map(|p| p.quantity.abs() * p.last_price)
            .sum();

        self.metrics.unrealized_pnl = self
            .positions
            .values()
            .map(|p| (p.last_price - p.avg_price) * p.quantity)
            .sum();

        let equity = self.metrics.realized_pnl + self.metrics.unrealized_pnl;
        if equity > self.metrics.peak_equity {
            self.metrics.peak_equity = equity;
        }
        self.metrics.drawdown_pct = if self.metrics.peak_equity > Decimal::ZERO {
            (self.metrics.peak_equity - equity) / self.metrics.peak_equity
        } else {
            Decimal::ZERO
        };

        let returns: Vec<f64> = self.returns.iter().copied().collect();
        self.metrics.var_95 = portfolio::var_95(&returns, self.metrics.exposure);
        self.metrics.risk_score = self.risk_score();
        self.metrics.updated_at = Utc::now();
    }

    /// Risk score: mean utilization of the bot's limits, scaled to 0-100.
    fn risk_score(&self) -> f64 {
        let ratio = |observed: Decimal, limit: Decimal| -> f64 {
            if limit <= Decimal::ZERO {
                return 0.0;
            }
            (observed / limit).to_f64().unwrap_or(0.0).clamp(0.0, 1.0)
        };

        let exposure = ratio(self.metrics.exposure, self.limits.max_position_size);
        let daily_loss = ratio(
            (-self.metrics.daily_pnl).max(Decimal::ZERO),
            self.limits.max_daily_loss,
        );
        let drawdown = ratio(self.metrics.drawdown_pct, self.limits.max_drawdown_pct);
        let streak = if self.limits.max_consecutive_losses == 0 {
            0.0
        } else {
            (f64::from(self.metrics.consecutive_losses)
                / f64::from(self.limits.max_consecutive_losses))
            .clamp(0.0, 1.0)
        };

        (exposure + daily_loss + drawdown + streak) / 4.0 * 100.0
    }
}

/// Rolling per-symbol return windows used for pairwise correlation.
#[derive(Debug, Default)]
pub(crate) struct ReturnTracker {
    window: usize,
    last_price: HashMap<String, Decimal>,
    returns: HashMap<String, VecDeque<f64>>,
}

impl ReturnTracker {
    pub(crate) fn new(window: usize) -> Self {
        Self {
            window,
            last_price: HashMap::new(),
            returns: HashMap::new(),
        }
    }

    /// Observe a price and record the pct return against the previous one.
    pub(crate) fn observe(&mut self, symbol: &str, price: Decimal) {
        if price <= Decimal::ZERO {
            return;
        }
        if let Some(prev) = self.last_price.insert(symbol.to_string(), price) {
            if prev > Decimal::ZERO {
                let ret = ((price - prev) / prev).to_f64().unwrap_or(0.0);
                let series = self.returns.entry(symbol.to_string()).or_default();
                series.push_back(ret);
                while series.len() > self.window {
                    series.pop_front();
                }
            }
        }
    }

    /// Pearson correlation between two symbols' return windows, if both
    /// have enough history.
    pub(crate) fn correlation(&self, a: &str, b: &str) -> Option<f64> {
        let xs = self.returns.get(a)?;
        let ys = self.returns.get(b)?;
        let n = xs.len().min(ys.len());
        if n < 2 {
            return None;
        }
        let xs: Vec<f64> = xs.iter().rev().take(n).copied().collect();
        let ys: Vec<f64> = ys.iter().rev().take(n).copied().collect();
        portfolio::pearson(&xs, &ys)
    }

    /// Highest correlation between `symbol` and any of `others`.
    pub(crate) fn max_correlation(&self, symbol: &str, others: &[String]) -> Option<(String, f64)> {
        others
            .iter()
            .filter(|other| other.as_str() != symbol)
            .filter_map(|other| {
                self.correlation(symbol, other)
                    .map(|c| (other.clone(), c))
            })
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
    }

    /// Average pairwise correlation across the given symbols.
    pub(crate) fn average_correlation(&self, symbols: &[String]) -> f64 {
        let mut total = 0.0;
        let mut count = 0usize;
        for (i, a) in symbols.iter().enumerate() {
            for b in symbols.iter().skip(i + 1) {
                if let Some(c) = self.correlation(a, b) {
                    total += c;
                    count += 1;
                }
            }
        }
        if count == 0 { 0.0 } else { total / count as f64 }
    }
}
