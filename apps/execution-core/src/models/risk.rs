//! Risk limit, risk metric, and alert models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-bot risk thresholds.
///
/// Set at registration and hot-updatable by an operator; never mutated by
/// the engine itself. A snapshot is attached to every order at submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Maximum position market value per bot.
    pub max_position_size: Decimal,
    /// Maximum loss allowed within one trading day.
    pub max_daily_loss: Decimal,
    /// Maximum drawdown from peak equity, as a fraction (0.2 = 20%).
    pub max_drawdown_pct: Decimal,
    /// Maximum tolerated consecutive losing trades.
    pub max_consecutive_losses: u32,
    /// Maximum aggregate exposure across all bots.
    pub max_portfolio_exposure: Decimal,
    /// Value-at-Risk (95%) limit for the portfolio.
    pub var_limit: Decimal,
    /// Maximum Herfindahl concentration, as a fraction.
    pub max_concentration_pct: Decimal,
    /// Maximum pairwise correlation between the order's symbol and held
    /// symbols.
    pub max_correlation: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_size: dec!(100_000),
            max_daily_loss: dec!(5_000),
            max_drawdown_pct: dec!(0.20),
            max_consecutive_losses: 5,
            max_portfolio_exposure: dec!(1_000_000),
            var_limit: dec!(50_000),
            max_concentration_pct: dec!(0.40),
            max_correlation: 0.85,
        }
    }
}

/// Rolling, engine-computed risk state for one bot.
///
/// Recomputed on every fill and on the monitoring interval. Mutated only
/// while holding the bot's risk-state lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotRiskMetrics {
    /// Owning bot id.
    pub bot_id: String,
    /// Current gross exposure (sum of absolute position market values).
    pub exposure: Decimal,
    /// Cumulative realized P&L.
    pub realized_pnl: Decimal,
    /// Mark-to-market P&L of open positions.
    pub unrealized_pnl: Decimal,
    /// Realized P&L accumulated today.
    pub daily_pnl: Decimal,
    /// Highest observed equity (cumulative P&L) so far.
    pub peak_equity: Decimal,
    /// Drawdown from peak equity, as a fraction.
    pub drawdown_pct: Decimal,
    /// Current losing streak.
    pub consecutive_losses: u32,
    /// Current winning streak.
    pub consecutive_wins: u32,
    /// Parametric Value-at-Risk (95%) estimate.
    pub var_95: Decimal,
    /// Derived risk score, 0 (idle) to 100 (critical).
    pub risk_score: f64,
    /// Last recompute timestamp.
    pub updated_at: DateTime<Utc>,
}

impl BotRiskMetrics {
    /// Fresh metrics for a newly registered bot.
    #[must_use]
    pub fn new(bot_id: impl Into<String>) -> Self {
        Self {
            bot_id: bot_id.into(),
            exposure: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            daily_pnl: Decimal::ZERO,
            peak_equity: Decimal::ZERO,
            drawdown_pct: Decimal::ZERO,
            consecutive_losses: 0,
            consecutive_wins: 0,
            var_95: Decimal::ZERO,
            risk_score: 0.0,
            updated_at: Utc::now(),
        }
    }
}

/// Portfolio-wide risk aggregation over all bot metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRisk {
    /// Sum of bot exposures.
    pub total_exposure: Decimal,
    /// Sum of bot daily P&L.
    pub total_daily_pnl: Decimal,
    /// Aggregate Value-at-Risk (95%) estimate.
    pub var_95: Decimal,
    /// Herfindahl concentration index over bot exposures (0.0-1.0).
    pub concentration: f64,
    /// Average pairwise correlation across held symbols.
    pub avg_correlation: f64,
    /// Number of registered bots.
    pub bot_count: usize,
    /// Bots currently carrying exposure.
    pub exposed_bots: usize,
    /// Derived portfolio risk score, 0-100.
    pub risk_score: f64,
    /// Computation timestamp.
    pub computed_at: DateTime<Utc>,
}

/// Alert categories raised by the risk gate and monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Portfolio VaR exceeded its limit.
    VarBreach,
    /// Bot drawdown exceeded its limit.
    DrawdownBreach,
    /// Portfolio concentration exceeded its limit.
    ConcentrationBreach,
    /// Bot daily loss exceeded its limit.
    DailyLossBreach,
    /// Bot losing streak reached its limit.
    ConsecutiveLossWarning,
    /// Bot position size exceeded its limit.
    PositionBreach,
    /// Portfolio exposure exceeded its limit.
    ExposureBreach,
    /// Correlation between symbols exceeded its limit.
    CorrelationBreach,
    /// A bot was halted by auto-mitigation or an operator.
    BotHalted,
    /// The system-wide emergency stop engaged.
    EmergencyStop,
}

impl AlertType {
    /// Stable label used for metrics keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::VarBreach => "var_breach",
            Self::DrawdownBreach => "drawdown_breach",
            Self::ConcentrationBreach => "concentration_breach",
            Self::DailyLossBreach => "daily_loss_breach",
            Self::ConsecutiveLossWarning => "consecutive_loss_warning",
            Self::PositionBreach => "position_breach",
            Self::ExposureBreach => "exposure_breach",
            Self::CorrelationBreach => "correlation_breach",
            Self::BotHalted => "bot_halted",
            Self::EmergencyStop => "emergency_stop",
        }
    }
}

/// Alert severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational.
    Low,
    /// Needs attention soon.
    Medium,
    /// Needs attention now.
    High,
    /// Trading-impacting.
    Critical,
}

impl AlertSeverity {
    /// Stable label used for metrics keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Alert lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// Raised, not yet seen by an operator.
    Active,
    /// Seen by an operator.
    Acknowledged,
    /// Underlying condition cleared.
    Resolved,
}

/// A risk alert event.
///
/// The event payload is immutable; only the lifecycle status moves, and only
/// forward (active -> acknowledged -> resolved).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAlert {
    /// Unique alert id.
    pub id: Uuid,
    /// Alert category.
    pub alert_type: AlertType,
    /// Severity.
    pub severity: AlertSeverity,
    /// Subject bot, if bot-scoped.
    pub bot_id: Option<String>,
    /// Subject symbol, if symbol-scoped.
    pub symbol: Option<String>,
    /// Measured value that triggered the alert.
    pub measured: Decimal,
    /// Threshold that was breached.
    pub threshold: Decimal,
    /// Human-readable description.
    pub message: String,
    /// Lifecycle status.
    pub status: AlertStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl RiskAlert {
    /// Create a new active alert.
    #[must_use]
    pub fn new(
        alert_type: AlertType,
        severity: AlertSeverity,
        measured: Decimal,
        threshold: Decimal,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_type,
            severity,
            bot_id: None,
            symbol: None,
            measured,
            threshold,
            message: message.into(),
            status: AlertStatus::Active,
            created_at: Utc::now(),
        }
    }

    /// Scope the alert to a bot.
    #[must_use]
    pub fn for_bot(mut self, bot_id: impl Into<String>) -> Self {
        self.bot_id = Some(bot_id.into());
        self
    }

    /// Scope the alert to a symbol.
    #[must_use]
    pub fn for_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(AlertSeverity::Low < AlertSeverity::Medium);
        assert!(AlertSeverity::Medium < AlertSeverity::High);
        assert!(AlertSeverity::High < AlertSeverity::Critical);
    }

    #[test]
    fn new_alert_is_active() {
        let alert = RiskAlert::new(
            AlertType::VarBreach,
            AlertSeverity::Critical,
            dec!(60_000),
            dec!(50_000),
            "portfolio VaR 60000 exceeds limit 50000",
        )
        .for_bot("bot-a");

        assert_eq!(alert.status, AlertStatus::Active);
        assert_eq!(alert.bot_id.as_deref(), Some("bot-a"));
        assert!(alert.symbol.is_none());
    }

    #[test]
    fn default_limits_are_positive() {
        let limits = RiskLimits::default();
        assert!(limits.max_position_size > Decimal::ZERO);
        assert!(limits.max_daily_loss > Decimal::ZERO);
        assert!(limits.max_drawdown_pct > Decimal::ZERO);
        assert!(limits.max_consecutive_losses > 0);
    }
}
