//! Bot-tier risk checks.
//!
//! Each check compares one rolling metric against the bot's limits and
//! returns `Some(RiskViolation)` on breach. Checks never mutate state.

use rust_decimal::Decimal;

use crate::error::ErrorCode;
use crate::models::{AlertSeverity, AlertType, BotRiskMetrics, RiskLimits};

/// One failed risk check, carrying everything needed to reproduce the
/// decision.
#[derive(Debug, Clone)]
pub struct RiskViolation {
    /// Rejection code surfaced to the caller.
    pub code: ErrorCode,
    /// Alert category raised for the breach.
    pub alert_type: AlertType,
    /// Alert severity.
    pub severity: AlertSeverity,
    /// Name of the breached limit.
    pub limit_name: &'static str,
    /// Observed value.
    pub observed: Decimal,
    /// Allowed value.
    pub allowed: Decimal,
}

/// Position size: current exposure plus the candidate order notional must
/// stay within `max_position_size`.
#[must_use]
pub fn check_position_size(
    metrics: &BotRiskMetrics,
    limits: &RiskLimits,
    order_notional: Decimal,
) -> Option<RiskViolation> {
    let projected = metrics.exposure + order_notional;
    if projected > limits.max_position_size {
        return Some(RiskViolation {
            code: ErrorCode::PositionLimitExceeded,
            alert_type: AlertType::PositionBreach,
            severity: AlertSeverity::High,
            limit_name: "max_position_size",
            observed: projected,
            allowed: limits.max_position_size,
        });
    }
    None
}

/// Daily loss: today's realized loss must stay within `max_daily_loss`.
#[must_use]
pub fn check_daily_loss(metrics: &BotRiskMetrics, limits: &RiskLimits) -> Option<RiskViolation> {
    let loss = (-metrics.daily_pnl).max(Decimal::ZERO);
    if loss >= limits.max_daily_loss {
        return Some(RiskViolation {
            code: ErrorCode::DailyLossExceeded,
            alert_type: AlertType::DailyLossBreach,
            severity: AlertSeverity::High,
            limit_name: "max_daily_loss",
            observed: loss,
            allowed: limits.max_daily_loss,
        });
    }
    None
}

/// Losing streak: a bot at or past `max_consecutive_losses` is rejected
/// regardless of order size.
#[must_use]
pub fn check_consecutive_losses(
    metrics: &BotRiskMetrics,
    limits: &RiskLimits,
) -> Option<RiskViolation> {
    if metrics.consecutive_losses >= limits.max_consecutive_losses {
        return Some(RiskViolation {
            code: ErrorCode::ConsecutiveLossLimit,
            alert_type: AlertType::ConsecutiveLossWarning,
            severity: AlertSeverity::Medium,
            limit_name: "max_consecutive_losses",
            observed: Decimal::from(metrics.consecutive_losses),
            allowed: Decimal::from(limits.max_consecutive_losses),
        });
    }
    None
}

/// Drawdown: the bot's drawdown from peak equity must stay within
/// `max_drawdown_pct`.
#[must_use]
pub fn check_drawdown(metrics: &BotRiskMetrics, limits: &RiskLimits) -> Option<RiskViolation> {
    if metrics.drawdown_pct >= limits.max_drawdown_pct {
        return Some(RiskViolation {
            code: ErrorCode::DrawdownExceeded,
            alert_type: AlertType::DrawdownBreach,
            severity: AlertSeverity::High,
            limit_name: "max_drawdown_pct",
            observed: metrics.drawdown_pct,
            allowed: limits.max_drawdown_pct,
        });
    }
    None
}

/// Run every bot-tier check in order, returning the first violation.
#[must_use]
pub fn check_all(
    metrics: &BotRiskMetrics,
    limits: &RiskLimits,
    order_notional: Decimal,
) -> Option<RiskViolation> {
    check_position_size(metrics, limits, order_notional)
        .or_else(|| check_daily_loss(metrics, limits))
        .or_else(|| check_consecutive_losses(metrics, limits))
        .or_else(|| check_drawdown(metrics, limits))
}
