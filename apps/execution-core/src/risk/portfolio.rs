//! Portfolio-tier risk math and checks.
//!
//! Aggregate checks across all bots: total exposure, parametric VaR,
//! Herfindahl concentration, and pairwise correlation.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::ErrorCode;
use crate::models::{AlertSeverity, AlertType, RiskLimits};

use super::bot::RiskViolation;

/// z-score for the 95% confidence level.
const Z_95: f64 = 1.645;

/// Adverse price shocks applied by the periodic stress test, as fractions
/// of current exposure.
pub const STRESS_SCENARIOS: [(&str, f64); 3] =
    [("5% shock", 0.05), ("10% shock", 0.10), ("20% shock", 0.20)];

/// Projected loss of the portfolio under a uniform adverse price shock.
///
/// Every position moves against its holder by `shock`, so the loss is
/// linear in gross exposure.
#[must_use]
pub fn stressed_loss(total_exposure: Decimal, shock: f64) -> Decimal {
    if total_exposure <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    total_exposure * Decimal::try_from(shock).unwrap_or(Decimal::ZERO)
}

/// Sample standard deviation.
#[must_use]
pub fn std_dev(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

/// Pearson correlation coefficient of two equally long series.
#[must_use]
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Parametric VaR at 95%: `z * sigma(returns) * exposure`.
#[must_use]
pub fn var_95(returns: &[f64], exposure: Decimal) -> Decimal {
    let sigma = std_dev(returns);
    if sigma <= 0.0 || exposure <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let var = Z_95 * sigma * exposure.to_f64().unwrap_or(0.0);
    Decimal::try_from(var).unwrap_or(Decimal::ZERO)
}

/// Herfindahl concentration index over exposures: the sum of squared
/// shares, in (0, 1]. A single dominant position approaches 1.
#[must_use]
pub fn herfindahl(exposures: &[Decimal]) -> f64 {
    let total: Decimal = exposures.iter().copied().sum();
    if total <= Decimal::ZERO {
        return 0.0;
    }
    exposures
        .iter()
        .map(|e| {
            let share = (*e / total).to_f64().unwrap_or(0.0);
            share * share
        })
        .sum()
}

/// Total exposure including the candidate order must stay within
/// `max_portfolio_exposure`.
#[must_use]
pub fn check_exposure(
    total_exposure: Decimal,
    order_notional: Decimal,
    limits: &RiskLimits,
) -> Option<RiskViolation> {
    let projected = total_exposure + order_notional;
    if projected > limits.max_portfolio_exposure {
        return Some(RiskViolation {
            code: ErrorCode::PortfolioExposureExceeded,
            alert_type: AlertType::ExposureBreach,
            severity: AlertSeverity::Critical,
            limit_name: "max_portfolio_exposure",
            observed: projected,
            allowed: limits.max_portfolio_exposure,
        });
    }
    None
}

/// Aggregate VaR must stay within `var_limit`.
#[must_use]
pub fn check_var(portfolio_var: Decimal, limits: &RiskLimits) -> Option<RiskViolation> {
    if portfolio_var > limits.var_limit {
        return Some(RiskViolation {
            code: ErrorCode::VarLimitExceeded,
            alert_type: AlertType::VarBreach,
            severity: AlertSeverity::Critical,
            limit_name: "var_limit",
            observed: portfolio_var,
            allowed: limits.var_limit,
        });
    }
    None
}

/// Herfindahl concentration must stay within `max_concentration_pct`.
#[must_use]
pub fn check_concentration(concentration: f64, limits: &RiskLimits) -> Option<RiskViolation> {
    let limit = limits.max_concentration_pct.to_f64().unwrap_or(1.0);
    if concentration > limit {
        return Some(RiskViolation {
            code: ErrorCode::ConcentrationExceeded,
            alert_type: AlertType::ConcentrationBreach,
            severity: AlertSeverity::High,
            limit_name: "max_concentration_pct",
            observed: Decimal::try_from(concentration).unwrap_or(Decimal::ZERO),
            allowed: limits.max_concentration_pct,
        });
    }
    None
}

/// Pairwise correlation between the order's symbol and held symbols must
/// stay within `max_correlation`.
#[must_use]
pub fn check_correlation(
    max_observed: Option<(String, f64)>,
    limits: &RiskLimits,
) -> Option<RiskViolation> {
    let (_, correlation) = max_observed?;
    if correlation.abs() > limits.max_correlation {
        return Some(RiskViolation {
            code: ErrorCode::CorrelationExceeded,
            alert_type: AlertType::CorrelationBreach,
            severity: AlertSeverity::High,
            limit_name: "max_correlation",
            observed: Decimal::try_from(correlation).unwrap_or(Decimal::ZERO),
            allowed: Decimal::try_from(limits.max_correlation).unwrap_or(Decimal::ONE),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn stressed_loss_is_linear_in_exposure() {
        assert_eq!(stressed_loss(dec!(100_000), 0.10), dec!(10_000));
        assert_eq!(stressed_loss(Decimal::ZERO, 0.10), Decimal::ZERO);
        assert_eq!(stressed_loss(dec!(-5), 0.10), Decimal::ZERO);
    }

    #[test]
    fn std_dev_of_constant_series_is_zero() {
        assert!(std_dev(&[1.0, 1.0, 1.0]) < f64::EPSILON);
    }

    #[test]
    fn std_dev_known_value() {
        // Sample std dev of [2, 4, 4, 4, 5, 5, 7, 9] = 2.138...
        let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((std_dev(&samples) - 2.138_089_9).abs() < 1e-6);
    }

    #[test]
    fn pearson_of_identical_series() {
        let xs = [0.01, -0.02, 0.03, 0.01];
        assert!((pearson(&xs, &xs).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pearson_of_inverted_series() {
        let xs = [0.01, -0.02, 0.03, 0.01];
        let ys: Vec<f64> = xs.iter().map(|x| -x).collect();
        assert!((pearson(&xs, &ys).unwrap() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn pearson_rejects_flat_series() {
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn var_scales_with_exposure() {
        let returns = [0.01, -0.02, 0.015, -0.01, 0.02];
        let small = var_95(&returns, dec!(10_000));
        let large = var_95(&returns, dec!(100_000));
        assert!(large > small * dec!(9));
        assert!(large < small * dec!(11));
    }

    #[test]
    fn var_is_zero_without_history() {
        assert_eq!(var_95(&[], dec!(100_000)), Decimal::ZERO);
        assert_eq!(var_95(&[0.01], dec!(100_000)), Decimal::ZERO);
    }

    #[test]
    fn herfindahl_of_single_position_is_one() {
        assert!((herfindahl(&[dec!(100)]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn herfindahl_of_even_split() {
        // Four equal positions: 4 * 0.25^2 = 0.25
        let exposures = [dec!(25), dec!(25), dec!(25), dec!(25)];
        assert!((herfindahl(&exposures) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn exposure_check_projects_the_order() {
        let limits = RiskLimits::default(); // 1M
        assert!(check_exposure(dec!(900_000), dec!(50_000), &limits).is_none());
        let violation = check_exposure(dec!(990_000), dec!(50_000), &limits).unwrap();
        assert_eq!(violation.observed, dec!(1_040_000));
    }

    #[test]
    fn var_check() {
        let limits = RiskLimits::default(); // 50k
        assert!(check_var(dec!(10_000), &limits).is_none());
        assert!(check_var(dec!(60_000), &limits).is_some());
    }

    #[test]
    fn concentration_check() {
        let limits = RiskLimits::default(); // 0.40
        assert!(check_concentration(0.3, &limits).is_none());
        assert!(check_concentration(0.9, &limits).is_some());
    }

    #[test]
    fn correlation_check_uses_absolute_value() {
        let limits = RiskLimits::default(); // 0.85
        assert!(check_correlation(Some(("ETH-USD".to_string(), 0.5)), &limits).is_none());
        assert!(check_correlation(Some(("ETH-USD".to_string(), -0.95)), &limits).is_some());
        assert!(check_correlation(None, &limits).is_none());
    }
}
