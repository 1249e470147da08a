//! Two-tier risk gate.
//!
//! Every candidate order must pass both tiers before it may be enqueued:
//!
//! - **Bot tier**: position size, daily loss, losing streak, and drawdown
//!   against the bot's own limits. A bot with no registered profile is
//!   rejected outright (unknown risk is treated as unsafe).
//! - **Portfolio tier**: aggregate exposure, parametric VaR, Herfindahl
//!   concentration, and pairwise correlation across all bots.
//!
//! Violations raise alerts and, when `auto_halt_on_violation` is enabled,
//! halt the offending bot or engage the system-wide emergency stop. The
//! gate owns all risk-state mutation; no other component writes risk
//! metrics.

pub mod bot;
pub mod monitor;
pub mod portfolio;
mod state;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use rust_decimal::Decimal;

use crate::alerting::AlertManager;
use crate::config::RiskConfig;
use crate::error::EngineError;
use crate::models::{
    AlertSeverity, AlertType, BotRiskMetrics, OrderRequest, OrderSide, PortfolioRisk, RiskAlert,
    RiskLimits,
};
use crate::observability;

pub use bot::RiskViolation;
pub use monitor::RiskMonitor;

use state::{BotState, ReturnTracker};

/// The two-tier risk gate.
pub struct RiskGate {
    config: RiskConfig,
    bots: RwLock<HashMap<String, Arc<Mutex<BotState>>>>,
    tracker: Mutex<ReturnTracker>,
    halted: RwLock<HashSet<String>>,
    emergency: AtomicBool,
    alerts: Arc<AlertManager>,
}

impl RiskGate {
    /// Create a gate with the given configuration and alert sink.
    ///
    /// Bots named in `bot_overrides` are registered immediately with their
    /// configured limits.
    #[must_use]
    pub fn new(config: RiskConfig, alerts: Arc<AlertManager>) -> Self {
        let tracker = ReturnTracker::new(config.return_window);
        let mut bots = HashMap::new();
        for (bot_id, limits) in &config.bot_overrides {
            bots.insert(
                bot_id.clone(),
                Arc::new(Mutex::new(BotState::new(bot_id, limits.clone()))),
            );
        }
        Self {
            config,
            bots: RwLock::new(bots),
            tracker: Mutex::new(tracker),
            halted: RwLock::new(HashSet::new()),
            emergency: AtomicBool::new(false),
            alerts,
        }
    }

    // ------------------------------------------------------------------
    // Registration and operator surface
    // ------------------------------------------------------------------

    /// Register a bot, using the default limits when no override is given.
    pub fn register_bot(&self, bot_id: &str, limits: Option<RiskLimits>) {
        let limits = limits.unwrap_or_else(|| self.config.default_limits.clone());
        let state = BotState::new(bot_id, limits);
        self.bots_write()
            .insert(bot_id.to_string(), Arc::new(Mutex::new(state)));
        tracing::info!(bot_id = %bot_id, "Bot registered with risk gate");
    }

    /// Hot-update a bot's risk limits.
    ///
    /// # Errors
    ///
    /// Returns an unknown-bot error when the bot is not registered.
    pub fn update_limits(&self, bot_id: &str, limits: RiskLimits) -> Result<(), EngineError> {
        let bots = self.bots_read();
        let state = bots.get(bot_id).ok_or_else(|| EngineError::unknown_bot(bot_id))?;
        lock(state).limits = limits;
        tracing::info!(bot_id = %bot_id, "Risk limits updated");
        Ok(())
    }

    /// Halt one bot; all further orders for it are rejected until resumed.
    pub fn halt_bot(&self, bot_id: &str) {
        let inserted = self.halted_write().insert(bot_id.to_string());
        if inserted {
            tracing::warn!(bot_id = %bot_id, "Bot halted");
            self.alerts.raise(
                RiskAlert::new(
                    AlertType::BotHalted,
                    AlertSeverity::High,
                    Decimal::ONE,
                    Decimal::ONE,
                    format!("trading halted for bot {bot_id}"),
                )
                .for_bot(bot_id),
            );
        }
    }

    /// Resume a halted bot.
    pub fn resume_bot(&self, bot_id: &str) {
        if self.halted_write().remove(bot_id) {
            tracing::info!(bot_id = %bot_id, "Bot resumed");
        }
    }

    /// Whether a bot is currently halted.
    #[must_use]
    pub fn is_halted(&self, bot_id: &str) -> bool {
        self.halted_read().contains(bot_id)
    }

    /// Engage the system-wide emergency stop: every submission is rejected
    /// until [`Self::resume_all`]. Already-dispatched work is not canceled.
    pub fn emergency_stop(&self, reason: &str) {
        let was_stopped = self.emergency.swap(true, Ordering::SeqCst);
        if !was_stopped {
            tracing::error!(reason = %reason, "EMERGENCY STOP engaged");
            self.alerts.raise(RiskAlert::new(
                AlertType::EmergencyStop,
                AlertSeverity::Critical,
                Decimal::ONE,
                Decimal::ONE,
                format!("emergency stop engaged: {reason}"),
            ));
        }
    }

    /// Clear the emergency stop.
    pub fn resume_all(&self) {
        if self.emergency.swap(false, Ordering::SeqCst) {
            tracing::warn!("Emergency stop cleared");
        }
    }

    /// Whether the emergency stop is engaged.
    #[must_use]
    pub fn is_emergency_stopped(&self) -> bool {
        self.emergency.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Validate a candidate order against both tiers.
    ///
    /// On success, returns the bot's current limits as the order's risk
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns a typed rejection naming the breached limit, the observed
    /// value, and the threshold. Breaches always raise an alert; with
    /// `auto_halt_on_violation` they also halt the bot (bot tier) or engage
    /// the emergency stop (portfolio tier).
    pub fn validate(&self, request: &OrderRequest) -> Result<RiskLimits, EngineError> {
        if self.is_emergency_stopped() {
            observability::record_risk_rejection("EMERGENCY_STOP_ACTIVE");
            return Err(EngineError::emergency_stop());
        }

        if self.is_halted(&request.bot_id) {
            observability::record_risk_rejection("BOT_HALTED");
            return Err(EngineError::bot_halted(&request.bot_id));
        }

        let state = {
            let bots = self.bots_read();
            bots.get(&request.bot_id).cloned()
        };
        let Some(state) = state else {
            observability::record_risk_rejection("UNKNOWN_BOT");
            return Err(EngineError::unknown_bot(&request.bot_id));
        };

        let order_notional = request.quantity * request.decision_price;

        // Bot tier.
        let (limits, violation) = {
            let guard = lock(&state);
            (
                guard.limits.clone(),
                bot::check_all(&guard.metrics, &guard.limits, order_notional),
            )
        };
        if let Some(violation) = violation {
            return Err(self.reject_bot_tier(&request.bot_id, &request.symbol, &violation));
        }

        // Portfolio tier.
        if let Some(violation) = self.check_portfolio_tier(request, order_notional, &limits) {
            return Err(self.reject_portfolio_tier(&request.bot_id, &request.symbol, &violation));
        }

        Ok(limits)
    }

    fn check_portfolio_tier(
        &self,
        request: &OrderRequest,
        order_notional: Decimal,
        limits: &RiskLimits,
    ) -> Option<RiskViolation> {
        let mut exposures = Vec::new();
        let mut total_var = Decimal::ZERO;
        let mut held_symbols: HashSet<String> = HashSet::new();

        {
            let bots = self.bots_read();
            for (bot_id, state) in bots.iter() {
                let guard = lock(state);
                let mut exposure = guard.metrics.exposure;
                if bot_id == &request.bot_id {
                    // Project the candidate order onto its own bot.
                    exposure += order_notional;
                }
                exposures.push(exposure);
                total_var += guard.metrics.var_95;
                held_symbols.extend(guard.positions.keys().cloned());
            }
        }

        let total_exposure: Decimal = exposures.iter().copied().sum();

        if let Some(v) =
            portfolio::check_exposure(total_exposure - order_notional, order_notional, limits)
        {
            return Some(v);
        }
        if let Some(v) = portfolio::check_var(total_var, limits) {
            return Some(v);
        }
        // Herfindahl is trivially 1.0 with one exposed bot; the check only
        // means something once exposure spreads across buckets.
        let exposed_buckets = exposures.iter().filter(|e| **e > Decimal::ZERO).count();
        if exposed_buckets > 1
            && let Some(v) =
                portfolio::check_concentration(portfolio::herfindahl(&exposures), limits)
        {
            return Some(v);
        }

        let held: Vec<String> = held_symbols.into_iter().collect();
        let max_corr = lock_tracker(&self.tracker).max_correlation(&request.symbol, &held);
        portfolio::check_correlation(max_corr, limits)
    }

    fn reject_bot_tier(
        &self,
        bot_id: &str,
        symbol: &str,
        violation: &RiskViolation,
    ) -> EngineError {
        self.raise_violation_alert(Some(bot_id), Some(symbol), violation);
        if self.config.auto_halt_on_violation {
            self.halt_bot(bot_id);
        }
        observability::record_risk_rejection(violation.code.reason());
        EngineError::limit_breach(
            violation.code,
            violation.limit_name,
            violation.observed,
            violation.allowed,
        )
        .with_context("bot_id", bot_id)
    }

    fn reject_portfolio_tier(
        &self,
        bot_id: &str,
        symbol: &str,
        violation: &RiskViolation,
    ) -> EngineError {
        self.raise_violation_alert(None, Some(symbol), violation);
        if self.config.auto_halt_on_violation {
            self.emergency_stop(violation.limit_name);
        }
        observability::record_risk_rejection(violation.code.reason());
        EngineError::limit_breach(
            violation.code,
            violation.limit_name,
            violation.observed,
            violation.allowed,
        )
        .with_context("bot_id", bot_id)
    }

    fn raise_violation_alert(
        &self,
        bot_id: Option<&str>,
        symbol: Option<&str>,
        violation: &RiskViolation,
    ) {
        let mut alert = RiskAlert::new(
            violation.alert_type,
            violation.severity,
            violation.observed,
            violation.allowed,
            format!(
                "{}: observed {} exceeds allowed {}",
                violation.limit_name, violation.observed, violation.allowed
            ),
        );
        if let Some(bot_id) = bot_id {
            alert = alert.for_bot(bot_id);
        }
        if let Some(symbol) = symbol {
            alert = alert.for_symbol(symbol);
        }
        self.alerts.raise(alert);
    }

    // ------------------------------------------------------------------
    // Fill recording and snapshots
    // ------------------------------------------------------------------

    /// Record one fill for a bot. The only mutation path for risk metrics.
    pub fn record_fill(
        &self,
        bot_id: &str,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) {
        let state = {
            let bots = self.bots_read();
            bots.get(bot_id).cloned()
        };
        if let Some(state) = state {
            lock(&state).apply_fill(symbol, side, quantity, price, self.config.return_window);
        }
        self.observe_price(symbol, price);
    }

    /// Observe a market price: feeds the correlation tracker and re-marks
    /// every bot's position in the symbol.
    pub fn observe_price(&self, symbol: &str, price: Decimal) {
        lock_tracker(&self.tracker).observe(symbol, price);
        let bots = self.bots_read();
        for state in bots.values() {
            lock(state).mark_price(symbol, price);
        }
    }

    /// Idempotent snapshot of a bot's risk metrics.
    #[must_use]
    pub fn bot_metrics(&self, bot_id: &str) -> Option<BotRiskMetrics> {
        let bots = self.bots_read();
        bots.get(bot_id).map(|state| lock(state).metrics.clone())
    }

    /// Aggregate portfolio risk across all bots.
    #[must_use]
    pub fn portfolio_risk(&self) -> PortfolioRisk {
        let mut exposures = Vec::new();
        let mut total_daily_pnl = Decimal::ZERO;
        let mut total_var = Decimal::ZERO;
        let mut held_symbols: HashSet<String> = HashSet::new();
        let mut bot_scores = Vec::new();

        {
            let bots = self.bots_read();
            for state in bots.values() {
                let guard = lock(state);
                exposures.push(guard.metrics.exposure);
                total_daily_pnl += guard.metrics.daily_pnl;
                total_var += guard.metrics.var_95;
                held_symbols.extend(guard.positions.keys().cloned());
                bot_scores.push(guard.metrics.risk_score);
            }
        }

        let held: Vec<String> = held_symbols.into_iter().collect();
        let avg_correlation = lock_tracker(&self.tracker).average_correlation(&held);
        let concentration = portfolio::herfindahl(&exposures);
        let bot_count = exposures.len();
        let exposed_bots = exposures.iter().filter(|e| **e > Decimal::ZERO).count();

        let risk_score = if bot_scores.is_empty() {
            0.0
        } else {
            bot_scores.iter().sum::<f64>() / bot_scores.len() as f64
        };

        PortfolioRisk {
            total_exposure: exposures.iter().copied().sum(),
            total_daily_pnl,
            var_95: total_var,
            concentration,
            avg_correlation,
            bot_count,
            exposed_bots,
            risk_score,
            computed_at: Utc::now(),
        }
    }

    /// Periodic re-evaluation, run by the background monitor: raises
    /// proactive alerts for breaches caused by market movement alone.
    pub fn run_periodic_checks(&self) {
        let limits = &self.config.default_limits;
        let portfolio_risk = self.portfolio_risk();

        if let Some(v) = portfolio::check_var(portfolio_risk.var_95, limits) {
            self.raise_violation_alert(None, None, &v);
            if self.config.auto_halt_on_violation {
                self.emergency_stop(v.limit_name);
            }
        }
        if portfolio_risk.exposed_bots > 1
            && let Some(v) = portfolio::check_concentration(portfolio_risk.concentration, limits)
        {
            self.raise_violation_alert(None, None, &v);
        }

        let bots: Vec<(String, Arc<Mutex<BotState>>)> = {
            let map = self.bots_read();
            map.iter()
                .map(|(id, state)| (id.clone(), Arc::clone(state)))
                .collect()
        };

        for (bot_id, state) in bots {
            let (metrics, bot_limits) = {
                let guard = lock(&state);
                (guard.metrics.clone(), guard.limits.clone())
            };
            let violation = bot::check_daily_loss(&metrics, &bot_limits)
                .or_else(|| bot::check_drawdown(&metrics, &bot_limits));
            if let Some(v) = violation {
                self.raise_violation_alert(Some(&bot_id), None, &v);
                if self.config.auto_halt_on_violation {
                    self.halt_bot(&bot_id);
                }
            }
        }
    }

    /// Stress test: project the portfolio loss under each adverse shock
    /// scenario and alert when the worst case exceeds the VaR limit.
    pub fn run_stress_test(&self) {
        let risk = self.portfolio_risk();
        let limit = self.config.default_limits.var_limit;

        for (scenario, shock) in portfolio::STRESS_SCENARIOS {
            let loss = portfolio::stressed_loss(risk.total_exposure, shock);
            if loss > limit {
                tracing::warn!(
                    scenario,
                    projected_loss = %loss,
                    var_limit = %limit,
                    "Stress scenario breaches the VaR limit"
                );
                self.alerts.raise(RiskAlert::new(
                    AlertType::VarBreach,
                    AlertSeverity::High,
                    loss,
                    limit,
                    format!(
                        "stress {scenario}: projected loss {loss} exceeds VaR limit {limit}"
                    ),
                ));
            }
        }
    }

    // ------------------------------------------------------------------
    // Lock helpers
    // ------------------------------------------------------------------

    fn bots_read(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Mutex<BotState>>>> {
        self.bots
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn bots_write(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Mutex<BotState>>>> {
        self.bots
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn halted_read(&self) -> std::sync::RwLockReadGuard<'_, HashSet<String>> {
        self.halted
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn halted_write(&self) -> std::sync::RwLockWriteGuard<'_, HashSet<String>> {
        self.halted
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn lock(state: &Arc<Mutex<BotState>>) -> std::sync::MutexGuard<'_, BotState> {
    state
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn lock_tracker(tracker: &Mutex<ReturnTracker>) -> std::sync::MutexGuard<'_, ReturnTracker> {
    tracker
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::models::{AlgorithmType, OrderType, TimeInForce};
    use rust_decimal_macros::dec;

    fn gate() -> RiskGate {
        let mut config = RiskConfig::default();
        config.auto_halt_on_violation = false;
        RiskGate::new(config, Arc::new(AlertManager::new()))
    }

    fn request(bot_id: &str, quantity: Decimal) -> OrderRequest {
        OrderRequest {
            client_order_id: None,
            bot_id: bot_id.to_string(),
            symbol: "BTC-USD".to_string(),
            side: OrderSide::Buy,
            algorithm: AlgorithmType::Market,
            order_type: OrderType::Market,
            quantity,
            limit_price: None,
            decision_price: dec!(100),
            time_in_force: TimeInForce::Day,
        }
    }

    #[test]
    fn unknown_bot_is_rejected() {
        let gate = gate();
        let err = gate.validate(&request("ghost", dec!(1))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownBot);
    }

    #[test]
    fn registered_bot_passes() {
        let gate = gate();
        gate.register_bot("bot-a", None);
        let limits = gate.validate(&request("bot-a", dec!(1))).unwrap();
        assert_eq!(limits, RiskLimits::default());
    }

    #[test]
    fn position_limit_rejects_oversized_order() {
        let gate = gate();
        gate.register_bot("bot-a", None);

        // 2000 * 100 = 200k notional > 100k default limit
        let err = gate.validate(&request("bot-a", dec!(2000))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PositionLimitExceeded);
        assert!(err.message().contains("max_position_size"));
    }

    #[test]
    fn consecutive_losses_reject_regardless_of_size() {
        let gate = gate();
        gate.register_bot("bot-a", None);

        // Build a 5-loss streak (default limit 5).
        for _ in 0..5 {
            gate.record_fill("bot-a", "BTC-USD", OrderSide::Buy, dec!(1), dec!(100));
            gate.record_fill("bot-a", "BTC-USD", OrderSide::Sell, dec!(1), dec!(99));
        }

        let err = gate.validate(&request("bot-a", dec!(0.001))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConsecutiveLossLimit);
    }

    #[test]
    fn halted_bot_is_rejected_until_resumed() {
        let gate = gate();
        gate.register_bot("bot-a", None);
        gate.halt_bot("bot-a");

        let err = gate.validate(&request("bot-a", dec!(1))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BotHalted);

        gate.resume_bot("bot-a");
        assert!(gate.validate(&request("bot-a", dec!(1))).is_ok());
    }

    #[test]
    fn emergency_stop_rejects_everything() {
        let gate = gate();
        gate.register_bot("bot-a", None);
        gate.emergency_stop("test");

        let err = gate.validate(&request("bot-a", dec!(1))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::EmergencyStopActive);

        gate.resume_all();
        assert!(gate.validate(&request("bot-a", dec!(1))).is_ok());
    }

    #[test]
    fn auto_halt_halts_the_offending_bot() {
        let mut config = RiskConfig::default();
        config.auto_halt_on_violation = true;
        let gate = RiskGate::new(config, Arc::new(AlertManager::new()));
        gate.register_bot("bot-a", None);

        let _ = gate.validate(&request("bot-a", dec!(2000))).unwrap_err();
        assert!(gate.is_halted("bot-a"));
    }

    #[test]
    fn portfolio_exposure_rejects_across_bots() {
        let gate = gate();
        let mut roomy = RiskLimits::default();
        roomy.max_position_size = dec!(10_000_000);
        gate.register_bot("bot-a", Some(roomy.clone()));
        gate.register_bot("bot-b", Some(roomy));

        // bot-a builds 600k exposure (within its own limit).
        gate.record_fill("bot-a", "AAA", OrderSide::Buy, dec!(6_000), dec!(100));

        // bot-b asks for 500k more; portfolio limit is 1M.
        let mut req = request("bot-b", dec!(5_000));
        req.symbol = "BBB".to_string();
        let err = gate.validate(&req).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PortfolioExposureExceeded);
    }

    #[test]
    fn bot_metrics_snapshot_is_idempotent() {
        let gate = gate();
        gate.register_bot("bot-a", None);
        gate.record_fill("bot-a", "BTC-USD", OrderSide::Buy, dec!(2), dec!(100));

        let first = gate.bot_metrics("bot-a").unwrap();
        let second = gate.bot_metrics("bot-a").unwrap();
        assert_eq!(first.exposure, second.exposure);
        assert_eq!(first.realized_pnl, second.realized_pnl);
        assert_eq!(first.updated_at, second.updated_at);
    }

    #[test]
    fn portfolio_risk_aggregates_bots() {
        let gate = gate();
        gate.register_bot("bot-a", None);
        gate.register_bot("bot-b", None);
        gate.record_fill("bot-a", "AAA", OrderSide::Buy, dec!(10), dec!(100));
        gate.record_fill("bot-b", "BBB", OrderSide::Buy, dec!(10), dec!(100));

        let risk = gate.portfolio_risk();
        assert_eq!(risk.bot_count, 2);
        assert_eq!(risk.total_exposure, dec!(2000));
        // Two equal exposures: Herfindahl = 0.5
        assert!((risk.concentration - 0.5).abs() < 1e-9);
    }

    #[test]
    fn stress_test_alerts_when_shock_exceeds_var_limit() {
        let alerts = Arc::new(AlertManager::new());
        let mut config = RiskConfig::default();
        config.auto_halt_on_violation = false;
        let gate = RiskGate::new(config, Arc::clone(&alerts));
        gate.register_bot("bot-a", None);

        // 1M exposure: a 10% shock projects 100k, past the 50k VaR limit.
        gate.record_fill("bot-a", "AAA", OrderSide::Buy, dec!(10_000), dec!(100));
        gate.run_stress_test();

        let active = alerts.active_alerts();
        assert!(active.len() >= 2);
        assert!(active.iter().all(|a| a.alert_type == AlertType::VarBreach));
        assert!(active.iter().any(|a| a.message.contains("stress")));
    }

    #[test]
    fn stress_test_quiet_with_no_exposure() {
        let alerts = Arc::new(AlertManager::new());
        let gate = RiskGate::new(RiskConfig::default(), Arc::clone(&alerts));
        gate.register_bot("bot-a", None);

        gate.run_stress_test();
        assert!(alerts.active_alerts().is_empty());
    }

    #[test]
    fn bot_overrides_register_at_construction() {
        let mut config = RiskConfig::default();
        config.auto_halt_on_violation = false;
        let mut limits = RiskLimits::default();
        limits.max_position_size = dec!(10);
        config.bot_overrides.insert("bot-cfg".to_string(), limits);

        let gate = RiskGate::new(config, Arc::new(AlertManager::new()));

        // Registered with the tight override: a 1 x 100 order breaches it.
        let err = gate.validate(&request("bot-cfg", dec!(1))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PositionLimitExceeded);
    }

    #[test]
    fn update_limits_requires_registration() {
        let gate = gate();
        assert!(gate.update_limits("ghost", RiskLimits::default()).is_err());

        gate.register_bot("bot-a", None);
        let mut limits = RiskLimits::default();
        limits.max_position_size = dec!(1);
        gate.update_limits("bot-a", limits).unwrap();

        let err = gate.validate(&request("bot-a", dec!(1))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PositionLimitExceeded);
    }
}
