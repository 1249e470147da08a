//! Cross-component tests for the risk gate and the smart order router.

use std::sync::Arc;
use std::time::Duration;

use execution_core::alerting::{AlertManager, RecordingChannel};
use execution_core::config::{PaperVenueConfig, RiskConfig, RouterConfig};
use execution_core::models::{
    AlertType, AlgorithmType, ExecutionOrder, OrderRequest, OrderSide, OrderSlice, OrderType,
    RiskLimits, RoutingStrategy, TimeInForce, VenueInfo,
};
use execution_core::resilience::{BreakerRegistry, CircuitBreakerConfig};
use execution_core::risk::RiskGate;
use execution_core::router::SmartOrderRouter;
use execution_core::venue::{PaperVenue, VenueRegistry};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

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

fn order_for_routing() -> ExecutionOrder {
    ExecutionOrder::from_request(request("bot-a", dec!(10)), RiskLimits::default())
}

fn registry_with_two_venues() -> Arc<VenueRegistry> {
    let registry = Arc::new(VenueRegistry::new());
    for (name, fee, latency_ms) in [("venue-a", dec!(0.001), 50u64), ("venue-b", dec!(0.005), 75)]
    {
        let venue = Arc::new(PaperVenue::new(PaperVenueConfig {
            name: name.to_string(),
            fee_rate: fee,
            latency_ms,
            slippage_bps: dec!(1),
            fill_probability: 1.0,
            symbols: Vec::new(),
            liquidity: dec!(1_000_000),
        }));
        registry.register(
            venue,
            VenueInfo::new(name, fee, Duration::from_millis(latency_ms)),
        );
    }
    registry
}

fn router_with(strategy: RoutingStrategy, registry: Arc<VenueRegistry>) -> SmartOrderRouter {
    SmartOrderRouter::new(
        registry,
        Arc::new(BreakerRegistry::new(CircuitBreakerConfig::default())),
        RouterConfig {
            strategy,
            max_venues_per_order: 1,
            rules: Vec::new(),
        },
    )
}

#[tokio::test]
async fn consecutive_loss_limit_rejects_regardless_of_size() {
    let mut config = RiskConfig::default();
    config.auto_halt_on_violation = false;
    let gate = RiskGate::new(config, Arc::new(AlertManager::new()));

    let mut limits = RiskLimits::default();
    limits.max_consecutive_losses = 3;
    gate.register_bot("bot-a", Some(limits));

    for _ in 0..3 {
        gate.record_fill("bot-a", "BTC-USD", OrderSide::Buy, dec!(1), dec!(100));
        gate.record_fill("bot-a", "BTC-USD", OrderSide::Sell, dec!(1), dec!(99));
    }

    // Even a dust-sized order is rejected.
    let err = gate.validate(&request("bot-a", dec!(0.0001))).unwrap_err();
    assert_eq!(
        err.code(),
        execution_core::error::ErrorCode::ConsecutiveLossLimit
    );
    assert!(err.message().contains("max_consecutive_losses"));
    assert!(err.message().contains("3"));
}

#[tokio::test]
async fn risk_rejections_always_raise_alerts() {
    let alerts = Arc::new(AlertManager::new());
    let channel = Arc::new(RecordingChannel::new());
    alerts.register_channel(channel.clone());

    let mut config = RiskConfig::default();
    config.auto_halt_on_violation = true;
    let gate = RiskGate::new(config, Arc::clone(&alerts));
    gate.register_bot("bot-a", None);

    // 2000 * 100 notional blows the default 100k position limit.
    let _ = gate.validate(&request("bot-a", dec!(2000))).unwrap_err();

    tokio::time::sleep(Duration::from_millis(20)).await;
    let delivered = channel.delivered();
    assert!(
        delivered
            .iter()
            .any(|a| a.alert_type == AlertType::PositionBreach)
    );
    // Auto-halt also raises the bot-halted alert.
    assert!(
        delivered
            .iter()
            .any(|a| a.alert_type == AlertType::BotHalted)
    );
    assert!(gate.is_halted("bot-a"));
}

#[tokio::test]
async fn best_price_and_lowest_latency_agree_until_the_fee_flips() {
    let registry = registry_with_two_venues();
    let order = order_for_routing();
    let slice = OrderSlice::new(0, dec!(10), None, chrono::Utc::now());

    // venue-a: fee 0.1%, 50ms. venue-b: fee 0.5%, 75ms.
    let best_price = router_with(RoutingStrategy::BestPrice, Arc::clone(&registry));
    let decision = best_price.route(&slice, &order).unwrap();
    assert_eq!(decision.allocations[0].venue_id, "venue-a");

    let lowest_latency = router_with(RoutingStrategy::LowestLatency, Arc::clone(&registry));
    let decision = lowest_latency.route(&slice, &order).unwrap();
    assert_eq!(decision.allocations[0].venue_id, "venue-a");

    // Raising venue-a's fee to 1.0% flips best-price to venue-b...
    registry.update_profile("venue-a", |info| info.fee_rate = dec!(0.01));
    let decision = best_price.route(&slice, &order).unwrap();
    assert_eq!(decision.allocations[0].venue_id, "venue-b");

    // ...while lowest-latency still prefers venue-a.
    let decision = lowest_latency.route(&slice, &order).unwrap();
    assert_eq!(decision.allocations[0].venue_id, "venue-a");
}

#[tokio::test]
async fn split_allocation_percentages_sum_to_one() {
    let registry = registry_with_two_venues();
    let router = SmartOrderRouter::new(
        registry,
        Arc::new(BreakerRegistry::new(CircuitBreakerConfig::default())),
        RouterConfig {
            strategy: RoutingStrategy::Balanced,
            max_venues_per_order: 3,
            rules: Vec::new(),
        },
    );

    let order = order_for_routing();
    let slice = OrderSlice::new(0, dec!(10), None, chrono::Utc::now());
    let decision = router.route(&slice, &order).unwrap();

    assert!(decision.allocations.len() > 1);
    let pct: f64 = decision.allocations.iter().map(|a| a.percentage).sum();
    assert!((pct - 1.0).abs() < 1e-9);
    let qty: Decimal = decision.allocations.iter().map(|a| a.quantity).sum();
    assert_eq!(qty, dec!(10));
}

#[tokio::test]
async fn bot_metrics_snapshot_is_stable_without_fills() {
    let gate = RiskGate::new(RiskConfig::default(), Arc::new(AlertManager::new()));
    gate.register_bot("bot-a", None);
    gate.record_fill("bot-a", "BTC-USD", OrderSide::Buy, dec!(3), dec!(100));

    let first = gate.bot_metrics("bot-a").unwrap();
    let second = gate.bot_metrics("bot-a").unwrap();

    assert_eq!(first.exposure, second.exposure);
    assert_eq!(first.realized_pnl, second.realized_pnl);
    assert_eq!(first.drawdown_pct, second.drawdown_pct);
    assert_eq!(first.consecutive_losses, second.consecutive_losses);
    assert_eq!(first.var_95, second.var_95);
    assert_eq!(first.updated_at, second.updated_at);
}

#[tokio::test]
async fn correlation_limit_blocks_highly_correlated_symbols() {
    let mut config = RiskConfig::default();
    config.auto_halt_on_violation = false;
    let gate = RiskGate::new(config, Arc::new(AlertManager::new()));

    let mut limits = RiskLimits::default();
    limits.max_correlation = 0.9;
    gate.register_bot("bot-a", Some(limits));

    // Hold ETH-USD, then feed perfectly correlated price paths.
    gate.record_fill("bot-a", "ETH-USD", OrderSide::Buy, dec!(10), dec!(100));
    for step in [100, 102, 101, 104, 103, 106, 105, 108] {
        gate.observe_price("ETH-USD", Decimal::from(step));
        gate.observe_price("BTC-USD", Decimal::from(step * 10));
    }

    let err = gate.validate(&request("bot-a", dec!(1))).unwrap_err();
    assert_eq!(
        err.code(),
        execution_core::error::ErrorCode::CorrelationExceeded
    );
}
