//! End-to-end engine tests: concurrent submission, emergency stop, and
//! shutdown drain, all against paper venues.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use execution_core::alerting::AlertManager;
use execution_core::config::{
    AlgorithmConfig, EngineConfig, PaperVenueConfig, RiskConfig, RouterConfig, TwapConfig,
};
use execution_core::engine::ExecutionEngine;
use execution_core::metrics::MetricsAggregator;
use execution_core::models::{
    AlgorithmType, OrderRequest, OrderSide, OrderStatus, OrderType, RiskLimits, TimeInForce,
    VenueInfo,
};
use execution_core::resilience::{BreakerRegistry, CircuitBreakerConfig};
use execution_core::risk::RiskGate;
use execution_core::router::SmartOrderRouter;
use execution_core::venue::{PaperVenue, VenueRegistry};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

struct Harness {
    engine: ExecutionEngine,
    venue: Arc<PaperVenue>,
}

fn harness(worker_count: usize, queue_capacity: usize, algorithms: AlgorithmConfig) -> Harness {
    let registry = Arc::new(VenueRegistry::new());
    let venue = Arc::new(PaperVenue::new(PaperVenueConfig {
        name: "paper-main".to_string(),
        fee_rate: dec!(0.001),
        latency_ms: 1,
        slippage_bps: dec!(1),
        fill_probability: 1.0,
        symbols: Vec::new(),
        liquidity: dec!(10_000_000),
    }));
    registry.register(
        venue.clone(),
        VenueInfo::new("paper-main", dec!(0.001), Duration::from_millis(1)),
    );

    let breakers = Arc::new(BreakerRegistry::new(CircuitBreakerConfig::default()));

    let mut risk_config = RiskConfig::default();
    risk_config.auto_halt_on_violation = false;
    // Roomy limits so volume tests exercise the pool, not the gate.
    risk_config.default_limits = RiskLimits {
        max_position_size: dec!(100_000_000),
        max_daily_loss: dec!(100_000_000),
        max_drawdown_pct: dec!(0.99),
        max_consecutive_losses: 1_000_000,
        max_portfolio_exposure: dec!(1_000_000_000),
        var_limit: dec!(100_000_000),
        max_concentration_pct: dec!(1.0),
        max_correlation: 1.0,
    };
    let gate = Arc::new(RiskGate::new(risk_config, Arc::new(AlertManager::new())));
    gate.register_bot("bot-a", None);

    let router = Arc::new(SmartOrderRouter::new(
        Arc::clone(&registry),
        Arc::clone(&breakers),
        RouterConfig::default(),
    ));

    let engine = ExecutionEngine::new(
        EngineConfig {
            worker_count,
            queue_capacity,
            shutdown_timeout_secs: 10,
            venue_call_timeout_ms: 1_000,
            sniper_timeout_ms: 500,
        },
        algorithms,
        gate,
        router,
        registry,
        breakers,
        Arc::new(MetricsAggregator::new()),
    );

    Harness { engine, venue }
}

fn market_request(quantity: Decimal) -> OrderRequest {
    OrderRequest {
        client_order_id: None,
        bot_id: "bot-a".to_string(),
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

#[tokio::test]
async fn thousand_orders_none_lost_none_double_processed() {
    let h = harness(10, 1_000, AlgorithmConfig::default());
    h.engine.start();
    let mut results = h.engine.subscribe_results();

    let mut submitted = Vec::with_capacity(1_000);
    let mut capacity_rejections = 0u32;
    for _ in 0..1_000 {
        match h.engine.submit(market_request(dec!(1))) {
            Ok(id) => submitted.push(id),
            Err(e) if e.code() == execution_core::error::ErrorCode::QueueFull => {
                capacity_rejections += 1;
            }
            Err(e) => panic!("unexpected rejection: {e}"),
        }
    }

    // Every accepted order must produce exactly one terminal result.
    let mut seen: HashMap<uuid::Uuid, u32> = HashMap::new();
    for _ in 0..submitted.len() {
        let result = tokio::time::timeout(Duration::from_secs(30), results.recv())
            .await
            .expect("results stalled")
            .expect("result stream closed");
        *seen.entry(result.order_id).or_insert(0) += 1;
        assert_eq!(result.status, OrderStatus::Completed);
    }

    assert_eq!(
        submitted.len() as u32 + capacity_rejections,
        1_000,
        "every order is either processed or rejected with a capacity error"
    );
    for id in &submitted {
        assert_eq!(seen.get(id), Some(&1), "order {id} processed exactly once");
    }
    // One venue call per accepted market order.
    assert_eq!(h.venue.call_count(), submitted.len() as u64);

    h.engine.shutdown().await;
}

#[tokio::test]
async fn emergency_stop_blocks_new_orders_but_not_inflight_work() {
    let algorithms = AlgorithmConfig {
        twap: TwapConfig {
            slice_count: 3,
            duration_secs: 1,
        },
        ..Default::default()
    };
    let h = harness(2, 16, algorithms);
    h.engine.start();
    let mut results = h.engine.subscribe_results();

    // A TWAP order that will still be pacing when the stop engages.
    let mut twap = market_request(dec!(9));
    twap.algorithm = AlgorithmType::Twap;
    let inflight_id = h.engine.submit(twap).unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    h.engine.risk_gate().emergency_stop("integration test");

    // New submissions are rejected at the gate.
    let err = h.engine.submit(market_request(dec!(1))).unwrap_err();
    assert_eq!(
        err.code(),
        execution_core::error::ErrorCode::EmergencyStopActive
    );

    // The in-flight order still runs to completion on its own.
    let result = tokio::time::timeout(Duration::from_secs(10), results.recv())
        .await
        .expect("in-flight order stalled")
        .unwrap();
    assert_eq!(result.order_id, inflight_id);
    assert_eq!(result.status, OrderStatus::Completed);
    assert_eq!(result.filled_quantity, dec!(9));

    h.engine.shutdown().await;
}

#[tokio::test]
async fn shutdown_interrupts_pending_slices_and_reports_partial() {
    let algorithms = AlgorithmConfig {
        twap: TwapConfig {
            slice_count: 10,
            duration_secs: 600,
        },
        ..Default::default()
    };
    let h = harness(1, 16, algorithms);
    h.engine.start();
    let mut results = h.engine.subscribe_results();

    let mut twap = market_request(dec!(10));
    twap.algorithm = AlgorithmType::Twap;
    let order_id = h.engine.submit(twap).unwrap();

    // Let the first (immediate) slice fill, then shut down while the
    // worker waits on slice two.
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.engine.shutdown().await;

    let result = tokio::time::timeout(Duration::from_secs(5), results.recv())
        .await
        .expect("result not delivered on shutdown")
        .unwrap();
    assert_eq!(result.order_id, order_id);
    assert_eq!(result.status, OrderStatus::Partial);
    assert_eq!(result.filled_quantity, dec!(1));

    let order = h.engine.order(order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Partial);
    assert!(order.filled_quantity < order.quantity);
}

#[tokio::test]
async fn iceberg_order_fills_fully_through_sequential_peaks() {
    let h = harness(1, 16, AlgorithmConfig::default());
    h.engine.start();
    let mut results = h.engine.subscribe_results();

    let mut iceberg = market_request(dec!(100));
    iceberg.algorithm = AlgorithmType::Iceberg;
    h.engine.submit(iceberg).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(10), results.recv())
        .await
        .expect("iceberg stalled")
        .unwrap();
    assert_eq!(result.status, OrderStatus::Completed);
    assert_eq!(result.filled_quantity, dec!(100));
    // 5% visible fraction with randomization: many peaks, each a child.
    assert!(result.child_count > 1);

    h.engine.shutdown().await;
}

#[tokio::test]
async fn child_quantities_never_exceed_requested() {
    // Tight windows so the timed algorithms finish quickly.
    let algorithms = AlgorithmConfig {
        twap: TwapConfig {
            slice_count: 5,
            duration_secs: 1,
        },
        vwap: execution_core::config::VwapConfig {
            slice_count: 5,
            duration_secs: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    let h = harness(4, 64, algorithms);
    h.engine.start();
    let mut results = h.engine.subscribe_results();

    for algorithm in [
        AlgorithmType::Market,
        AlgorithmType::Twap,
        AlgorithmType::Vwap,
        AlgorithmType::Iceberg,
        AlgorithmType::Sniper,
    ] {
        let mut request = market_request(dec!(12.5));
        request.algorithm = algorithm;
        h.engine.submit(request).unwrap();
    }

    for _ in 0..5 {
        let result = tokio::time::timeout(Duration::from_secs(30), results.recv())
            .await
            .expect("order stalled")
            .unwrap();
        let order = h.engine.order(result.order_id).unwrap();
        let child_total: Decimal = order
            .executions
            .iter()
            .filter(|e| e.is_fill())
            .map(|e| e.quantity)
            .sum();
        assert!(child_total <= order.quantity);
        if order.status == OrderStatus::Completed {
            assert_eq!(child_total, order.quantity);
        }
    }

    h.engine.shutdown().await;
}
