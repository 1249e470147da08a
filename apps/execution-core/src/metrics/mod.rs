//! Execution metrics aggregation.
//!
//! Consumes [`ExecutionResult`]s from the engine's result stream and child
//! executions from workers, maintaining counters and moving averages keyed
//! by algorithm and venue. Averages are updated incrementally
//! (`avg += (x - avg) / n`) without storing raw samples.

use std::collections::HashMap;
use std::sync::RwLock;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::{ChildExecution, ExecutionResult, OrderStatus};

/// Counters and moving averages for one algorithm.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlgorithmPerformance {
    /// Orders that reached a terminal status.
    pub orders: u64,
    /// Orders fully filled.
    pub completed: u64,
    /// Orders partially filled.
    pub partial: u64,
    /// Orders with no fill.
    pub failed: u64,
    /// Total filled quantity.
    pub total_filled_quantity: Decimal,
    /// Moving average wall-clock duration (seconds).
    pub avg_duration_secs: f64,
    /// Moving average slippage per order.
    pub avg_slippage: f64,
    /// Fraction of orders that completed fully.
    pub success_rate: f64,
}

/// Counters and moving averages for one venue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VenuePerformance {
    /// Child executions attempted.
    pub executions: u64,
    /// Child executions that filled.
    pub fills: u64,
    /// Moving average latency (milliseconds).
    pub avg_latency_ms: f64,
    /// Moving average slippage per fill.
    pub avg_slippage: f64,
    /// Fraction of executions that filled.
    pub fill_rate: f64,
}

/// Read-only metrics snapshot for external dashboards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Terminal orders observed.
    pub total_orders: u64,
    /// Total filled quantity across all orders.
    pub total_filled_quantity: Decimal,
    /// Per-algorithm performance.
    pub by_algorithm: HashMap<String, AlgorithmPerformance>,
    /// Per-venue performance.
    pub by_venue: HashMap<String, VenuePerformance>,
}

/// Aggregates execution results and venue outcomes.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    state: RwLock<MetricsSnapshot>,
}

impl MetricsAggregator {
    /// Create an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one terminal order result into the aggregates.
    pub fn record_result(&self, result: &ExecutionResult) {
        let mut state = self.write();
        state.total_orders += 1;
        state.total_filled_quantity += result.filled_quantity;

        let perf = state
            .by_algorithm
            .entry(result.algorithm.as_str().to_string())
            .or_default();
        perf.orders += 1;
        match result.status {
            OrderStatus::Completed => perf.completed += 1,
            OrderStatus::Partial => perf.partial += 1,
            _ => perf.failed += 1,
        }
        perf.total_filled_quantity += result.filled_quantity;
        update_mean(
            &mut perf.avg_duration_secs,
            result.duration.as_secs_f64(),
            perf.orders,
        );
        update_mean(
            &mut perf.avg_slippage,
            result.total_slippage.to_f64().unwrap_or(0.0),
            perf.orders,
        );
        perf.success_rate = perf.completed as f64 / perf.orders as f64;
    }

    /// Fold one child execution into the per-venue aggregates.
    pub fn record_execution(&self, execution: &ChildExecution) {
        let mut state = self.write();
        let perf = state.by_venue.entry(execution.venue.clone()).or_default();
        perf.executions += 1;
        if execution.is_fill() {
            perf.fills += 1;
            update_mean(
                &mut perf.avg_slippage,
                execution.slippage.to_f64().unwrap_or(0.0),
                perf.fills,
            );
        }
        update_mean(
            &mut perf.avg_latency_ms,
            execution.latency.as_secs_f64() * 1_000.0,
            perf.executions,
        );
        perf.fill_rate = perf.fills as f64 / perf.executions as f64;
    }

    /// Snapshot the aggregates.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.read().clone()
    }

    /// Consume the engine's result stream until it closes or the shutdown
    /// signal fires.
    pub async fn run(
        &self,
        mut results: broadcast::Receiver<ExecutionResult>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        tracing::info!("Metrics aggregator started");
        loop {
            tokio::select! {
                result = results.recv() => match result {
                    Ok(result) => self.record_result(&result),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Metrics aggregator lagged behind result stream");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = shutdown_rx.recv() => {
                    tracing::info!("Metrics aggregator shutting down");
                    break;
                }
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MetricsSnapshot> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MetricsSnapshot> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Incremental mean update without stored samples.
fn update_mean(mean: &mut f64, sample: f64, n: u64) {
    if n == 0 {
        return;
    }
    *mean += (sample - *mean) / n as f64;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlgorithmType, ExecutionStatus};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use uuid::Uuid;

    fn result(status: OrderStatus, filled: Decimal, duration_ms: u64) -> ExecutionResult {
        ExecutionResult {
            order_id: Uuid::new_v4(),
            bot_id: "bot-a".to_string(),
            symbol: "BTC-USD".to_string(),
            algorithm: AlgorithmType::Twap,
            status,
            requested_quantity: dec!(10),
            filled_quantity: filled,
            avg_fill_price: dec!(100),
            total_slippage: dec!(0.5),
            total_commission: dec!(1),
            venues_used: 1,
            child_count: 2,
            duration: Duration::from_millis(duration_ms),
            completed_at: Utc::now(),
        }
    }

    fn execution(venue: &str, quantity: Decimal, latency_ms: u64) -> ChildExecution {
        ChildExecution {
            id: Uuid::new_v4(),
            venue: venue.to_string(),
            quantity,
            price: dec!(100),
            commission: dec!(0.1),
            slippage: dec!(0.02),
            latency: Duration::from_millis(latency_ms),
            status: ExecutionStatus::Filled,
            executed_at: Utc::now(),
        }
    }

    #[test]
    fn results_accumulate_by_algorithm() {
        let aggregator = MetricsAggregator::new();
        aggregator.record_result(&result(OrderStatus::Completed, dec!(10), 100));
        aggregator.record_result(&result(OrderStatus::Partial, dec!(5), 300));

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.total_orders, 2);
        assert_eq!(snapshot.total_filled_quantity, dec!(15));

        let twap = snapshot.by_algorithm.get("twap").unwrap();
        assert_eq!(twap.orders, 2);
        assert_eq!(twap.completed, 1);
        assert_eq!(twap.partial, 1);
        assert!((twap.success_rate - 0.5).abs() < f64::EPSILON);
        // Mean of 0.1s and 0.3s
        assert!((twap.avg_duration_secs - 0.2).abs() < 1e-9);
    }

    #[test]
    fn venue_stats_track_fills_and_latency() {
        let aggregator = MetricsAggregator::new();
        aggregator.record_execution(&execution("alpha", dec!(5), 10));
        aggregator.record_execution(&execution("alpha", dec!(5), 30));
        aggregator.record_execution(&ChildExecution::failed(
            "alpha",
            ExecutionStatus::TimedOut,
            Duration::from_millis(500),
        ));

        let snapshot = aggregator.snapshot();
        let alpha = snapshot.by_venue.get("alpha").unwrap();
        assert_eq!(alpha.executions, 3);
        assert_eq!(alpha.fills, 2);
        assert!((alpha.fill_rate - 2.0 / 3.0).abs() < 1e-9);
        // Mean latency over all three calls: (10 + 30 + 500) / 3 = 180ms
        assert!((alpha.avg_latency_ms - 180.0).abs() < 1e-6);
    }

    #[test]
    fn incremental_mean_matches_exact_mean() {
        let mut mean = 0.0;
        let samples = [1.0, 2.0, 3.0, 4.0, 5.0];
        for (i, s) in samples.iter().enumerate() {
            update_mean(&mut mean, *s, (i + 1) as u64);
        }
        assert!((mean - 3.0).abs() < 1e-9);
    }

    #[test]
    fn run_consumes_the_result_stream() {
        let aggregator = MetricsAggregator::new();
        let (tx, rx) = broadcast::channel(16);
        let (shutdown_tx, _) = broadcast::channel(1);

        tx.send(result(OrderStatus::Completed, dec!(10), 100)).unwrap();
        drop(tx); // closing the stream ends the loop

        tokio_test::block_on(aggregator.run(rx, shutdown_tx.subscribe()));
        assert_eq!(aggregator.snapshot().total_orders, 1);
    }
}
