//! Execution worker.
//!
//! A worker owns exactly one order at a time and runs it to completion:
//! plan the slices, wait out each slice's release time (cancellable), route
//! the slice, call the allocated venues under a latency budget, and fold
//! the resulting child executions back onto the parent order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::algorithm;
use crate::config::{AlgorithmConfig, EngineConfig};
use crate::metrics::MetricsAggregator;
use crate::models::{
    AlgorithmType, ChildExecution, ExecutionOrder, ExecutionResult, ExecutionStatus, OrderSlice,
    OrderStatus, SliceStatus,
};
use crate::observability;
use crate::resilience::BreakerRegistry;
use crate::risk::RiskGate;
use crate::router::SmartOrderRouter;
use crate::venue::{SliceRequest, VenueRegistry};

/// Shared dependencies handed to every worker.
pub(crate) struct WorkerContext {
    pub config: EngineConfig,
    pub algorithms: AlgorithmConfig,
    pub gate: Arc<RiskGate>,
    pub router: Arc<SmartOrderRouter>,
    pub registry: Arc<VenueRegistry>,
    pub breakers: Arc<BreakerRegistry>,
    pub metrics: Arc<MetricsAggregator>,
    pub results_tx: broadcast::Sender<ExecutionResult>,
    pub orders: Arc<RwLock<HashMap<Uuid, ExecutionOrder>>>,
    pub queue_depth: Arc<AtomicUsize>,
}

/// Worker loop: pull one order at a time from the shared queue until the
/// shutdown signal fires or the queue closes.
pub(crate) async fn worker_loop(
    worker_id: usize,
    queue: Arc<tokio::sync::Mutex<mpsc::Receiver<ExecutionOrder>>>,
    ctx: Arc<WorkerContext>,
    shutdown_tx: broadcast::Sender<()>,
) {
    let mut shutdown_rx = shutdown_tx.subscribe();
    tracing::debug!(worker_id, "Execution worker started");

    loop {
        let order = tokio::select! {
            // A stop signal prevents new dequeues; in-flight orders have
            // already left the queue.
            biased;
            _ = shutdown_rx.recv() => break,
            order = dequeue(&queue) => match order {
                Some(order) => order,
                None => break,
            },
        };

        let _ = ctx
            .queue_depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| {
                Some(d.saturating_sub(1))
            });
        observability::update_queue_depth(ctx.queue_depth.load(Ordering::SeqCst));

        let mut order = order;
        tracing::info!(
            worker_id,
            order_id = %order.id,
            bot_id = %order.bot_id,
            symbol = %order.symbol,
            algorithm = %order.algorithm,
            quantity = %order.quantity,
            "Order picked up"
        );

        // The order run consumes its own shutdown subscription so the
        // loop-level receiver still observes the signal afterwards.
        let mut order_shutdown_rx = shutdown_tx.subscribe();
        let result = drive_order(&mut order, &ctx, &mut order_shutdown_rx).await;

        ctx.orders
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(order.id, order.clone());

        observability::record_order_outcome(
            result.algorithm.as_str(),
            &result.status.to_string(),
            result.duration.as_secs_f64(),
        );
        let _ = ctx.results_tx.send(result);
    }

    tracing::debug!(worker_id, "Execution worker stopped");
}

async fn dequeue(
    queue: &Arc<tokio::sync::Mutex<mpsc::Receiver<ExecutionOrder>>>,
) -> Option<ExecutionOrder> {
    queue.lock().await.recv().await
}

/// Run one order to a terminal status.
async fn drive_order(
    order: &mut ExecutionOrder,
    ctx: &WorkerContext,
    shutdown_rx: &mut broadcast::Receiver<()>,
) -> ExecutionResult {
    let _ = order.transition(OrderStatus::Executing);

    let mut slices = match algorithm::plan(order, &ctx.algorithms, Utc::now()) {
        Ok(slices) => slices,
        Err(e) => {
            tracing::warn!(order_id = %order.id, error = %e, "Order planning failed");
            let _ = order.transition(OrderStatus::Failed);
            return ExecutionResult::from_order(order);
        }
    };

    let mut interrupted = false;
    for i in 0..slices.len() {
        if interrupted {
            slices[i].status = SliceStatus::Canceled;
            continue;
        }

        slices[i].status = SliceStatus::Scheduled;
        let now = Utc::now();
        if slices[i].scheduled_at > now {
            let wait = (slices[i].scheduled_at - now).to_std().unwrap_or_default();
            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                _ = shutdown_rx.recv() => {
                    tracing::info!(
                        order_id = %order.id,
                        slice = slices[i].slice_number,
                        "Shutdown interrupted pending slices"
                    );
                    interrupted = true;
                    slices[i].status = SliceStatus::Canceled;
                    continue;
                }
            }
        }

        slices[i].status = SliceStatus::Executing;
        execute_slice(order, &mut slices[i], ctx).await;
    }

    let filled = order.filled_quantity;
    let target = if filled >= order.quantity {
        OrderStatus::Completed
    } else if filled > Decimal::ZERO {
        OrderStatus::Partial
    } else if interrupted {
        OrderStatus::Canceled
    } else {
        OrderStatus::Failed
    };
    let _ = order.transition(target);

    tracing::info!(
        order_id = %order.id,
        status = %order.status,
        filled = %order.filled_quantity,
        requested = %order.quantity,
        avg_price = %order.avg_fill_price,
        "Order finished"
    );

    ExecutionResult::from_order(order)
}

/// Route one slice and execute its venue allocations.
///
/// A failing slice never aborts its siblings; every venue outcome is
/// recorded as a child execution.
async fn execute_slice(order: &mut ExecutionOrder, slice: &mut OrderSlice, ctx: &WorkerContext) {
    let decision = match ctx.router.route(slice, order) {
        Ok(decision) => decision,
        Err(e) => {
            tracing::warn!(
                order_id = %order.id,
                slice = slice.slice_number,
                error = %e,
                "Slice routing failed"
            );
            slice.status = SliceStatus::Failed;
            return;
        }
    };

    let budget = if order.algorithm == AlgorithmType::Sniper {
        ctx.config.sniper_timeout()
    } else {
        ctx.config.venue_call_timeout()
    };

    let mut slice_filled = Decimal::ZERO;
    for allocation in &decision.allocations {
        let Some(venue) = ctx.registry.get(&allocation.venue_id) else {
            tracing::warn!(venue = %allocation.venue_id, "Allocated venue disappeared");
            continue;
        };
        let breaker = ctx.breakers.for_venue(&allocation.venue_id);
        if !breaker.is_call_permitted() {
            tracing::debug!(venue = %allocation.venue_id, "Circuit open, skipping venue");
            continue;
        }

        let request = SliceRequest {
            order_id: order.id,
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: allocation.quantity,
            limit_price: slice.limit_price,
            decision_price: order.decision_price,
            time_in_force: order.time_in_force,
        };

        let started = Instant::now();
        let outcome = tokio::time::timeout(budget, venue.execute(request)).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(Ok(execution)) => {
                breaker.record_success();
                ctx.registry.record_outcome(
                    &allocation.venue_id,
                    true,
                    execution.latency,
                    execution.slippage,
                );
                ctx.metrics.record_execution(&execution);
                observability::record_venue_execution(
                    &allocation.venue_id,
                    "filled",
                    elapsed.as_secs_f64(),
                );
                ctx.gate.record_fill(
                    &order.bot_id,
                    &order.symbol,
                    order.side,
                    execution.quantity,
                    execution.price,
                );
                slice_filled += execution.quantity;
                order.record_execution(execution);
            }
            Ok(Err(venue_error)) => {
                tracing::warn!(
                    order_id = %order.id,
                    venue = %allocation.venue_id,
                    error = %venue_error,
                    "Venue rejected child order"
                );
                breaker.record_failure();
                ctx.registry.record_outcome(
                    &allocation.venue_id,
                    false,
                    elapsed,
                    Decimal::ZERO,
                );
                let failed = ChildExecution::failed(
                    &allocation.venue_id,
                    ExecutionStatus::Rejected,
                    elapsed,
                );
                ctx.metrics.record_execution(&failed);
                observability::record_venue_execution(
                    &allocation.venue_id,
                    "rejected",
                    elapsed.as_secs_f64(),
                );
                order.record_execution(failed);
            }
            Err(_) => {
                tracing::warn!(
                    order_id = %order.id,
                    venue = %allocation.venue_id,
                    budget_ms = %budget.as_millis(),
                    "Venue call exceeded its latency budget"
                );
                breaker.record_failure();
                ctx.registry
                    .record_outcome(&allocation.venue_id, false, budget, Decimal::ZERO);
                let failed = ChildExecution::failed(
                    &allocation.venue_id,
                    ExecutionStatus::TimedOut,
                    budget,
                );
                ctx.metrics.record_execution(&failed);
                observability::record_venue_execution(
                    &allocation.venue_id,
                    "timed_out",
                    budget.as_secs_f64(),
                );
                order.record_execution(failed);
            }
        }
    }

    slice.status = if slice_filled > Decimal::ZERO {
        SliceStatus::Filled
    } else {
        SliceStatus::Failed
    };
}
