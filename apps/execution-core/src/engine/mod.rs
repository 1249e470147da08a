//! Execution engine: bounded queue and fixed worker pool.
//!
//! Submission is non-blocking: [`ExecutionEngine::submit`] validates the
//! order, passes it through the risk gate, and `try_send`s it into a
//! bounded queue, failing fast with a backpressure error when the queue is
//! full. A fixed pool of workers pulls one order at a time and runs it to
//! completion; results stream to subscribers and the metrics aggregator.
//!
//! Shutdown drains in-flight workers within a bounded wait: the stop signal
//! prevents new dequeues and interrupts pending slice waits, but never
//! force-aborts a venue call in progress.

mod worker;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use rust_decimal::Decimal;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::{AlgorithmConfig, EngineConfig};
use crate::error::EngineError;
use crate::metrics::{MetricsAggregator, MetricsSnapshot};
use crate::models::{
    ExecutionOrder, ExecutionResult, OrderRequest, OrderType, RouterMetrics,
};
use crate::observability;
use crate::resilience::BreakerRegistry;
use crate::risk::RiskGate;
use crate::router::SmartOrderRouter;
use crate::venue::VenueRegistry;

use worker::{WorkerContext, worker_loop};

/// Capacity of the result broadcast stream.
const RESULT_STREAM_CAPACITY: usize = 1_024;

/// The execution engine.
pub struct ExecutionEngine {
    config: EngineConfig,
    gate: Arc<RiskGate>,
    router: Arc<SmartOrderRouter>,
    metrics: Arc<MetricsAggregator>,
    queue_tx: mpsc::Sender<ExecutionOrder>,
    queue: Arc<tokio::sync::Mutex<mpsc::Receiver<ExecutionOrder>>>,
    started: std::sync::atomic::AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    results_tx: broadcast::Sender<ExecutionResult>,
    orders: Arc<RwLock<HashMap<Uuid, ExecutionOrder>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    queue_depth: Arc<AtomicUsize>,
    ctx: Arc<WorkerContext>,
}

impl ExecutionEngine {
    /// Wire up an engine from its collaborators. Call [`Self::start`] to
    /// spawn the worker pool.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        algorithms: AlgorithmConfig,
        gate: Arc<RiskGate>,
        router: Arc<SmartOrderRouter>,
        registry: Arc<VenueRegistry>,
        breakers: Arc<BreakerRegistry>,
        metrics: Arc<MetricsAggregator>,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity);
        let (shutdown_tx, _) = broadcast::channel(1);
        let (results_tx, _) = broadcast::channel(RESULT_STREAM_CAPACITY);
        let orders = Arc::new(RwLock::new(HashMap::new()));
        let queue_depth = Arc::new(AtomicUsize::new(0));

        let ctx = Arc::new(WorkerContext {
            config: config.clone(),
            algorithms,
            gate: Arc::clone(&gate),
            router: Arc::clone(&router),
            registry,
            breakers,
            metrics: Arc::clone(&metrics),
            results_tx: results_tx.clone(),
            orders: Arc::clone(&orders),
            queue_depth: Arc::clone(&queue_depth),
        });

        Self {
            config,
            gate,
            router,
            metrics,
            queue_tx,
            queue: Arc::new(tokio::sync::Mutex::new(queue_rx)),
            started: std::sync::atomic::AtomicBool::new(false),
            shutdown_tx,
            results_tx,
            orders,
            workers: Mutex::new(Vec::new()),
            queue_depth,
            ctx,
        }
    }

    /// Spawn the worker pool. Idempotent: subsequent calls are no-ops.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::warn!("Engine already started");
            return;
        }

        let mut workers = self.lock_workers();
        for worker_id in 0..self.config.worker_count {
            workers.push(tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&self.queue),
                Arc::clone(&self.ctx),
                self.shutdown_tx.clone(),
            )));
        }

        tracing::info!(
            workers = self.config.worker_count,
            queue_capacity = self.config.queue_capacity,
            "Execution engine started"
        );
    }

    /// Submit a trading intent.
    ///
    /// Returns the engine-assigned order id synchronously; final and
    /// partial results arrive on the result stream
    /// ([`Self::subscribe_results`]).
    ///
    /// # Errors
    ///
    /// - Validation errors (malformed order, risk-limit breach) are
    ///   rejected before enqueue and never retried automatically.
    /// - [`EngineError::queue_full`] signals backpressure; the caller
    ///   decides whether to retry.
    pub fn submit(&self, request: OrderRequest) -> Result<Uuid, EngineError> {
        Self::validate_request(&request)?;

        let limits = self.gate.validate(&request).inspect_err(|_| {
            observability::record_order_submission(request.algorithm.as_str(), "rejected");
        })?;

        let order = ExecutionOrder::from_request(request, limits);
        let order_id = order.id;
        let algorithm = order.algorithm;

        self.write_orders().insert(order_id, order.clone());

        match self.queue_tx.try_send(order) {
            Ok(()) => {
                let depth = self.queue_depth.fetch_add(1, Ordering::SeqCst) + 1;
                observability::update_queue_depth(depth);
                observability::record_order_submission(algorithm.as_str(), "accepted");
                tracing::debug!(order_id = %order_id, depth, "Order enqueued");
                Ok(order_id)
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.write_orders().remove(&order_id);
                observability::record_order_submission(algorithm.as_str(), "queue_full");
                Err(EngineError::queue_full(self.config.queue_capacity))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.write_orders().remove(&order_id);
                Err(EngineError::internal("execution queue is closed"))
            }
        }
    }

    /// Subscribe to the stream of terminal order results.
    #[must_use]
    pub fn subscribe_results(&self) -> broadcast::Receiver<ExecutionResult> {
        self.results_tx.subscribe()
    }

    /// Subscribe to the engine's shutdown signal (for companion tasks).
    #[must_use]
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Snapshot of one order's current state.
    #[must_use]
    pub fn order(&self, order_id: Uuid) -> Option<ExecutionOrder> {
        self.orders
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&order_id)
            .cloned()
    }

    /// Current queue depth.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::SeqCst)
    }

    /// Read-only execution metrics snapshot.
    #[must_use]
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Read-only router metrics snapshot.
    #[must_use]
    pub fn router_metrics(&self) -> RouterMetrics {
        self.router.metrics()
    }

    /// The risk gate (operator surface: halts, limit updates, snapshots).
    #[must_use]
    pub fn risk_gate(&self) -> Arc<RiskGate> {
        Arc::clone(&self.gate)
    }

    /// Stop accepting dequeues and drain in-flight workers within the
    /// configured bounded wait.
    pub async fn shutdown(&self) {
        tracing::info!("Engine shutdown requested");
        let _ = self.shutdown_tx.send(());

        let handles: Vec<JoinHandle<()>> = self.lock_workers().drain(..).collect();
        let drain = async {
            for handle in handles {
                let _ = handle.await;
            }
        };

        if tokio::time::timeout(self.config.shutdown_timeout(), drain)
            .await
            .is_err()
        {
            tracing::warn!(
                timeout_secs = self.config.shutdown_timeout().as_secs(),
                "Shutdown timed out with workers still in flight"
            );
        } else {
            tracing::info!("Engine drained");
        }
    }

    /// Shape validation, before any risk state is consulted.
    fn validate_request(request: &OrderRequest) -> Result<(), EngineError> {
        if request.symbol.trim().is_empty() {
            return Err(EngineError::malformed("symbol must not be empty"));
        }
        if request.bot_id.trim().is_empty() {
            return Err(EngineError::malformed("bot_id must not be empty"));
        }
        if request.quantity <= Decimal::ZERO {
            return Err(EngineError::malformed(format!(
                "quantity must be positive, got {}",
                request.quantity
            )));
        }
        if request.decision_price <= Decimal::ZERO {
            return Err(EngineError::malformed(format!(
                "decision_price must be positive, got {}",
                request.decision_price
            )));
        }
        if request.order_type == OrderType::Limit && request.limit_price.is_none() {
            return Err(EngineError::malformed(
                "limit orders require a limit_price",
            ));
        }
        if let Some(limit) = request.limit_price
            && limit <= Decimal::ZERO
        {
            return Err(EngineError::malformed(format!(
                "limit_price must be positive, got {limit}"
            )));
        }
        Ok(())
    }

    fn lock_workers(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_orders(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, ExecutionOrder>> {
        self.orders
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
