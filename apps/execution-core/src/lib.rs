// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::field_reassign_with_default
    )
)]

//! Execution Core - Rust Library
//!
//! Multi-venue execution core for the Meridian trading platform. Takes
//! abstract trading intents (buy/sell N units of an asset under some
//! algorithm) and turns them into a sequence of venue-routed child orders,
//! continuously enforcing risk limits and producing auditable execution
//! metrics.
//!
//! # Architecture
//!
//! ```text
//! OrderRequest ──► RiskGate ──► bounded queue ──► worker pool
//!                     │                               │
//!                     │ alerts                        ├─► algorithm plan
//!                     ▼                               │   (TWAP/VWAP/Iceberg/...)
//!               AlertManager ◄── RiskMonitor          ├─► SmartOrderRouter
//!                                                     ├─► ExecutionVenue calls
//!                                                     ▼
//!                                          results ──► MetricsAggregator
//! ```
//!
//! - `models`: orders, slices, child executions, venue profiles, routing
//!   decisions, risk limits/metrics, alerts
//! - `venue`: venue adapter trait, registry, paper venue, health monitor
//! - `resilience`: per-venue circuit breakers
//! - `algorithm`: TWAP, VWAP, Iceberg slicing (Market/Sniper single-shot)
//! - `router`: venue selection strategies and routing rules
//! - `risk`: two-tier risk gate, background risk monitor
//! - `alerting`: alert manager and pluggable channels
//! - `metrics`: execution metrics aggregation
//! - `engine`: bounded queue, worker pool, lifecycle

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod alerting;
pub mod algorithm;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod models;
pub mod observability;
pub mod resilience;
pub mod risk;
pub mod router;
pub mod telemetry;
pub mod venue;

// =============================================================================
// Re-exports
// =============================================================================

pub use alerting::{AlertChannel, AlertManager, LogChannel, WebhookChannel};
pub use config::{Config, load_config, load_config_from_string};
pub use engine::ExecutionEngine;
pub use error::{EngineError, ErrorCode, ErrorKind};
pub use metrics::{MetricsAggregator, MetricsSnapshot};
pub use models::{
    AlgorithmType, ChildExecution, ExecutionOrder, ExecutionResult, OrderRequest, OrderSide,
    OrderSlice, OrderStatus, OrderType, RiskAlert, RiskLimits, RoutingDecision, RoutingStrategy,
    TimeInForce, VenueInfo,
};
pub use resilience::{BreakerRegistry, CircuitBreaker, CircuitBreakerConfig};
pub use risk::{RiskGate, RiskMonitor};
pub use router::{RoutingRule, RuleAction, SmartOrderRouter};
pub use venue::{ExecutionVenue, PaperVenue, VenueMonitor, VenueRegistry};
