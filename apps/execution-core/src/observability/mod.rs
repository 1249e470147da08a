//! Operational observability: Prometheus metrics helpers.

mod metrics;

pub use metrics::{
    MetricsConfig, MetricsError, init_metrics, record_alert, record_order_outcome,
    record_order_submission, record_risk_rejection, record_routing_decision,
    record_routing_rejection, record_venue_execution, update_queue_depth,
};
