//! Execution Core Binary
//!
//! Starts the Meridian execution core with the configured venue set.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin execution-core
//! ```
//!
//! # Environment Variables
//!
//! - `EXECUTION_CORE_CONFIG`: Path to the YAML config (default: config.yaml;
//!   falls back to built-in defaults when the file is absent)
//! - `OTEL_ENABLED`: Set to `false` for console-only logging
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use execution_core::alerting::{AlertManager, LogChannel, WebhookChannel};
use execution_core::config::{Config, load_config};
use execution_core::engine::ExecutionEngine;
use execution_core::metrics::MetricsAggregator;
use execution_core::models::VenueInfo;
use execution_core::observability::{MetricsConfig, init_metrics};
use execution_core::resilience::{BreakerRegistry, CircuitBreakerConfig};
use execution_core::risk::{RiskGate, RiskMonitor};
use execution_core::router::SmartOrderRouter;
use execution_core::telemetry::init_telemetry;
use execution_core::venue::{PaperVenue, VenueMonitor, VenueRegistry};
use anyhow::Context;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _telemetry_guard = init_telemetry();

    tracing::info!("Starting Meridian Execution Core");

    let config = load_configuration();

    if config.observability.metrics_enabled {
        let addr = config
            .observability
            .metrics_addr
            .parse()
            .context("invalid metrics listen address")?;
        if let Err(e) = init_metrics(&MetricsConfig::with_addr(addr)) {
            tracing::warn!(error = %e, "Metrics exporter failed to start, continuing without");
        }
    }

    // Alerting
    let alerts = Arc::new(AlertManager::new());
    if config.alerting.log_alerts {
        alerts.register_channel(Arc::new(LogChannel::new()));
    }
    if let Some(url) = &config.alerting.webhook_url {
        alerts.register_channel(Arc::new(WebhookChannel::new(url.clone())));
    }

    // Venues
    let registry = Arc::new(VenueRegistry::new());
    let breakers = Arc::new(BreakerRegistry::new(CircuitBreakerConfig::default()));
    for paper in &config.venues.paper {
        let venue = Arc::new(PaperVenue::new(paper.clone()));
        let mut info = VenueInfo::new(&paper.name, paper.fee_rate, paper.latency())
            .with_symbols(paper.symbols.clone());
        for symbol in &paper.symbols {
            info.liquidity.insert(symbol.clone(), paper.liquidity);
        }
        registry.register(venue, info);
    }

    // Risk gate (bots named in risk.bot_overrides register automatically)
    let gate = Arc::new(RiskGate::new(config.risk.clone(), Arc::clone(&alerts)));

    // Router
    let router = Arc::new(SmartOrderRouter::new(
        Arc::clone(&registry),
        Arc::clone(&breakers),
        config.router.clone(),
    ));

    // Engine
    let metrics = Arc::new(MetricsAggregator::new());
    let engine = Arc::new(ExecutionEngine::new(
        config.engine.clone(),
        config.algorithms.clone(),
        Arc::clone(&gate),
        router,
        Arc::clone(&registry),
        Arc::clone(&breakers),
        Arc::clone(&metrics),
    ));
    engine.start();

    // Background tasks
    let risk_monitor = RiskMonitor::new(Arc::clone(&gate), config.risk.monitor_interval());
    tokio::spawn(risk_monitor.run(engine.subscribe_shutdown()));

    let venue_monitor = VenueMonitor::new(
        Arc::clone(&registry),
        Arc::clone(&breakers),
        config.venues.monitor_interval(),
    );
    tokio::spawn(venue_monitor.run(engine.subscribe_shutdown()));

    {
        let metrics = Arc::clone(&metrics);
        let results = engine.subscribe_results();
        let shutdown = engine.subscribe_shutdown();
        tokio::spawn(async move {
            metrics.run(results, shutdown).await;
        });
    }

    tracing::info!(
        venues = config.venues.paper.len(),
        workers = config.engine.worker_count,
        "Execution core ready"
    );

    wait_for_shutdown_signal().await;

    tracing::info!("Shutdown signal received, draining");
    engine.shutdown().await;
    // Give the alert fan-out a moment to flush.
    tokio::time::sleep(Duration::from_millis(100)).await;
    tracing::info!("Execution core stopped");

    Ok(())
}

/// Load the config file, falling back to defaults when absent.
fn load_configuration() -> Config {
    let path = std::env::var("EXECUTION_CORE_CONFIG").ok();
    match load_config(path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Config not loaded, using built-in defaults");
            Config::default()
        }
    }
}

/// Wait for ctrl-c (or SIGTERM on unix).
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            signal::unix::signal(signal::unix::SignalKind::terminate()).expect("signal handler");
        tokio::select! {
            _ = signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
    }
}
