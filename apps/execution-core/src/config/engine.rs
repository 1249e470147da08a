//! Worker pool and queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Execution engine configuration.
///
/// Worker count and queue capacity are boot-time settings; changing them
/// requires a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of execution workers.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Capacity of the bounded submission queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Bounded wait for in-flight workers on shutdown (seconds).
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    /// Latency budget per venue call (milliseconds).
    #[serde(default = "default_venue_call_timeout_ms")]
    pub venue_call_timeout_ms: u64,
    /// Tightened latency budget for sniper orders (milliseconds).
    #[serde(default = "default_sniper_timeout_ms")]
    pub sniper_timeout_ms: u64,
}

const fn default_worker_count() -> usize {
    10
}

const fn default_queue_capacity() -> usize {
    1_000
}

const fn default_shutdown_timeout_secs() -> u64 {
    30
}

const fn default_venue_call_timeout_ms() -> u64 {
    5_000
}

const fn default_sniper_timeout_ms() -> u64 {
    500
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            venue_call_timeout_ms: default_venue_call_timeout_ms(),
            sniper_timeout_ms: default_sniper_timeout_ms(),
        }
    }
}

impl EngineConfig {
    /// Shutdown drain timeout.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Default venue call timeout.
    #[must_use]
    pub const fn venue_call_timeout(&self) -> Duration {
        Duration::from_millis(self.venue_call_timeout_ms)
    }

    /// Tightened sniper timeout.
    #[must_use]
    pub const fn sniper_timeout(&self) -> Duration {
        Duration::from_millis(self.sniper_timeout_ms)
    }
}
