//! Circuit breaker for venue call resilience.
//!
//! Prevents cascading failures when an execution venue becomes unavailable
//! or unresponsive. An OPEN breaker removes the venue from routing
//! eligibility until its wait duration elapses and test calls succeed.
//!
//! # State Machine
//!
//! ```text
//! CLOSED → OPEN (failure rate >= threshold)
//! OPEN → HALF_OPEN (wait duration elapsed)
//! HALF_OPEN → CLOSED (test calls succeed)
//! HALF_OPEN → OPEN (test calls fail)
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Circuit is closed, calls flow normally.
    Closed,
    /// Circuit is open, calls are rejected.
    Open,
    /// Circuit is testing with limited calls.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Failure rate threshold to open the circuit (0.0-1.0).
    pub failure_rate_threshold: f64,
    /// Number of call outcomes tracked in the sliding window.
    pub sliding_window_size: usize,
    /// Minimum calls before evaluating the failure rate.
    pub minimum_calls: usize,
    /// Duration to stay in `OPEN` state.
    pub wait_duration_in_open: Duration,
    /// Permitted test calls in `HALF_OPEN` state.
    pub permitted_calls_in_half_open: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            sliding_window_size: 20,
            minimum_calls: 5,
            wait_duration_in_open: Duration::from_secs(10),
            permitted_calls_in_half_open: 3,
        }
    }
}

/// Mutable breaker state, guarded by one lock.
#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    half_open_calls: u32,
    half_open_successes: u32,
    total_calls: u64,
    total_failures: u64,
}

impl BreakerInner {
    const fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            window: VecDeque::new(),
            opened_at: None,
            half_open_calls: 0,
            half_open_successes: 0,
            total_calls: 0,
            total_failures: 0,
        }
    }

    fn failure_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let failures = self.window.iter().filter(|ok| !**ok).count();
        failures as f64 / self.window.len() as f64
    }
}

/// Circuit breaker guarding calls against one venue.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Venue name for logging.
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker.
    #[must_use]
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner::new()),
        }
    }

    /// Get the venue name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the current state, applying any pending OPEN -> HALF_OPEN
    /// time-based transition.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.roll_open_state(&mut inner);
        inner.state
    }

    /// Check if a call is permitted.
    #[must_use]
    pub fn is_call_permitted(&self) -> bool {
        let mut inner = self.lock();
        self.roll_open_state(&mut inner);
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                inner.half_open_calls < self.config.permitted_calls_in_half_open
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        self.record_outcome(true);
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        self.record_outcome(false);
    }

    fn record_outcome(&self, ok: bool) {
        let mut inner = self.lock();
        inner.total_calls += 1;
        if !ok {
            inner.total_failures += 1;
        }

        match inner.state {
            CircuitState::Closed => {
                inner.window.push_back(ok);
                while inner.window.len() > self.config.sliding_window_size {
                    inner.window.pop_front();
                }
                if inner.window.len() >= self.config.minimum_calls
                    && inner.failure_rate() >= self.config.failure_rate_threshold
                {
                    self.open(&mut inner);
                }
            }
            CircuitState::HalfOpen => {
                inner.half_open_calls += 1;
                if ok {
                    inner.half_open_successes += 1;
                    if inner.half_open_successes >= self.config.permitted_calls_in_half_open {
                        self.close(&mut inner);
                    }
                } else {
                    // Any failure during the test phase re-opens the circuit.
                    self.open(&mut inner);
                }
            }
            CircuitState::Open => {
                tracing::warn!(venue = %self.name, "Call recorded while circuit is OPEN");
            }
        }
    }

    fn roll_open_state(&self, inner: &mut BreakerInner) {
        if inner.state == CircuitState::Open
            && let Some(opened) = inner.opened_at
            && opened.elapsed() >= self.config.wait_duration_in_open
        {
            inner.state = CircuitState::HalfOpen;
            inner.half_open_calls = 0;
            inner.half_open_successes = 0;
            tracing::info!(venue = %self.name, "Circuit breaker testing (HALF_OPEN)");
        }
    }

    fn open(&self, inner: &mut BreakerInner) {
        if inner.state != CircuitState::Open {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            tracing::warn!(
                venue = %self.name,
                failure_rate = inner.failure_rate(),
                "Circuit breaker opened"
            );
        }
    }

    fn close(&self, inner: &mut BreakerInner) {
        inner.state = CircuitState::Closed;
        inner.window.clear();
        inner.opened_at = None;
        tracing::info!(venue = %self.name, "Circuit breaker closed");
    }

    /// Force the breaker open (venue health check hard failure).
    pub fn force_open(&self) {
        let mut inner = self.lock();
        self.open(&mut inner);
    }

    /// Force the breaker closed (operator recovery).
    pub fn force_close(&self) {
        let mut inner = self.lock();
        self.close(&mut inner);
    }

    /// Snapshot of breaker counters.
    #[must_use]
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let mut inner = self.lock();
        self.roll_open_state(&mut inner);
        CircuitBreakerMetrics {
            name: self.name.clone(),
            state: inner.state,
            total_calls: inner.total_calls,
            total_failures: inner.total_failures,
            failure_rate: inner.failure_rate(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Snapshot of one breaker's counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    /// Venue name.
    pub name: String,
    /// Current state.
    pub state: CircuitState,
    /// Total calls.
    pub total_calls: u64,
    /// Total failures.
    pub total_failures: u64,
    /// Current failure rate (0.0-1.0).
    pub failure_rate: f64,
}

/// Per-venue breakers, created on demand as venues register.
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    /// Create a registry applying one configuration to all venues.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: RwLock::new(HashMap::new()),
        }
    }

    /// Get (or lazily create) the breaker for a venue.
    #[must_use]
    pub fn for_venue(&self, venue: &str) -> Arc<CircuitBreaker> {
        {
            let breakers = self.read();
            if let Some(breaker) = breakers.get(venue) {
                return Arc::clone(breaker);
            }
        }
        let mut breakers = self
            .breakers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(
            breakers
                .entry(venue.to_string())
                .or_insert_with(|| {
                    Arc::new(CircuitBreaker::new(venue, self.config.clone()))
                }),
        )
    }

    /// Whether calls to a venue are currently permitted.
    #[must_use]
    pub fn is_call_permitted(&self, venue: &str) -> bool {
        self.for_venue(venue).is_call_permitted()
    }

    /// Snapshot of all breaker metrics.
    #[must_use]
    pub fn all_metrics(&self) -> Vec<CircuitBreakerMetrics> {
        self.read().values().map(|b| b.metrics()).collect()
    }

    fn read(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<CircuitBreaker>>> {
        self.breakers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_rate_threshold: 0.5,
            sliding_window_size: 10,
            minimum_calls: 4,
            wait_duration_in_open: Duration::from_millis(10),
            permitted_calls_in_half_open: 2,
        }
    }

    #[test]
    fn initial_state_is_closed() {
        let breaker = CircuitBreaker::new("alpha", CircuitBreakerConfig::default());
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.is_call_permitted());
    }

    #[test]
    fn opens_at_failure_threshold() {
        let breaker = CircuitBreaker::new("alpha", fast_config());

        breaker.record_success();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();

        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.is_call_permitted());
    }

    #[test]
    fn stays_closed_below_minimum_calls() {
        let breaker = CircuitBreaker::new("alpha", fast_config());

        breaker.record_failure();
        breaker.record_failure();

        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn open_transitions_to_half_open_after_wait() {
        let breaker = CircuitBreaker::new("alpha", fast_config());
        for _ in 0..4 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.is_call_permitted());
    }

    #[test]
    fn half_open_closes_on_successes() {
        let breaker = CircuitBreaker::new("alpha", fast_config());
        for _ in 0..4 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success();
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_reopens_on_failure() {
        let breaker = CircuitBreaker::new("alpha", fast_config());
        for _ in 0..4 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn force_open_and_close() {
        let breaker = CircuitBreaker::new("alpha", CircuitBreakerConfig::default());
        breaker.force_open();
        assert_eq!(breaker.state(), CircuitState::Open);
        breaker.force_close();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn metrics_track_counts() {
        let breaker = CircuitBreaker::new("alpha", CircuitBreakerConfig::default());
        breaker.record_success();
        breaker.record_success();
        breaker.record_failure();

        let metrics = breaker.metrics();
        assert_eq!(metrics.total_calls, 3);
        assert_eq!(metrics.total_failures, 1);
        assert!((metrics.failure_rate - 1.0 / 3.0).abs() < 0.001);
    }

    #[test]
    fn registry_creates_breakers_on_demand() {
        let registry = BreakerRegistry::new(CircuitBreakerConfig::default());
        assert!(registry.is_call_permitted("alpha"));
        registry.for_venue("alpha").force_open();
        assert!(!registry.is_call_permitted("alpha"));
        assert!(registry.is_call_permitted("beta"));
        assert_eq!(registry.all_metrics().len(), 2);
    }
}
