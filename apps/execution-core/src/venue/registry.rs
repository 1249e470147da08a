//! Concurrent venue registry.
//!
//! Owns both the adapter handles and the rolling [`VenueInfo`] profiles.
//! Routing decisions take read locks; profile refreshes and registration
//! take write locks. No I/O happens while a lock is held.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::models::VenueInfo;

use super::ExecutionVenue;

/// Smoothing factor for rolling venue statistics.
const ROLLING_ALPHA: f64 = 0.1;

/// Registry of execution venues and their profiles.
#[derive(Default)]
pub struct VenueRegistry {
    venues: RwLock<HashMap<String, Arc<dyn ExecutionVenue>>>,
    profiles: RwLock<HashMap<String, VenueInfo>>,
}

impl VenueRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a venue with its initial profile.
    ///
    /// Re-registering an existing venue replaces both the adapter and the
    /// profile.
    pub fn register(&self, venue: Arc<dyn ExecutionVenue>, info: VenueInfo) {
        let name = venue.name().to_string();
        self.venues_write().insert(name.clone(), venue);
        self.profiles_write().insert(name.clone(), info);
        tracing::info!(venue = %name, "Venue registered");
    }

    /// Remove a venue at runtime.
    pub fn remove(&self, venue_id: &str) {
        self.venues_write().remove(venue_id);
        self.profiles_write().remove(venue_id);
        tracing::info!(venue = %venue_id, "Venue removed");
    }

    /// Get the adapter for a venue.
    #[must_use]
    pub fn get(&self, venue_id: &str) -> Option<Arc<dyn ExecutionVenue>> {
        self.venues_read().get(venue_id).cloned()
    }

    /// Get a venue's profile.
    #[must_use]
    pub fn profile(&self, venue_id: &str) -> Option<VenueInfo> {
        self.profiles_read().get(venue_id).cloned()
    }

    /// Snapshot of all venue profiles.
    #[must_use]
    pub fn snapshot(&self) -> Vec<VenueInfo> {
        self.profiles_read().values().cloned().collect()
    }

    /// All registered venue ids.
    #[must_use]
    pub fn venue_ids(&self) -> Vec<String> {
        self.venues_read().keys().cloned().collect()
    }

    /// Profiles eligible for an order: available, symbol supported, and
    /// quantity within size bounds.
    #[must_use]
    pub fn eligible(&self, symbol: &str, quantity: Decimal) -> Vec<VenueInfo> {
        self.profiles_read()
            .values()
            .filter(|info| {
                info.available && info.supports(symbol) && info.accepts_quantity(quantity)
            })
            .cloned()
            .collect()
    }

    /// Apply a mutation to one venue's profile.
    pub fn update_profile(&self, venue_id: &str, update: impl FnOnce(&mut VenueInfo)) {
        if let Some(info) = self.profiles_write().get_mut(venue_id) {
            update(info);
        }
    }

    /// Fold one execution outcome into the venue's rolling statistics.
    pub fn record_outcome(
        &self,
        venue_id: &str,
        filled: bool,
        latency: Duration,
        slippage: Decimal,
    ) {
        let mut profiles = self.profiles_write();
        let Some(info) = profiles.get_mut(venue_id) else {
            return;
        };

        let outcome = if filled { 1.0 } else { 0.0 };
        info.fill_rate = roll(info.fill_rate, outcome);
        info.reliability = roll(info.reliability, outcome);

        if filled {
            let rolled_latency =
                roll(as_secs_f64(info.avg_latency), as_secs_f64(latency));
            info.avg_latency = Duration::from_secs_f64(rolled_latency.max(0.0));
            // Incremental mean; acceptable drift for an operational metric.
            info.avg_slippage =
                info.avg_slippage + (slippage - info.avg_slippage) * Decimal::new(1, 1);
        }
    }

    /// Refresh a venue's health fields from its adapter.
    ///
    /// The adapter is queried *before* the profile lock is taken.
    pub fn refresh_health(&self, venue_id: &str) {
        let Some(venue) = self.get(venue_id) else {
            return;
        };
        let available = venue.is_available();
        let latency = venue.latency();
        let fee_rate = venue.fee_rate();

        self.update_profile(venue_id, |info| {
            info.available = available;
            info.avg_latency = latency;
            info.fee_rate = fee_rate;
            if available {
                info.last_health_check = Some(Utc::now());
            }
        });
    }

    fn venues_read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn ExecutionVenue>>> {
        self.venues
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn venues_write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn ExecutionVenue>>> {
        self.venues
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn profiles_read(&self) -> RwLockReadGuard<'_, HashMap<String, VenueInfo>> {
        self.profiles
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn profiles_write(&self) -> RwLockWriteGuard<'_, HashMap<String, VenueInfo>> {
        self.profiles
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Exponential moving average step.
fn roll(current: f64, sample: f64) -> f64 {
    ROLLING_ALPHA.mul_add(sample - current, current)
}

fn as_secs_f64(duration: Duration) -> f64 {
    duration.as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaperVenueConfig;
    use crate::venue::PaperVenue;
    use rust_decimal_macros::dec;

    fn paper(name: &str) -> Arc<PaperVenue> {
        Arc::new(PaperVenue::new(PaperVenueConfig {
            name: name.to_string(),
            fee_rate: dec!(0.001),
            latency_ms: 10,
            slippage_bps: dec!(2),
            fill_probability: 1.0,
            symbols: Vec::new(),
            liquidity: dec!(100_000),
        }))
    }

    fn info(name: &str) -> VenueInfo {
        VenueInfo::new(name, dec!(0.001), Duration::from_millis(10))
    }

    #[test]
    fn register_and_lookup() {
        let registry = VenueRegistry::new();
        registry.register(paper("alpha"), info("alpha"));

        assert!(registry.get("alpha").is_some());
        assert!(registry.profile("alpha").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.snapshot().len(), 1);
    }

    #[test]
    fn remove_drops_both_maps() {
        let registry = VenueRegistry::new();
        registry.register(paper("alpha"), info("alpha"));
        registry.remove("alpha");

        assert!(registry.get("alpha").is_none());
        assert!(registry.profile("alpha").is_none());
    }

    #[test]
    fn eligible_filters_unavailable_venues() {
        let registry = VenueRegistry::new();
        registry.register(paper("alpha"), info("alpha"));
        registry.register(paper("beta"), info("beta"));
        registry.update_profile("beta", |i| i.available = false);

        let eligible = registry.eligible("BTC-USD", dec!(1));
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].venue_id, "alpha");
    }

    #[test]
    fn eligible_filters_by_symbol_and_size() {
        let registry = VenueRegistry::new();
        registry.register(
            paper("alpha"),
            info("alpha").with_symbols(vec!["ETH-USD".to_string()]),
        );
        registry.register(
            paper("beta"),
            info("beta").with_size_bounds(dec!(10), dec!(100)),
        );

        // alpha does not support the symbol; beta rejects the size
        assert!(registry.eligible("BTC-USD", dec!(1)).is_empty());
        // beta accepts within bounds
        assert_eq!(registry.eligible("BTC-USD", dec!(50)).len(), 1);
    }

    #[test]
    fn record_outcome_moves_fill_rate() {
        let registry = VenueRegistry::new();
        registry.register(paper("alpha"), info("alpha"));

        registry.record_outcome("alpha", false, Duration::from_millis(10), dec!(0));
        let profile = registry.profile("alpha").unwrap();
        assert!(profile.fill_rate < 1.0);
        assert!(profile.reliability < 1.0);
    }

    #[test]
    fn refresh_health_marks_outage() {
        let registry = VenueRegistry::new();
        let venue = paper("alpha");
        registry.register(venue.clone(), info("alpha"));

        venue.set_available(false);
        registry.refresh_health("alpha");

        let profile = registry.profile("alpha").unwrap();
        assert!(!profile.available);
    }
}
