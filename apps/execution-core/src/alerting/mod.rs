//! Risk alerting.
//!
//! Alerts are typed events fanned out asynchronously to zero or more
//! pluggable channels. Channel failures are logged and never block alert
//! creation or order processing.

mod channels;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AlertStatus, RiskAlert};
use crate::observability;

pub use channels::{LogChannel, RecordingChannel, WebhookChannel};

/// Errors returned by alert channels.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The channel failed to deliver the alert.
    #[error("alert delivery failed: {0}")]
    Delivery(String),
}

/// Errors returned by alert lifecycle operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlertError {
    /// Unknown alert id.
    #[error("alert {0} not found")]
    NotFound(Uuid),
    /// Lifecycle transition not allowed.
    #[error("alert {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        /// Alert id.
        id: Uuid,
        /// Current status.
        from: AlertStatus,
        /// Requested status.
        to: AlertStatus,
    },
}

/// Capability interface for one alert delivery channel.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// Deliver one alert.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] on delivery failure; the manager logs the
    /// failure and continues.
    async fn send(&self, alert: &RiskAlert) -> Result<(), ChannelError>;

    /// Channel type label ("log", "webhook", ...).
    fn channel_type(&self) -> &str;

    /// Whether the channel is currently enabled.
    fn enabled(&self) -> bool;
}

/// Creates, stores, and fans out risk alerts.
#[derive(Default)]
pub struct AlertManager {
    channels: RwLock<Vec<Arc<dyn AlertChannel>>>,
    alerts: RwLock<HashMap<Uuid, RiskAlert>>,
}

impl AlertManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a delivery channel.
    pub fn register_channel(&self, channel: Arc<dyn AlertChannel>) {
        tracing::info!(channel = channel.channel_type(), "Alert channel registered");
        self.channels_write().push(channel);
    }

    /// Raise an alert: store it and fan it out to all enabled channels.
    ///
    /// Fan-out happens on a spawned task; this method never blocks on
    /// channel I/O.
    pub fn raise(&self, alert: RiskAlert) -> Uuid {
        let id = alert.id;
        observability::record_alert(alert.alert_type.as_str(), alert.severity.as_str());
        self.alerts_write().insert(id, alert.clone());

        let channels: Vec<Arc<dyn AlertChannel>> = self
            .channels_read()
            .iter()
            .filter(|c| c.enabled())
            .cloned()
            .collect();

        if !channels.is_empty() {
            let fan_out = async move {
                let sends = channels.iter().map(|channel| {
                    let alert = alert.clone();
                    let channel = Arc::clone(channel);
                    async move {
                        if let Err(e) = channel.send(&alert).await {
                            tracing::warn!(
                                channel = channel.channel_type(),
                                alert_id = %alert.id,
                                error = %e,
                                "Alert channel delivery failed"
                            );
                        }
                    }
                });
                join_all(sends).await;
            };

            // Alerts raised from synchronous contexts (no runtime) are
            // still stored; only delivery is skipped.
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(fan_out);
            } else {
                tracing::debug!(alert_id = %id, "No async runtime; alert fan-out skipped");
            }
        }

        id
    }

    /// Acknowledge an active alert.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::NotFound`] for unknown ids and
    /// [`AlertError::InvalidTransition`] when the alert is not active.
    pub fn acknowledge(&self, id: Uuid) -> Result<(), AlertError> {
        self.transition(id, AlertStatus::Acknowledged)
    }

    /// Resolve an active or acknowledged alert.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::NotFound`] for unknown ids and
    /// [`AlertError::InvalidTransition`] when the alert is already resolved.
    pub fn resolve(&self, id: Uuid) -> Result<(), AlertError> {
        self.transition(id, AlertStatus::Resolved)
    }

    /// Snapshot of alerts still in the active state.
    #[must_use]
    pub fn active_alerts(&self) -> Vec<RiskAlert> {
        self.alerts_read()
            .values()
            .filter(|a| a.status == AlertStatus::Active)
            .cloned()
            .collect()
    }

    /// Get one alert by id.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<RiskAlert> {
        self.alerts_read().get(&id).cloned()
    }

    /// Total stored alerts.
    #[must_use]
    pub fn alert_count(&self) -> usize {
        self.alerts_read().len()
    }

    fn transition(&self, id: Uuid, to: AlertStatus) -> Result<(), AlertError> {
        let mut alerts = self.alerts_write();
        let alert = alerts.get_mut(&id).ok_or(AlertError::NotFound(id))?;

        let allowed = matches!(
            (alert.status, to),
            (AlertStatus::Active, AlertStatus::Acknowledged)
                | (AlertStatus::Active | AlertStatus::Acknowledged, AlertStatus::Resolved)
        );
        if !allowed {
            return Err(AlertError::InvalidTransition {
                id,
                from: alert.status,
                to,
            });
        }
        alert.status = to;
        Ok(())
    }

    fn channels_read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<dyn AlertChannel>>> {
        self.channels
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn channels_write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<dyn AlertChannel>>> {
        self.channels
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn alerts_read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Uuid, RiskAlert>> {
        self.alerts
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn alerts_write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, RiskAlert>> {
        self.alerts
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertSeverity, AlertType};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn alert() -> RiskAlert {
        RiskAlert::new(
            AlertType::DailyLossBreach,
            AlertSeverity::High,
            dec!(6000),
            dec!(5000),
            "daily loss 6000 exceeds limit 5000",
        )
        .for_bot("bot-a")
    }

    #[tokio::test]
    async fn raise_fans_out_to_channels() {
        let manager = AlertManager::new();
        let channel = Arc::new(RecordingChannel::new());
        manager.register_channel(channel.clone());

        manager.raise(alert());

        // Fan-out is spawned; give it a moment.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(channel.delivered().len(), 1);
        assert_eq!(manager.active_alerts().len(), 1);
    }

    #[tokio::test]
    async fn channel_failure_does_not_block_alert_creation() {
        let manager = AlertManager::new();
        let failing = Arc::new(RecordingChannel::new());
        failing.fail_sends(true);
        let healthy = Arc::new(RecordingChannel::new());
        manager.register_channel(failing.clone());
        manager.register_channel(healthy.clone());

        let id = manager.raise(alert());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(manager.get(id).is_some());
        assert_eq!(healthy.delivered().len(), 1);
        assert!(failing.delivered().is_empty());
    }

    #[tokio::test]
    async fn lifecycle_moves_forward_only() {
        let manager = AlertManager::new();
        let id = manager.raise(alert());

        manager.acknowledge(id).unwrap();
        assert_eq!(manager.get(id).unwrap().status, AlertStatus::Acknowledged);
        assert!(manager.active_alerts().is_empty());

        manager.resolve(id).unwrap();
        assert_eq!(manager.get(id).unwrap().status, AlertStatus::Resolved);

        // Resolved alerts cannot be acknowledged.
        let err = manager.acknowledge(id).unwrap_err();
        assert!(matches!(err, AlertError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn unknown_alert_is_not_found() {
        let manager = AlertManager::new();
        let err = manager.acknowledge(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AlertError::NotFound(_)));
    }

    #[tokio::test]
    async fn active_resolves_directly() {
        let manager = AlertManager::new();
        let id = manager.raise(alert());
        manager.resolve(id).unwrap();
        assert_eq!(manager.get(id).unwrap().status, AlertStatus::Resolved);
    }
}
