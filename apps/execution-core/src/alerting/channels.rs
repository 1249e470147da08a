//! Alert channel implementations.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::{AlertSeverity, RiskAlert};

use super::{AlertChannel, ChannelError};

/// Channel that emits alerts to the structured log.
#[derive(Debug, Default)]
pub struct LogChannel;

impl LogChannel {
    /// Create a log channel.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertChannel for LogChannel {
    async fn send(&self, alert: &RiskAlert) -> Result<(), ChannelError> {
        match alert.severity {
            AlertSeverity::Low | AlertSeverity::Medium => tracing::info!(
                alert_id = %alert.id,
                alert_type = alert.alert_type.as_str(),
                severity = alert.severity.as_str(),
                bot_id = alert.bot_id.as_deref().unwrap_or("-"),
                measured = %alert.measured,
                threshold = %alert.threshold,
                "{}",
                alert.message
            ),
            AlertSeverity::High | AlertSeverity::Critical => tracing::warn!(
                alert_id = %alert.id,
                alert_type = alert.alert_type.as_str(),
                severity = alert.severity.as_str(),
                bot_id = alert.bot_id.as_deref().unwrap_or("-"),
                measured = %alert.measured,
                threshold = %alert.threshold,
                "{}",
                alert.message
            ),
        }
        Ok(())
    }

    fn channel_type(&self) -> &str {
        "log"
    }

    fn enabled(&self) -> bool {
        true
    }
}

/// Channel that POSTs alert payloads to a webhook endpoint.
#[derive(Debug)]
pub struct WebhookChannel {
    url: String,
    client: reqwest::Client,
}

impl WebhookChannel {
    /// Create a webhook channel targeting `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AlertChannel for WebhookChannel {
    async fn send(&self, alert: &RiskAlert) -> Result<(), ChannelError> {
        let response = self
            .client
            .post(&self.url)
            .json(alert)
            .send()
            .await
            .map_err(|e| ChannelError::Delivery(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::Delivery(format!(
                "webhook returned status {}",
                response.status()
            )))
        }
    }

    fn channel_type(&self) -> &str {
        "webhook"
    }

    fn enabled(&self) -> bool {
        !self.url.is_empty()
    }
}

/// In-memory channel used by tests to observe delivered alerts.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    delivered: Mutex<Vec<RiskAlert>>,
    fail: std::sync::atomic::AtomicBool,
}

impl RecordingChannel {
    /// Create a recording channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make future sends fail (channel failure injection).
    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Alerts delivered so far.
    #[must_use]
    pub fn delivered(&self) -> Vec<RiskAlert> {
        self.delivered
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AlertChannel for RecordingChannel {
    async fn send(&self, alert: &RiskAlert) -> Result<(), ChannelError> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(ChannelError::Delivery("injected failure".to_string()));
        }
        self.delivered
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(alert.clone());
        Ok(())
    }

    fn channel_type(&self) -> &str {
        "recording"
    }

    fn enabled(&self) -> bool {
        true
    }
}
