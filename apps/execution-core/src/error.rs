//! Rich error handling for the execution core.
//!
//! Every rejection carries a stable error code and enough context (which
//! limit, observed value, allowed value) to reproduce the decision without
//! re-deriving engine state.
//!
//! # Error taxonomy
//!
//! | Kind | Behavior |
//! |------|----------|
//! | `Validation` | Rejected synchronously before enqueue; never auto-retried |
//! | `Capacity` | Queue-full backpressure; caller decides whether to retry |
//! | `Routing` | Affected slice marked failed; siblings unaffected |
//! | `Venue` | Recorded as a failed child execution; order continues |
//! | `Systemic` | All submissions for the scope blocked until operator resume |
//! | `Internal` | Unexpected engine error |

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad error category, mirroring the propagation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Malformed order or risk-limit breach; rejected before enqueue.
    Validation,
    /// Backpressure from the bounded queue.
    Capacity,
    /// No eligible venue or rule-forced rejection.
    Routing,
    /// Venue timeout, rejection, or transport failure.
    Venue,
    /// Emergency stop or bot halt.
    Systemic,
    /// Unexpected engine error.
    Internal,
}

/// Error codes for the execution core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    /// Invalid order shape (quantity, symbol, missing limit price).
    MalformedOrder,
    /// No risk profile registered for the bot.
    UnknownBot,
    /// Bot position size limit exceeded.
    PositionLimitExceeded,
    /// Bot daily loss limit exceeded.
    DailyLossExceeded,
    /// Bot consecutive loss limit reached.
    ConsecutiveLossLimit,
    /// Bot drawdown limit exceeded.
    DrawdownExceeded,
    /// Portfolio exposure limit exceeded.
    PortfolioExposureExceeded,
    /// Portfolio VaR limit exceeded.
    VarLimitExceeded,
    /// Portfolio concentration limit exceeded.
    ConcentrationExceeded,
    /// Correlation limit between symbols exceeded.
    CorrelationExceeded,

    // Capacity errors
    /// The bounded execution queue is full.
    QueueFull,

    // Routing errors
    /// No active venue supports the order.
    NoVenueAvailable,
    /// A routing rule rejected the order.
    RuleRejected,

    // Venue errors
    /// Venue call exceeded its latency budget.
    VenueTimeout,
    /// Venue rejected the child order.
    VenueRejected,

    // Systemic errors
    /// The bot is halted.
    BotHalted,
    /// The system-wide emergency stop is active.
    EmergencyStopActive,

    // Internal errors
    /// Unexpected engine error.
    InternalError,
}

impl ErrorCode {
    /// Get the broad category for this code.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedOrder
            | Self::UnknownBot
            | Self::PositionLimitExceeded
            | Self::DailyLossExceeded
            | Self::ConsecutiveLossLimit
            | Self::DrawdownExceeded
            | Self::PortfolioExposureExceeded
            | Self::VarLimitExceeded
            | Self::ConcentrationExceeded
            | Self::CorrelationExceeded => ErrorKind::Validation,

            Self::QueueFull => ErrorKind::Capacity,

            Self::NoVenueAvailable | Self::RuleRejected => ErrorKind::Routing,

            Self::VenueTimeout | Self::VenueRejected => ErrorKind::Venue,

            Self::BotHalted | Self::EmergencyStopActive => ErrorKind::Systemic,

            Self::InternalError => ErrorKind::Internal,
        }
    }

    /// Get the stable reason string for this code.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::MalformedOrder => "MALFORMED_ORDER",
            Self::UnknownBot => "UNKNOWN_BOT",
            Self::PositionLimitExceeded => "POSITION_LIMIT_EXCEEDED",
            Self::DailyLossExceeded => "DAILY_LOSS_EXCEEDED",
            Self::ConsecutiveLossLimit => "CONSECUTIVE_LOSS_LIMIT",
            Self::DrawdownExceeded => "DRAWDOWN_EXCEEDED",
            Self::PortfolioExposureExceeded => "PORTFOLIO_EXPOSURE_EXCEEDED",
            Self::VarLimitExceeded => "VAR_LIMIT_EXCEEDED",
            Self::ConcentrationExceeded => "CONCENTRATION_EXCEEDED",
            Self::CorrelationExceeded => "CORRELATION_EXCEEDED",
            Self::QueueFull => "QUEUE_FULL",
            Self::NoVenueAvailable => "NO_VENUE_AVAILABLE",
            Self::RuleRejected => "RULE_REJECTED",
            Self::VenueTimeout => "VENUE_TIMEOUT",
            Self::VenueRejected => "VENUE_REJECTED",
            Self::BotHalted => "BOT_HALTED",
            Self::EmergencyStopActive => "EMERGENCY_STOP_ACTIVE",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// A rich error with context for the execution core.
#[derive(Debug, Error)]
pub struct EngineError {
    /// Error code.
    code: ErrorCode,
    /// Human-readable message.
    message: String,
    /// Additional context (key-value pairs).
    context: Vec<(String, String)>,
}

impl EngineError {
    /// Create a new engine error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    /// Add context to the error.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the broad category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    /// Get the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the context.
    #[must_use]
    pub fn context(&self) -> &[(String, String)] {
        &self.context
    }

    /// Convert to a serializable rejection body for external callers.
    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code.reason().to_string(),
            kind: self.code.kind(),
            message: self.message.clone(),
            details: self.context.iter().cloned().collect(),
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.reason(), self.message)
    }
}

/// Serializable rejection body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code string.
    pub code: String,
    /// Broad category.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Additional details.
    pub details: HashMap<String, String>,
}

/// Convenience constructors for common errors.
impl EngineError {
    /// Malformed order shape.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedOrder, message)
    }

    /// No risk profile registered for the bot.
    #[must_use]
    pub fn unknown_bot(bot_id: &str) -> Self {
        Self::new(
            ErrorCode::UnknownBot,
            format!("no risk profile registered for bot {bot_id}; unknown risk is unsafe"),
        )
        .with_context("bot_id", bot_id)
    }

    /// Bounded queue overflow.
    #[must_use]
    pub fn queue_full(capacity: usize) -> Self {
        Self::new(
            ErrorCode::QueueFull,
            format!("execution queue at capacity {capacity}; resubmit after backpressure clears"),
        )
        .with_context("capacity", capacity.to_string())
    }

    /// A risk limit breach with observed and allowed values.
    #[must_use]
    pub fn limit_breach(
        code: ErrorCode,
        limit_name: &str,
        observed: impl std::fmt::Display,
        allowed: impl std::fmt::Display,
    ) -> Self {
        Self::new(
            code,
            format!("{limit_name}: observed {observed} exceeds allowed {allowed}"),
        )
        .with_context("limit", limit_name)
        .with_context("observed", observed.to_string())
        .with_context("allowed", allowed.to_string())
    }

    /// The bot is halted.
    #[must_use]
    pub fn bot_halted(bot_id: &str) -> Self {
        Self::new(
            ErrorCode::BotHalted,
            format!("bot {bot_id} is halted; resume it before submitting orders"),
        )
        .with_context("bot_id", bot_id)
    }

    /// The emergency stop is active.
    #[must_use]
    pub fn emergency_stop() -> Self {
        Self::new(
            ErrorCode::EmergencyStopActive,
            "emergency stop is active; all submissions are rejected",
        )
    }

    /// Unexpected internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}
