//! Error taxonomy for push delivery.
//!
//! Every failure reaches the caller through [`WebPushError`]. Validation and
//! crypto failures are detected locally before any network call; transport
//! errors are passed through from `reqwest` untouched; push-service failures
//! carry the HTTP status and the subscription that was attempted so the
//! caller can decide whether to prune it or back off.

use thiserror::Error;

use crate::subscription::PushSubscription;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, WebPushError>;

/// Errors surfaced by this crate.
#[derive(Debug, Error)]
pub enum WebPushError {
    /// Malformed input detected before any network activity.
    #[error("Validation failed: {0}")]
    Validation(String),
    /// Key agreement, key derivation or encryption failed, or the payload
    /// does not fit in a single record.
    #[error("Crypto failure: {0}")]
    Crypto(String),
    /// The HTTP layer failed (connectivity, TLS, timeout).
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    /// The push service answered with a non-success status.
    #[error(transparent)]
    Push(#[from] PushError),
}

impl WebPushError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto(message.into())
    }
}

/// A classified failure response from a push service.
///
/// `Display` renders exactly the classified message (e.g. `"Bad Request"`).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PushError {
    /// HTTP status returned by the push service.
    pub status: u16,
    /// Classified human-readable message.
    pub message: String,
    /// The subscription the message was addressed to.
    pub subscription: PushSubscription,
}

impl PushError {
    /// The push service no longer recognises the subscription (404/410).
    ///
    /// Callers should discard the subscription.
    pub fn is_subscription_gone(&self) -> bool {
        matches!(self.status, 404 | 410)
    }

    /// The sender is being rate limited (429).
    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }

    /// The push service failed on its side (5xx); a later retry may succeed.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}
