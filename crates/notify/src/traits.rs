//! Channel trait definition and shared error types.

use uuid::Uuid;

/// Retry hint used when a channel times out without saying when to come back.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Errors that can occur during notification delivery and bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Transport failed: {0}")]
    Transport(String),

    #[error("Delivery timed out after {after_secs}s")]
    Timeout { after_secs: u64 },

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown channel '{0}'")]
    UnknownChannel(String),

    #[error("Notification {0} not found")]
    NotFound(Uuid),

    #[error("Notification store error: {0}")]
    Store(String),
}

impl NotifyError {
    /// Backpressure from the channel: the attempt should be retried later
    /// rather than recorded as a hard failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Timeout { .. })
    }

    /// Seconds until a transient failure may be retried.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            Self::Timeout { .. } => Some(DEFAULT_RETRY_AFTER_SECS),
            _ => None,
        }
    }
}

/// A rendered notification ready for delivery.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    /// Id of the [`Notification`](crate::record::Notification) this attempt belongs to.
    pub notification_id: Uuid,
    pub rule_id: String,
    pub rule_name: String,
    pub event_id: String,
    pub channel: String,
    /// The rendered subject/title.
    pub subject: String,
    /// The rendered body content.
    pub body: String,
    pub url: Option<String>,
}

/// Trait for notification channel implementations.
///
/// `Ok(meta)` means the payload was delivered; `meta` is stored on the
/// notification record for diagnostics. Transient errors
/// ([`NotifyError::is_transient`]) defer the notification, anything else
/// marks it as failed. Timeouts are the channel's own responsibility.
#[async_trait::async_trait]
pub trait Channel: Send + Sync {
    /// Deliver a notification through this channel.
    async fn deliver(&self, payload: &NotificationPayload) -> Result<serde_json::Value, NotifyError>;

    /// Test connectivity with a sample notification.
    async fn test(&self) -> Result<serde_json::Value, NotifyError> {
        let payload = NotificationPayload {
            notification_id: Uuid::nil(),
            rule_id: "test-rule".to_string(),
            rule_name: "Test rule".to_string(),
            event_id: "test-event".to_string(),
            channel: self.name().to_string(),
            subject: "[TEST] boardwatch".to_string(),
            body: "This is a test notification from boardwatch.".to_string(),
            url: None,
        };
        self.deliver(&payload).await
    }

    /// Identifier rules use to select this channel (e.g., "telegram", "webpush").
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(NotifyError::RateLimited { retry_after_secs: 30 }.is_transient());
        assert!(NotifyError::Timeout { after_secs: 10 }.is_transient());
        assert!(!NotifyError::Transport("refused".into()).is_transient());
        assert!(!NotifyError::UnknownChannel("sms".into()).is_transient());
    }

    #[test]
    fn retry_hints() {
        assert_eq!(
            NotifyError::RateLimited { retry_after_secs: 30 }.retry_after_secs(),
            Some(30)
        );
        assert_eq!(
            NotifyError::Timeout { after_secs: 5 }.retry_after_secs(),
            Some(DEFAULT_RETRY_AFTER_SECS)
        );
        assert_eq!(NotifyError::Config("x".into()).retry_after_secs(), None);
    }
}
