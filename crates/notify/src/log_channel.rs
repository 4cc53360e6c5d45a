//! Channel that writes notifications to the tracing log.
//!
//! Used by the worker binary and as a stand-in for channels whose transport
//! lives outside this workspace, such as web push.

use serde_json::json;

use crate::traits::{Channel, NotificationPayload, NotifyError};

/// Logs each payload at `info` and reports it as sent.
#[derive(Debug, Clone)]
pub struct LogChannel {
    name: String,
}

impl LogChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new("log")
    }
}

#[async_trait::async_trait]
impl Channel for LogChannel {
    async fn deliver(&self, payload: &NotificationPayload) -> Result<serde_json::Value, NotifyError> {
        tracing::info!(
            channel = %self.name,
            notification_id = %payload.notification_id,
            rule_id = %payload.rule_id,
            event_id = %payload.event_id,
            subject = %payload.subject,
            body = %payload.body,
            "notification"
        );
        Ok(json!({ "logged": true, "bytes": payload.body.len() }))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
