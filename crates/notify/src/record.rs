//! Persisted notification records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery state of a [`Notification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Created, delivery not yet attempted or in flight.
    Pending,
    Sent,
    Error,
    /// Channel asked to retry later; see `retry_after`.
    Deferred,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Error => "error",
            Self::Deferred => "deferred",
        }
    }

    /// `sent` and `error` are final; `pending` and `deferred` may change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Error)
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dispatch of one rule match to one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub rule_id: String,
    pub event_id: String,
    pub channel: String,
    pub status: NotificationStatus,
    pub sent_at: Option<DateTime<Utc>>,
    /// Diagnostic payload: channel response, error text, timing.
    #[serde(default)]
    pub meta: serde_json::Value,
    /// Delivery attempts so far, including retries.
    pub attempts: u32,
    pub retry_after: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    /// A fresh `pending` record.
    pub fn pending(
        rule_id: impl Into<String>,
        event_id: impl Into<String>,
        channel: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            rule_id: rule_id.into(),
            event_id: event_id.into(),
            channel: channel.into(),
            status: NotificationStatus::Pending,
            sent_at: None,
            meta: serde_json::Value::Null,
            attempts: 0,
            retry_after: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_sent(&mut self, meta: serde_json::Value, now: DateTime<Utc>) {
        self.status = NotificationStatus::Sent;
        self.sent_at = Some(now);
        self.retry_after = None;
        self.meta = meta;
        self.updated_at = now;
    }

    pub fn mark_deferred(&mut self, retry_after_secs: u64, meta: serde_json::Value, now: DateTime<Utc>) {
        self.status = NotificationStatus::Deferred;
        self.retry_after = Some(now + chrono::Duration::seconds(retry_after_secs as i64));
        self.meta = meta;
        self.updated_at = now;
    }

    pub fn mark_error(&mut self, meta: serde_json::Value, now: DateTime<Utc>) {
        self.status = NotificationStatus::Error;
        self.retry_after = None;
        self.meta = meta;
        self.updated_at = now;
    }

    /// Back to `pending` for a redelivery attempt.
    pub fn mark_claimed(&mut self, now: DateTime<Utc>) {
        self.status = NotificationStatus::Pending;
        self.retry_after = None;
        self.updated_at = now;
    }

    /// Deferred and past its retry-after instant.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == NotificationStatus::Deferred
            && self.retry_after.map_or(true, |at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&NotificationStatus::Deferred).unwrap();
        assert_eq!(json, "\"deferred\"");
        let parsed: NotificationStatus = serde_json::from_str("\"sent\"").unwrap();
        assert_eq!(parsed, NotificationStatus::Sent);
    }

    #[test]
    fn deferred_becomes_due_after_hint() {
        let mut n = Notification::pending("r", "e", "telegram", t0());
        n.mark_deferred(120, serde_json::json!({"error": "rate limited"}), t0());

        assert_eq!(n.retry_after, Some(t0() + Duration::seconds(120)));
        assert!(!n.is_due(t0() + Duration::seconds(119)));
        assert!(n.is_due(t0() + Duration::seconds(120)));
        assert!(!n.status.is_terminal());
    }

    #[test]
    fn sent_clears_retry_hint() {
        let mut n = Notification::pending("r", "e", "telegram", t0());
        n.mark_deferred(60, serde_json::Value::Null, t0());
        n.mark_sent(serde_json::Value::Null, t0() + Duration::minutes(2));

        assert_eq!(n.status, NotificationStatus::Sent);
        assert_eq!(n.sent_at, Some(t0() + Duration::minutes(2)));
        assert!(n.retry_after.is_none());
        assert!(!n.is_due(t0() + Duration::hours(1)));
    }

    #[test]
    fn record_uses_camel_case() {
        let n = Notification::pending("r", "e", "webpush", t0());
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["ruleId"], "r");
        assert_eq!(json["status"], "pending");
        assert!(json["sentAt"].is_null());
    }
}
