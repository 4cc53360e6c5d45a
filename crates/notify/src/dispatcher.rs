//! Routes rule matches to notification channels.
//!
//! One match with N channels produces N independent [`Notification`]
//! records. Deliveries run concurrently and a failing, slow or panicking
//! channel never blocks or rolls back the others.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use boardwatch_core::Event;
use boardwatch_rules::Rule;
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use futures::FutureExt;
use serde_json::json;
use uuid::Uuid;

use crate::record::{Notification, NotificationStatus};
use crate::store::{NotificationQuery, NotificationStore, CLAIM_STALE_AFTER_SECS};
use crate::templating::{TemplateContext, TemplateRenderer};
use crate::traits::{Channel, NotificationPayload, NotifyError, DEFAULT_RETRY_AFTER_SECS};

/// Delivers notifications through registered channels and records every
/// attempt in a [`NotificationStore`].
pub struct Dispatcher {
    /// Channel name → implementation.
    channels: HashMap<String, Arc<dyn Channel>>,
    store: Arc<dyn NotificationStore>,
    renderer: TemplateRenderer,
}

impl Dispatcher {
    /// Create a dispatcher with no channels registered.
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self {
            channels: HashMap::new(),
            store,
            renderer: TemplateRenderer::new(),
        }
    }

    /// Register a channel under its [`Channel::name`], replacing any
    /// previous channel with that name.
    pub fn register(&mut self, channel: Arc<dyn Channel>) {
        self.channels.insert(channel.name().to_string(), channel);
    }

    pub fn with_channel(mut self, channel: Arc<dyn Channel>) -> Self {
        self.register(channel);
        self
    }

    /// Names of all registered channels, sorted.
    pub fn channel_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.channels.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn store(&self) -> &Arc<dyn NotificationStore> {
        &self.store
    }

    /// Create a `pending` record for `channel`, attempt delivery and store
    /// the outcome.
    ///
    /// Delivery problems are recorded on the returned notification
    /// (`error` or `deferred`); `Err` is returned only when the record
    /// itself could not be stored.
    pub async fn dispatch(
        &self,
        rule: &Rule,
        event: &Event,
        channel: &str,
    ) -> Result<Notification, NotifyError> {
        let mut record = Notification::pending(&rule.id, &event.id, channel, Utc::now());
        self.store.insert(record.clone()).await?;

        self.attempt_isolated(&mut record, rule, event).await;
        self.store.update(record.clone()).await?;
        Ok(record)
    }

    /// Dispatch to every channel configured on `rule`, concurrently.
    ///
    /// Results are in the rule's channel order, duplicates removed.
    pub async fn dispatch_all(
        &self,
        rule: &Rule,
        event: &Event,
    ) -> Vec<Result<Notification, NotifyError>> {
        let channels = rule.unique_channels();
        if channels.is_empty() {
            tracing::debug!(rule_id = %rule.id, "No notification channels configured");
            return Vec::new();
        }

        join_all(
            channels
                .into_iter()
                .map(|channel| self.dispatch(rule, event, channel)),
        )
        .await
    }

    /// Re-attempt delivery of an existing notification, updating it in place.
    ///
    /// The record is claimed first, so concurrent retries of one
    /// notification deliver it at most once; the losers get the record back
    /// as it currently stands. A notification that was already sent is
    /// returned unchanged.
    pub async fn retry(
        &self,
        notification_id: Uuid,
        rule: &Rule,
        event: &Event,
    ) -> Result<Notification, NotifyError> {
        let current = self
            .store
            .get(notification_id)
            .await?
            .ok_or(NotifyError::NotFound(notification_id))?;

        if current.status == NotificationStatus::Sent {
            tracing::debug!(%notification_id, "Notification already sent, not retrying");
            return Ok(current);
        }
        if current.rule_id != rule.id || current.event_id != event.id {
            return Err(NotifyError::Config(format!(
                "notification {notification_id} belongs to rule '{}' and event '{}'",
                current.rule_id, current.event_id
            )));
        }

        let stale_after = Duration::seconds(CLAIM_STALE_AFTER_SECS);
        let Some(mut record) = self
            .store
            .claim(notification_id, Utc::now(), stale_after)
            .await?
        else {
            tracing::debug!(%notification_id, "Notification claimed elsewhere, not retrying");
            return self
                .store
                .get(notification_id)
                .await?
                .ok_or(NotifyError::NotFound(notification_id));
        };

        self.attempt_isolated(&mut record, rule, event).await;
        self.store.update(record.clone()).await?;
        Ok(record)
    }

    /// Deferred notifications whose retry-after instant has passed, oldest first.
    pub async fn due_for_retry(&self, now: DateTime<Utc>) -> Result<Vec<Notification>, NotifyError> {
        let query = NotificationQuery::default().with_status(NotificationStatus::Deferred);
        let mut due: Vec<Notification> = self
            .store
            .query(&query)
            .await?
            .into_iter()
            .filter(|n| n.is_due(now))
            .collect();
        due.reverse();
        Ok(due)
    }

    /// Send a test notification through a registered channel.
    pub async fn test_channel(&self, name: &str) -> Result<serde_json::Value, NotifyError> {
        let channel = self
            .channels
            .get(name)
            .ok_or_else(|| NotifyError::UnknownChannel(name.to_string()))?;
        channel.test().await
    }

    /// [`attempt`](Self::attempt) with a panic in the channel recorded as an
    /// `error` outcome instead of unwinding through the fan-out.
    async fn attempt_isolated(&self, record: &mut Notification, rule: &Rule, event: &Event) {
        let outcome = AssertUnwindSafe(self.attempt(record, rule, event))
            .catch_unwind()
            .await;
        if let Err(panic) = outcome {
            let reason = panic_message(panic.as_ref());
            tracing::error!(
                rule_id = %rule.id,
                event_id = %event.id,
                channel = %record.channel,
                panic = %reason,
                "Channel panicked during delivery"
            );
            record.mark_error(
                json!({ "error": format!("channel panicked: {reason}") }),
                Utc::now(),
            );
        }
    }

    /// One delivery attempt; the outcome is written onto `record`.
    async fn attempt(&self, record: &mut Notification, rule: &Rule, event: &Event) {
        record.attempts += 1;

        let Some(channel) = self.channels.get(&record.channel) else {
            let e = NotifyError::UnknownChannel(record.channel.clone());
            tracing::warn!(
                rule_id = %rule.id,
                event_id = %event.id,
                channel = %record.channel,
                error = %e,
                "Notification delivery failed"
            );
            record.mark_error(json!({ "error": e.to_string() }), Utc::now());
            return;
        };

        let ctx = TemplateContext::new(rule, event, &record.channel, Utc::now());
        let (subject, body) = self.renderer.render_message(rule, &ctx);
        let payload = NotificationPayload {
            notification_id: record.id,
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            event_id: event.id.clone(),
            channel: record.channel.clone(),
            subject,
            body,
            url: event.url.clone(),
        };

        let start = Instant::now();
        let result = channel.deliver(&payload).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        let now = Utc::now();

        match result {
            Ok(response) => {
                tracing::info!(
                    rule_id = %rule.id,
                    event_id = %event.id,
                    channel = %record.channel,
                    attempt = record.attempts,
                    duration_ms,
                    "Notification delivered"
                );
                record.mark_sent(json!({ "response": response, "durationMs": duration_ms }), now);
            }
            Err(e) if e.is_transient() => {
                let retry_after_secs = e.retry_after_secs().unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                tracing::warn!(
                    rule_id = %rule.id,
                    event_id = %event.id,
                    channel = %record.channel,
                    error = %e,
                    retry_after_secs,
                    duration_ms,
                    "Notification deferred"
                );
                record.mark_deferred(
                    retry_after_secs,
                    json!({ "error": e.to_string(), "durationMs": duration_ms }),
                    now,
                );
            }
            Err(e) => {
                tracing::warn!(
                    rule_id = %rule.id,
                    event_id = %event.id,
                    channel = %record.channel,
                    error = %e,
                    duration_ms,
                    "Notification delivery failed"
                );
                record.mark_error(json!({ "error": e.to_string(), "durationMs": duration_ms }), now);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
