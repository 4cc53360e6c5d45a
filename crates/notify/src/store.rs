//! Notification history storage.
//!
//! The dashboard reads this for history/audit; the dispatcher is the only
//! writer.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use uuid::Uuid;

use crate::record::{Notification, NotificationStatus};
use crate::traits::NotifyError;

/// A `pending` record untouched for this long is assumed abandoned by the
/// worker that held it and may be claimed again.
pub const CLAIM_STALE_AFTER_SECS: i64 = 300;

/// Filter for [`NotificationStore::query`]. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct NotificationQuery {
    pub rule_id: Option<String>,
    pub status: Option<NotificationStatus>,
    pub limit: Option<usize>,
}

impl NotificationQuery {
    pub fn for_rule(rule_id: impl Into<String>) -> Self {
        Self {
            rule_id: Some(rule_id.into()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: NotificationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, n: &Notification) -> bool {
        self.rule_id.as_deref().map_or(true, |id| n.rule_id == id)
            && self.status.map_or(true, |s| n.status == s)
    }
}

/// Persistence for [`Notification`] records.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<(), NotifyError>;

    /// Replace an existing record. Fails with [`NotifyError::NotFound`] if
    /// the id was never inserted.
    async fn update(&self, notification: Notification) -> Result<(), NotifyError>;

    async fn get(&self, id: Uuid) -> Result<Option<Notification>, NotifyError>;

    /// Atomically take a record for redelivery. `deferred` and `error`
    /// records, and `pending` ones idle for longer than `stale_after`, are
    /// moved to `pending` and returned. `Ok(None)` means the record is
    /// already sent or another worker holds it.
    async fn claim(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Result<Option<Notification>, NotifyError>;

    /// Matching records, newest first.
    async fn query(&self, query: &NotificationQuery) -> Result<Vec<Notification>, NotifyError>;
}

/// In-process notification store.
#[derive(Default)]
pub struct InMemoryNotificationStore {
    records: RwLock<IndexMap<Uuid, Notification>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("notification store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn insert(&self, notification: Notification) -> Result<(), NotifyError> {
        self.records
            .write()
            .expect("notification store lock poisoned")
            .insert(notification.id, notification);
        Ok(())
    }

    async fn update(&self, notification: Notification) -> Result<(), NotifyError> {
        let mut records = self.records.write().expect("notification store lock poisoned");
        match records.get_mut(&notification.id) {
            Some(existing) => {
                *existing = notification;
                Ok(())
            }
            None => Err(NotifyError::NotFound(notification.id)),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Notification>, NotifyError> {
        Ok(self
            .records
            .read()
            .expect("notification store lock poisoned")
            .get(&id)
            .cloned())
    }

    async fn claim(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Result<Option<Notification>, NotifyError> {
        let mut records = self.records.write().expect("notification store lock poisoned");
        let record = records.get_mut(&id).ok_or(NotifyError::NotFound(id))?;
        let claimable = match record.status {
            NotificationStatus::Deferred | NotificationStatus::Error => true,
            NotificationStatus::Pending => record.updated_at + stale_after <= now,
            NotificationStatus::Sent => false,
        };
        if !claimable {
            return Ok(None);
        }
        record.mark_claimed(now);
        Ok(Some(record.clone()))
    }

    async fn query(&self, query: &NotificationQuery) -> Result<Vec<Notification>, NotifyError> {
        let records = self.records.read().expect("notification store lock poisoned");
        let mut matched: Vec<Notification> = records
            .values()
            .rev()
            .filter(|n| query.matches(n))
            .cloned()
            .collect();
        // Stable: equal timestamps keep the latest insert first.
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}
