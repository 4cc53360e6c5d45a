//! Per-rule cooldown tracking.
//!
//! A rule may fire at most once per cooldown window. The window is measured
//! from the previous fire, not from rule creation or event time, and is not
//! aligned to any wall-clock boundary.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::CooldownError;

/// Outcome of [`CooldownStore::try_fire`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum FireDecision {
    /// Permission granted; `last_fired_at` is now the caller's `now`.
    Granted { previous: Option<DateTime<Utc>> },
    /// Still inside the window; state unchanged.
    Suppressed {
        last_fired_at: DateTime<Utc>,
        next_allowed_at: DateTime<Utc>,
    },
}

impl FireDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

/// Per-rule suppression state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownState {
    pub rule_id: String,
    pub last_fired_at: Option<DateTime<Utc>>,
}

/// Store of `last_fired_at` per rule.
#[async_trait]
pub trait CooldownStore: Send + Sync {
    /// Atomically grant a fire if the rule never fired or
    /// `now - last_fired_at >= cooldown`, recording `now` as the new
    /// `last_fired_at`. Concurrent callers for one rule see exactly one grant
    /// per window.
    async fn try_fire(
        &self,
        rule_id: &str,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<FireDecision, CooldownError>;

    async fn last_fired_at(&self, rule_id: &str) -> Result<Option<DateTime<Utc>>, CooldownError>;

    async fn state(&self, rule_id: &str) -> Result<CooldownState, CooldownError> {
        Ok(CooldownState {
            rule_id: rule_id.to_string(),
            last_fired_at: self.last_fired_at(rule_id).await?,
        })
    }

    /// Forget a rule's state (the rule was deleted).
    async fn remove(&self, rule_id: &str) -> Result<(), CooldownError>;
}

/// In-process cooldown store.
#[derive(Default)]
pub struct InMemoryCooldownStore {
    last_fired: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryCooldownStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a rule fired at a specific timestamp.
    ///
    /// Useful for testing and deterministic replay.
    pub fn record_fire_at(&self, rule_id: &str, at: DateTime<Utc>) {
        self.last_fired
            .lock()
            .expect("cooldown lock poisoned")
            .insert(rule_id.to_string(), at);
    }
}

#[async_trait]
impl CooldownStore for InMemoryCooldownStore {
    async fn try_fire(
        &self,
        rule_id: &str,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<FireDecision, CooldownError> {
        let mut guard = self.last_fired.lock().expect("cooldown lock poisoned");

        if let Some(&last) = guard.get(rule_id) {
            let elapsed = now.signed_duration_since(last);
            if elapsed < cooldown {
                let next_allowed_at = last + cooldown;
                debug!(
                    rule_id = %rule_id,
                    "rule still in cooldown ({}s remaining)",
                    (next_allowed_at - now).num_seconds(),
                );
                return Ok(FireDecision::Suppressed {
                    last_fired_at: last,
                    next_allowed_at,
                });
            }
        }

        let previous = guard.insert(rule_id.to_string(), now);
        Ok(FireDecision::Granted { previous })
    }

    async fn last_fired_at(&self, rule_id: &str) -> Result<Option<DateTime<Utc>>, CooldownError> {
        Ok(self
            .last_fired
            .lock()
            .expect("cooldown lock poisoned")
            .get(rule_id)
            .copied())
    }

    async fn remove(&self, rule_id: &str) -> Result<(), CooldownError> {
        self.last_fired
            .lock()
            .expect("cooldown lock poisoned")
            .remove(rule_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn first_fire_is_granted() {
        let store = InMemoryCooldownStore::new();
        let decision = store.try_fire("r", t0(), Duration::hours(6)).await.unwrap();
        assert_eq!(decision, FireDecision::Granted { previous: None });
        assert_eq!(store.last_fired_at("r").await.unwrap(), Some(t0()));
    }

    #[tokio::test]
    async fn window_is_measured_from_last_fire() {
        let store = InMemoryCooldownStore::new();
        let cd = Duration::hours(6);
        store.try_fire("r", t0(), cd).await.unwrap();

        let suppressed = store.try_fire("r", t0() + Duration::hours(1), cd).await.unwrap();
        assert_eq!(
            suppressed,
            FireDecision::Suppressed {
                last_fired_at: t0(),
                next_allowed_at: t0() + cd,
            }
        );
        // Suppression does not move the window.
        assert_eq!(store.last_fired_at("r").await.unwrap(), Some(t0()));

        let granted = store.try_fire("r", t0() + cd, cd).await.unwrap();
        assert_eq!(granted, FireDecision::Granted { previous: Some(t0()) });
        assert_eq!(store.last_fired_at("r").await.unwrap(), Some(t0() + cd));
    }

    #[tokio::test]
    async fn rules_are_independent() {
        let store = InMemoryCooldownStore::new();
        let cd = Duration::hours(12);
        assert!(store.try_fire("a", t0(), cd).await.unwrap().is_granted());
        assert!(store.try_fire("b", t0(), cd).await.unwrap().is_granted());
        assert!(!store.try_fire("a", t0(), cd).await.unwrap().is_granted());
    }

    #[tokio::test]
    async fn replay_and_remove() {
        let store = InMemoryCooldownStore::new();
        store.record_fire_at("r", t0());
        let state = store.state("r").await.unwrap();
        assert_eq!(state.last_fired_at, Some(t0()));

        store.remove("r").await.unwrap();
        assert!(store.state("r").await.unwrap().last_fired_at.is_none());
        assert!(store
            .try_fire("r", t0(), Duration::hours(1))
            .await
            .unwrap()
            .is_granted());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_fires_have_one_winner() {
        let store = Arc::new(InMemoryCooldownStore::new());
        let mut handles = Vec::new();
        for _ in 0..64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .try_fire("r", t0(), Duration::hours(6))
                    .await
                    .unwrap()
                    .is_granted()
            }));
        }

        let mut granted = 0;
        for h in handles {
            if h.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 1);
    }
}
