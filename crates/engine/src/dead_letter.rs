//! Events whose dedup check could not be completed.
//!
//! They were never marked as seen, so replaying them through `ingest` is
//! safe once the dedup store is back.

use std::collections::VecDeque;
use std::sync::Mutex;

use boardwatch_core::Event;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

pub const DEFAULT_MAX_DEAD_LETTERS: usize = 1000;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub event: Event,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

/// Bounded FIFO. When full, the oldest entry is dropped.
pub struct DeadLetterQueue {
    items: Mutex<VecDeque<DeadLetter>>,
    max_entries: usize,
}

impl Default for DeadLetterQueue {
    fn default() -> Self {
        Self::with_max_entries(DEFAULT_MAX_DEAD_LETTERS)
    }
}

impl DeadLetterQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            max_entries: max_entries.max(1),
        }
    }

    pub fn push(&self, event: Event, reason: impl Into<String>, failed_at: DateTime<Utc>) {
        let mut items = self.items.lock().expect("dead letter lock poisoned");
        while items.len() >= self.max_entries {
            if let Some(dropped) = items.pop_front() {
                warn!(
                    event_id = %dropped.event.id,
                    max_entries = self.max_entries,
                    "dead letter queue full, dropping oldest"
                );
            }
        }
        items.push_back(DeadLetter {
            event,
            reason: reason.into(),
            failed_at,
        });
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<DeadLetter> {
        self.items
            .lock()
            .expect("dead letter lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub fn drain(&self) -> Vec<DeadLetter> {
        self.items
            .lock()
            .expect("dead letter lock poisoned")
            .drain(..)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("dead letter lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
