//! Signature-keyed "already seen" store gating the ingest pipeline.
//!
//! The in-memory store shards its map by signature hash so producers
//! ingesting unrelated events rarely contend on the same lock. Within a
//! shard the check and the insert happen under one lock guard.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::DedupError;

const SHARDS: usize = 16;

/// Bookkeeping for one recorded signature.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupEntry {
    /// Event that first carried the signature.
    pub event_id: String,
    pub first_seen: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl DedupEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Store of recently seen event signatures.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Atomic test-and-set: records `signature` and returns `true` if it was
    /// not live, returns `false` without touching the entry otherwise.
    /// Of any number of concurrent callers with the same signature, exactly
    /// one gets `true`.
    async fn check_and_record(
        &self,
        signature: &str,
        event_id: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool, DedupError>;

    /// Whether `signature` has a live entry.
    async fn seen(&self, signature: &str, now: DateTime<Utc>) -> Result<bool, DedupError>;

    /// Record `signature` unconditionally, replacing any existing entry.
    async fn record(
        &self,
        signature: &str,
        event_id: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), DedupError>;

    /// Drop expired entries, returning how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, DedupError>;
}

/// Sharded in-process dedup store.
pub struct InMemoryDedupStore {
    shards: Vec<Mutex<HashMap<String, DedupEntry>>>,
}

impl InMemoryDedupStore {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARDS).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, signature: &str) -> &Mutex<HashMap<String, DedupEntry>> {
        let mut hasher = DefaultHasher::new();
        signature.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    /// Entry for `signature`, live or not.
    pub fn entry(&self, signature: &str) -> Option<DedupEntry> {
        self.shard(signature)
            .lock()
            .expect("dedup shard lock poisoned")
            .get(signature)
            .cloned()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().expect("dedup shard lock poisoned").len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryDedupStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DedupStore for InMemoryDedupStore {
    async fn check_and_record(
        &self,
        signature: &str,
        event_id: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool, DedupError> {
        let mut shard = self.shard(signature).lock().expect("dedup shard lock poisoned");
        if shard.get(signature).is_some_and(|e| e.is_live(now)) {
            return Ok(false);
        }
        shard.insert(
            signature.to_string(),
            DedupEntry {
                event_id: event_id.to_string(),
                first_seen: now,
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn seen(&self, signature: &str, now: DateTime<Utc>) -> Result<bool, DedupError> {
        Ok(self
            .shard(signature)
            .lock()
            .expect("dedup shard lock poisoned")
            .get(signature)
            .is_some_and(|e| e.is_live(now)))
    }

    async fn record(
        &self,
        signature: &str,
        event_id: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), DedupError> {
        self.shard(signature)
            .lock()
            .expect("dedup shard lock poisoned")
            .insert(
                signature.to_string(),
                DedupEntry {
                    event_id: event_id.to_string(),
                    first_seen: now,
                    expires_at: now + ttl,
                },
            );
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, DedupError> {
        let mut removed = 0;
        for shard in &self.shards {
            let mut guard = shard.lock().expect("dedup shard lock poisoned");
            let before = guard.len();
            guard.retain(|_, e| e.is_live(now));
            removed += before - guard.len();
        }
        Ok(removed)
    }
}
