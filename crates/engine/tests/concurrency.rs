//! Concurrent ingest: dedup and cooldown must hold under parallel callers.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use boardwatch_engine::{DedupStore, InMemoryDedupStore, RuleOutcome};
use chrono::{Duration, Utc};
use futures::future::join_all;

use common::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_signature_is_processed_once() {
    let (log, sent) = MockChannel::new("log", Behavior::Succeed);
    let h = harness(vec![deep_discounts(&["log"])], vec![log]);
    let engine = Arc::new(h.engine);

    let tasks = (0..32).map(|i| {
        let engine = engine.clone();
        tokio::spawn(async move {
            let event = discount_event(&format!("copy-{i}"), "lavkaigr", 25.0, t0());
            engine.ingest_at(event, t0()).await
        })
    });

    let reports: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(reports.iter().filter(|r| !r.duplicate).count(), 1);
    assert_eq!(reports.iter().filter(|r| r.dispatched()).count(), 1);
    assert_eq!(sent.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_matches_fire_once_per_window() {
    let (log, sent) = MockChannel::new("log", Behavior::Succeed);
    let h = harness(vec![deep_discounts(&["log"])], vec![log]);
    let engine = Arc::new(h.engine);

    // Different discounts give different signatures; every event matches.
    let tasks = (0..16).map(|i| {
        let engine = engine.clone();
        tokio::spawn(async move {
            let event = discount_event(&format!("e{i}"), "hobbygames", 20.0 + i as f64, t0());
            engine.ingest_at(event, t0()).await
        })
    });

    let reports: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert!(reports.iter().all(|r| !r.duplicate));
    let fired = reports
        .iter()
        .filter(|r| matches!(r.outcome("deep-discounts"), Some(RuleOutcome::Fired { .. })))
        .count();
    let suppressed = reports
        .iter()
        .filter(|r| matches!(r.outcome("deep-discounts"), Some(RuleOutcome::Suppressed { .. })))
        .count();
    assert_eq!(fired, 1);
    assert_eq!(suppressed, 15);
    assert_eq!(sent.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sweeper_purges_expired_signatures() {
    let dedup = Arc::new(InMemoryDedupStore::new());
    let h = harness(vec![], vec![]);
    let engine = h.engine.with_dedup_store(dedup.clone());

    let long_ago = Utc::now() - Duration::hours(3);
    dedup
        .record("stale", "e-old", long_ago, Duration::hours(1))
        .await
        .unwrap();
    dedup
        .record("fresh", "e-new", Utc::now(), Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(dedup.len(), 2);

    let sweeper = engine.spawn_dedup_sweeper(std::time::Duration::from_millis(10));
    for _ in 0..100 {
        if dedup.len() == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    sweeper.abort();

    assert_eq!(dedup.len(), 1);
    assert!(dedup.entry("stale").is_none());
    assert!(dedup.entry("fresh").is_some());
}
