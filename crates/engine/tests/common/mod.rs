#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use boardwatch_core::{Event, EventKind};
use boardwatch_engine::Engine;
use boardwatch_notify::{
    Channel, Dispatcher, InMemoryNotificationStore, NotificationPayload, NotifyError,
};
use boardwatch_rules::{Condition, Field, InMemoryRuleStore, Logic, Operator, Rule};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

pub enum Behavior {
    Succeed,
    Fail,
    RateLimited,
    Panic,
}

pub struct MockChannel {
    pub name: String,
    pub send_count: Arc<AtomicUsize>,
    pub behavior: Behavior,
}

impl MockChannel {
    pub fn new(name: &str, behavior: Behavior) -> (Arc<Self>, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let channel = Arc::new(Self {
            name: name.to_string(),
            send_count: count.clone(),
            behavior,
        });
        (channel, count)
    }
}

#[async_trait::async_trait]
impl Channel for MockChannel {
    async fn deliver(&self, _payload: &NotificationPayload) -> Result<serde_json::Value, NotifyError> {
        self.send_count.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Succeed => Ok(json!({ "ok": true })),
            Behavior::Fail => Err(NotifyError::Transport("connection refused".to_string())),
            Behavior::RateLimited => Err(NotifyError::RateLimited { retry_after_secs: 30 }),
            Behavior::Panic => panic!("channel exploded"),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
}

/// `discountPct >= 20 AND storeId in [lavkaigr, hobbygames]`, 6h cooldown.
pub fn deep_discounts(channels: &[&str]) -> Rule {
    Rule::new("deep-discounts", "Deep discounts", Logic::And)
        .with_condition(Condition::new(Field::DiscountPct, Operator::Gte, 20.0))
        .with_condition(Condition::new(
            Field::StoreId,
            Operator::In,
            vec!["lavkaigr", "hobbygames"],
        ))
        .with_channels(channels.iter().copied())
        .with_cooldown_hours(6)
}

pub fn discount_event(id: &str, store: &str, pct: f64, at: DateTime<Utc>) -> Event {
    Event::new(id, EventKind::Discount, format!("Скидка {pct}% в {store}"))
        .with_game("g-dune", "Dune: Империум")
        .with_store(store)
        .with_discount(pct)
        .with_price(2250.0)
        .with_stock(true)
        .at(at)
        .with_computed_signature()
}

pub struct Harness {
    pub engine: Engine,
    pub rules: Arc<InMemoryRuleStore>,
    pub notifications: Arc<InMemoryNotificationStore>,
}

pub fn harness(rules: Vec<Rule>, channels: Vec<Arc<dyn Channel>>) -> Harness {
    let rule_store = Arc::new(InMemoryRuleStore::from_rules(rules));
    let notifications = Arc::new(InMemoryNotificationStore::new());
    let mut dispatcher = Dispatcher::new(notifications.clone());
    for c in channels {
        dispatcher.register(c);
    }
    Harness {
        engine: Engine::new(rule_store.clone(), Arc::new(dispatcher)),
        rules: rule_store,
        notifications,
    }
}
