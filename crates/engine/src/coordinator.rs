//! [`Engine`]: the ingest pipeline and the dry-run preview path.
//!
//! Live path per event: validate → read enabled rules → dedup gate →
//! evaluate every rule concurrently → cooldown gate per matching rule →
//! fan out to the rule's channels. Each rule is processed in isolation: an
//! error (or a panic) while handling one rule is reported in that rule's
//! outcome and never affects the others.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use boardwatch_core::{EngineConfig, Event};
use boardwatch_notify::{Dispatcher, NotificationStatus};
use boardwatch_rules::schema::{MAX_COOLDOWN_HOURS, MIN_COOLDOWN_HOURS};
use boardwatch_rules::{PreviewReport, Rule, RuleEvaluator, RuleStore};
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use futures::FutureExt;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::audit_log::{AuditLog, ExecutionPhase, LogLevel};
use crate::cooldown::{CooldownStore, FireDecision, InMemoryCooldownStore};
use crate::dead_letter::{DeadLetter, DeadLetterQueue};
use crate::dedup::{DedupStore, InMemoryDedupStore};
use crate::error::IngestError;
use crate::report::{IngestReport, RuleOutcome, RuleReport};

/// Wires rule store, dedup, cooldown and dispatch into one pipeline.
///
/// `ingest` takes `&self` and may be called from many tasks at once.
pub struct Engine {
    rules: Arc<dyn RuleStore>,
    dedup: Arc<dyn DedupStore>,
    cooldowns: Arc<dyn CooldownStore>,
    dispatcher: Arc<Dispatcher>,
    audit: AuditLog,
    dead_letters: DeadLetterQueue,
    dedup_ttl: Duration,
}

impl Engine {
    /// Engine with in-memory dedup and cooldown stores and default settings.
    pub fn new(rules: Arc<dyn RuleStore>, dispatcher: Arc<Dispatcher>) -> Self {
        Self::from_config(rules, dispatcher, &EngineConfig::default())
    }

    /// Engine with in-memory stores, using the dedup TTL and the audit and dead-letter caps from `config`.
    pub fn from_config(
        rules: Arc<dyn RuleStore>,
        dispatcher: Arc<Dispatcher>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            rules,
            dedup: Arc::new(InMemoryDedupStore::new()),
            cooldowns: Arc::new(InMemoryCooldownStore::new()),
            dispatcher,
            audit: AuditLog::with_max_entries(config.audit.max_entries_per_rule),
            dead_letters: DeadLetterQueue::with_max_entries(config.audit.max_dead_letters),
            dedup_ttl: config.dedup.ttl(),
        }
    }

    pub fn with_dedup_store(mut self, store: Arc<dyn DedupStore>) -> Self {
        self.dedup = store;
        self
    }

    pub fn with_cooldown_store(mut self, store: Arc<dyn CooldownStore>) -> Self {
        self.cooldowns = store;
        self
    }

    pub fn with_dedup_ttl(mut self, ttl: Duration) -> Self {
        self.dedup_ttl = ttl;
        self
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn cooldowns(&self) -> &Arc<dyn CooldownStore> {
        &self.cooldowns
    }

    /// Ingest one event at the current time.
    pub async fn ingest(&self, event: Event) -> Result<IngestReport, IngestError> {
        self.ingest_at(event, Utc::now()).await
    }

    /// Ingest one event as if the current time were `now`.
    ///
    /// `now` drives dedup expiry and cooldown windows, which makes replays
    /// and tests deterministic.
    pub async fn ingest_at(
        &self,
        event: Event,
        now: DateTime<Utc>,
    ) -> Result<IngestReport, IngestError> {
        event.validate()?;

        // Read rules before the dedup gate so a rule store failure leaves
        // the event unmarked and retryable.
        let rules = self.rules.enabled_rules().await?;

        match self
            .dedup
            .check_and_record(&event.signature, &event.id, now, self.dedup_ttl)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                info!(event_id = %event.id, signature = %event.signature, "duplicate event skipped");
                return Ok(IngestReport::duplicate(&event.id, &event.signature));
            }
            Err(e) => {
                error!(
                    event_id = %event.id,
                    signature = %event.signature,
                    error = %e,
                    "dedup check failed, event dead-lettered"
                );
                self.dead_letters.push(event, e.to_string(), now);
                return Err(IngestError::DedupUnavailable(e));
            }
        }

        let event = &event;
        let outcomes = join_all(rules.iter().map(|rule| async move {
            let outcome = match AssertUnwindSafe(self.process_rule(rule, event, now))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!(rule_id = %rule.id, event_id = %event.id, "rule processing panicked");
                    RuleOutcome::Failed {
                        error: "rule processing panicked".to_string(),
                    }
                }
            };
            RuleReport {
                rule_id: rule.id.clone(),
                outcome,
            }
        }))
        .await;

        let report = IngestReport {
            event_id: event.id.clone(),
            signature: event.signature.clone(),
            duplicate: false,
            rules: outcomes,
        };
        debug!(
            event_id = %event.id,
            rules = report.rules.len(),
            fired = report.fired_rules().count(),
            "event processed"
        );
        Ok(report)
    }

    async fn process_rule(&self, rule: &Rule, event: &Event, now: DateTime<Utc>) -> RuleOutcome {
        if !RuleEvaluator::evaluate(rule, event) {
            return RuleOutcome::NoMatch;
        }
        self.audit.log(
            &rule.id,
            Some(&event.id),
            LogLevel::Debug,
            ExecutionPhase::Evaluation,
            "rule matched",
        );

        // Before `try_fire`: a rule with no channels never consumes its window.
        if rule.unique_channels().is_empty() {
            let error = "no notification channels configured".to_string();
            warn!(rule_id = %rule.id, event_id = %event.id, "matched rule has {error}");
            self.audit.log(
                &rule.id,
                Some(&event.id),
                LogLevel::Error,
                ExecutionPhase::Notification,
                error.clone(),
            );
            return RuleOutcome::Failed { error };
        }

        if !(MIN_COOLDOWN_HOURS..=MAX_COOLDOWN_HOURS).contains(&rule.cooldown_hours) {
            warn!(
                rule_id = %rule.id,
                cooldown_hours = rule.cooldown_hours,
                effective = rule.effective_cooldown_hours(),
                "cooldown_hours out of range, clamped"
            );
        }

        match self.cooldowns.try_fire(&rule.id, now, rule.cooldown()).await {
            Ok(FireDecision::Granted { .. }) => {}
            Ok(FireDecision::Suppressed { next_allowed_at, .. }) => {
                debug!(rule_id = %rule.id, event_id = %event.id, %next_allowed_at, "rule in cooldown");
                self.audit.log_with_details(
                    &rule.id,
                    Some(&event.id),
                    LogLevel::Info,
                    ExecutionPhase::Cooldown,
                    "match suppressed by cooldown",
                    Some(json!({ "nextAllowedAt": next_allowed_at })),
                );
                return RuleOutcome::Suppressed { next_allowed_at };
            }
            Err(e) => {
                error!(rule_id = %rule.id, event_id = %event.id, error = %e, "cooldown check failed, not dispatching");
                self.audit.log(
                    &rule.id,
                    Some(&event.id),
                    LogLevel::Error,
                    ExecutionPhase::StoreError,
                    e.to_string(),
                );
                return RuleOutcome::Failed {
                    error: e.to_string(),
                };
            }
        }

        let mut notifications = Vec::new();
        for result in self.dispatcher.dispatch_all(rule, event).await {
            match result {
                Ok(n) => {
                    let (level, phase) = match n.status {
                        NotificationStatus::Sent => (LogLevel::Info, ExecutionPhase::Notification),
                        _ => (LogLevel::Warning, ExecutionPhase::NotifyError),
                    };
                    self.audit.log_with_details(
                        &rule.id,
                        Some(&event.id),
                        level,
                        phase,
                        format!("{} via {}", n.status, n.channel),
                        Some(json!({ "notificationId": n.id, "meta": n.meta })),
                    );
                    notifications.push(n);
                }
                Err(e) => {
                    error!(rule_id = %rule.id, event_id = %event.id, error = %e, "notification could not be recorded");
                    self.audit.log(
                        &rule.id,
                        Some(&event.id),
                        LogLevel::Error,
                        ExecutionPhase::StoreError,
                        e.to_string(),
                    );
                }
            }
        }

        info!(
            rule_id = %rule.id,
            event_id = %event.id,
            notifications = notifications.len(),
            "rule fired"
        );
        RuleOutcome::Fired { notifications }
    }

    /// Dry-run `rule` over `events`. Touches no dedup, cooldown or
    /// notification state, and works for disabled rules.
    pub fn preview(&self, rule: &Rule, events: &[Event]) -> PreviewReport {
        boardwatch_rules::preview(rule, events)
    }

    /// [`preview`](Self::preview) for a stored rule. `Ok(None)` if no rule has that id.
    pub async fn preview_rule(
        &self,
        rule_id: &str,
        events: &[Event],
    ) -> Result<Option<PreviewReport>, IngestError> {
        Ok(self
            .rules
            .get(rule_id)
            .await?
            .map(|rule| self.preview(&rule, events)))
    }

    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.snapshot()
    }

    pub fn drain_dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.drain()
    }

    /// Periodically purge expired dedup signatures until the task is aborted.
    pub fn spawn_dedup_sweeper(&self, every: std::time::Duration) -> JoinHandle<()> {
        let dedup = self.dedup.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match dedup.purge_expired(Utc::now()).await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "purged expired dedup signatures"),
                    Err(e) => warn!(error = %e, "dedup sweep failed"),
                }
            }
        })
    }
}
