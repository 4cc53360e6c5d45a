//! Per-event ingest results.

use boardwatch_notify::{Notification, NotificationStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What happened to one enabled rule for one event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RuleOutcome {
    NoMatch,
    /// Matched inside the rule's cooldown window; nothing dispatched.
    Suppressed { next_allowed_at: DateTime<Utc> },
    /// Matched and dispatched, one notification per channel.
    Fired { notifications: Vec<Notification> },
    /// Processing this rule failed; other rules were unaffected.
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleReport {
    pub rule_id: String,
    #[serde(flatten)]
    pub outcome: RuleOutcome,
}

/// Result of ingesting one event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub event_id: String,
    pub signature: String,
    /// The signature was already seen; no rule was evaluated.
    pub duplicate: bool,
    pub rules: Vec<RuleReport>,
}

impl IngestReport {
    pub(crate) fn duplicate(event_id: &str, signature: &str) -> Self {
        Self {
            event_id: event_id.to_string(),
            signature: signature.to_string(),
            duplicate: true,
            rules: Vec::new(),
        }
    }

    /// Whether any rule fired for this event.
    pub fn dispatched(&self) -> bool {
        self.rules
            .iter()
            .any(|r| matches!(r.outcome, RuleOutcome::Fired { .. }))
    }

    pub fn outcome(&self, rule_id: &str) -> Option<&RuleOutcome> {
        self.rules
            .iter()
            .find(|r| r.rule_id == rule_id)
            .map(|r| &r.outcome)
    }

    pub fn fired_rules(&self) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .filter(|r| matches!(r.outcome, RuleOutcome::Fired { .. }))
            .map(|r| r.rule_id.as_str())
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.rules.iter().flat_map(|r| match &r.outcome {
            RuleOutcome::Fired { notifications } => notifications.as_slice(),
            _ => &[],
        })
    }

    /// Count of notifications with the given status across all rules.
    pub fn count_status(&self, status: NotificationStatus) -> usize {
        self.notifications().filter(|n| n.status == status).count()
    }
}
