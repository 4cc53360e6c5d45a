//! In-memory structured audit log for rule processing.
//!
//! Stores per-rule log entries capped at a configurable maximum (default 500)
//! with FIFO eviction. Uses `std::sync::RwLock` so it can be written from
//! the ingest futures without holding anything across an await.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity level for audit log entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Numeric severity for comparison (higher = more severe).
    pub fn as_severity(&self) -> u8 {
        match self {
            LogLevel::Debug => 0,
            LogLevel::Info => 1,
            LogLevel::Warning => 2,
            LogLevel::Error => 3,
        }
    }
}

/// Pipeline stage that produced the log entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    Evaluation,
    Cooldown,
    Notification,
    NotifyError,
    StoreError,
}

/// A single audit log entry.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub rule_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub level: LogLevel,
    pub phase: ExecutionPhase,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Query parameters for filtering audit log entries.
#[derive(Debug, Default, Deserialize)]
pub struct LogQueryParams {
    /// Minimum log level (inclusive). Entries below this severity are excluded.
    pub level: Option<LogLevel>,
    pub phase: Option<ExecutionPhase>,
    /// Maximum number of entries to return (default 100).
    pub limit: Option<u32>,
    /// Only return entries at or after this instant.
    pub since: Option<DateTime<Utc>>,
}

/// In-memory per-rule audit log with FIFO eviction.
pub struct AuditLog {
    entries: RwLock<HashMap<String, VecDeque<LogEntry>>>,
    max_entries_per_rule: usize,
}

impl AuditLog {
    /// Create a new audit log with the default cap of 500 entries per rule.
    pub fn new() -> Self {
        Self::with_max_entries(500)
    }

    /// Create a new audit log with a custom per-rule entry cap.
    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries_per_rule: max,
        }
    }

    /// Append an entry for a rule/event pair.
    pub fn log(
        &self,
        rule_id: &str,
        event_id: Option<&str>,
        level: LogLevel,
        phase: ExecutionPhase,
        message: impl Into<String>,
    ) {
        self.log_with_details(rule_id, event_id, level, phase, message, None);
    }

    /// Append an entry with structured details.
    pub fn log_with_details(
        &self,
        rule_id: &str,
        event_id: Option<&str>,
        level: LogLevel,
        phase: ExecutionPhase,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            rule_id: rule_id.to_string(),
            event_id: event_id.map(str::to_string),
            level,
            phase,
            message: message.into(),
            details,
        };

        let mut guard = self.entries.write().expect("audit_log lock poisoned");
        let deque = guard.entry(rule_id.to_string()).or_default();
        deque.push_back(entry);
        while deque.len() > self.max_entries_per_rule {
            deque.pop_front();
        }
    }

    /// Query log entries for a rule, newest first.
    pub fn query(&self, rule_id: &str, params: &LogQueryParams) -> Vec<LogEntry> {
        let guard = self.entries.read().expect("audit_log lock poisoned");
        let Some(deque) = guard.get(rule_id) else {
            return Vec::new();
        };

        let min_severity = params.level.as_ref().map_or(0, LogLevel::as_severity);
        let limit = params.limit.unwrap_or(100) as usize;

        deque
            .iter()
            .rev()
            .filter(|e| e.level.as_severity() >= min_severity)
            .filter(|e| params.phase.as_ref().map_or(true, |p| &e.phase == p))
            .filter(|e| params.since.map_or(true, |s| e.timestamp >= s))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Clear all log entries for a specific rule.
    pub fn clear(&self, rule_id: &str) {
        self.entries
            .write()
            .expect("audit_log lock poisoned")
            .remove(rule_id);
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all() -> LogQueryParams {
        LogQueryParams::default()
    }

    #[test]
    fn basic_log_and_query() {
        let log = AuditLog::new();
        log.log("r1", Some("e1"), LogLevel::Debug, ExecutionPhase::Evaluation, "matched");
        log.log("r1", Some("e1"), LogLevel::Info, ExecutionPhase::Cooldown, "granted");
        log.log("r1", Some("e1"), LogLevel::Info, ExecutionPhase::Notification, "sent");

        let entries = log.query("r1", &all());
        assert_eq!(entries.len(), 3);
        // Newest first
        assert_eq!(entries[0].phase, ExecutionPhase::Notification);
        assert_eq!(entries[2].phase, ExecutionPhase::Evaluation);
        assert_eq!(entries[0].event_id.as_deref(), Some("e1"));
    }

    #[test]
    fn level_filter() {
        let log = AuditLog::new();
        log.log("r1", None, LogLevel::Debug, ExecutionPhase::Evaluation, "debug");
        log.log("r1", None, LogLevel::Info, ExecutionPhase::Evaluation, "info");
        log.log("r1", None, LogLevel::Warning, ExecutionPhase::NotifyError, "warn");
        log.log("r1", None, LogLevel::Error, ExecutionPhase::StoreError, "error");

        let params = LogQueryParams {
            level: Some(LogLevel::Warning),
            ..LogQueryParams::default()
        };
        let entries = log.query("r1", &params);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.level.as_severity() >= 2));
    }

    #[test]
    fn phase_filter_and_limit() {
        let log = AuditLog::new();
        for i in 0..10 {
            log.log("r1", None, LogLevel::Info, ExecutionPhase::Cooldown, format!("msg {i}"));
        }
        log.log("r1", None, LogLevel::Info, ExecutionPhase::Notification, "sent");

        let params = LogQueryParams {
            phase: Some(ExecutionPhase::Cooldown),
            limit: Some(3),
            ..LogQueryParams::default()
        };
        let entries = log.query("r1", &params);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "msg 9");
        assert!(entries.iter().all(|e| e.phase == ExecutionPhase::Cooldown));
    }

    #[test]
    fn since_filter() {
        let log = AuditLog::new();
        log.log("r1", None, LogLevel::Info, ExecutionPhase::Evaluation, "old");
        let params = LogQueryParams {
            since: Some(Utc::now() + chrono::Duration::hours(1)),
            ..LogQueryParams::default()
        };
        assert!(log.query("r1", &params).is_empty());
    }

    #[test]
    fn fifo_eviction() {
        let log = AuditLog::with_max_entries(3);
        for i in 1..=4 {
            log.log("r1", None, LogLevel::Info, ExecutionPhase::Evaluation, format!("msg {i}"));
        }

        let entries = log.query("r1", &all());
        assert_eq!(entries.len(), 3);
        // Oldest ("msg 1") should have been evicted
        assert_eq!(entries[2].message, "msg 2");
        assert_eq!(entries[0].message, "msg 4");
    }

    #[test]
    fn clear_and_isolation() {
        let log = AuditLog::new();
        log.log("r1", None, LogLevel::Info, ExecutionPhase::Evaluation, "r1 msg");
        log.log("r2", None, LogLevel::Error, ExecutionPhase::NotifyError, "r2 msg");

        log.clear("r1");
        assert!(log.query("r1", &all()).is_empty());
        assert_eq!(log.query("r2", &all()).len(), 1);
        assert!(log.query("nonexistent", &all()).is_empty());
    }

    #[test]
    fn details_are_kept() {
        let log = AuditLog::new();
        let details = serde_json::json!({"channel": "telegram", "status": "deferred"});
        log.log_with_details(
            "r1",
            Some("e1"),
            LogLevel::Warning,
            ExecutionPhase::NotifyError,
            "deferred",
            Some(details.clone()),
        );
        assert_eq!(log.query("r1", &all())[0].details, Some(details));
    }
}
