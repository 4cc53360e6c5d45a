//! Alert rule definition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{default_true, Condition};

pub const MIN_COOLDOWN_HOURS: u32 = 1;
pub const MAX_COOLDOWN_HOURS: u32 = 168;
pub const DEFAULT_COOLDOWN_HOURS: u32 = 12;

fn default_cooldown_hours() -> u32 {
    DEFAULT_COOLDOWN_HOURS
}

/// How a rule combines its condition results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    #[default]
    #[serde(alias = "and")]
    And,
    #[serde(alias = "or")]
    Or,
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logic::And => write!(f, "AND"),
            Logic::Or => write!(f, "OR"),
        }
    }
}

/// A named alert policy: conditions combined by `logic`, plus where and how
/// often to notify.
///
/// Owned by the rule store; the engine reads rules and never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logic: Logic,
    /// Display order only; evaluation does not depend on it.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default = "default_cooldown_hours", alias = "cooldownHours")]
    pub cooldown_hours: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Optional minijinja template for the notification body.
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Rule {
    pub fn new(id: impl Into<String>, name: impl Into<String>, logic: Logic) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            logic,
            conditions: Vec::new(),
            channels: Vec::new(),
            cooldown_hours: DEFAULT_COOLDOWN_HOURS,
            enabled: true,
            template: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels = channels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cooldown_hours(mut self, hours: u32) -> Self {
        self.cooldown_hours = hours;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Cooldown hours clamped into the supported 1..=168 range.
    pub fn effective_cooldown_hours(&self) -> u32 {
        self.cooldown_hours
            .clamp(MIN_COOLDOWN_HOURS, MAX_COOLDOWN_HOURS)
    }

    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::hours(self.effective_cooldown_hours() as i64)
    }

    /// Channels in declaration order with duplicates removed.
    pub fn unique_channels(&self) -> Vec<&str> {
        let mut seen = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            if !seen.contains(&channel.as_str()) {
                seen.push(channel.as_str());
            }
        }
        seen
    }
}
