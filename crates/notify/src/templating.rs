//! Minijinja template rendering for notification messages.
//!
//! Renders notification subject and body from the matched rule and event.
//! A rule may carry its own body template; when it is missing or fails to
//! render, the default body is used instead.
//!
//! Templates are arbitrary strings (not pre-registered), so a fresh
//! [`minijinja::Environment`] is created per render call.

use boardwatch_core::Event;
use boardwatch_rules::Rule;
use chrono::{DateTime, Utc};

use crate::traits::NotifyError;

/// Subject used for every notification.
pub const DEFAULT_SUBJECT: &str = "{{ rule.name }}";

/// Body used when the rule has no template of its own.
pub const DEFAULT_BODY: &str = "{{ event.title }}\
{% if event.store_id %}\nStore: {{ event.store_id }}{% endif %}\
{% if event.price %}\nPrice: {{ event.price | round }} {{ event.currency }}{% endif %}\
{% if event.discount_pct %}\nDiscount: {{ event.discount_pct | round }}%{% endif %}\
{% if event.url %}\n{{ event.url }}{% endif %}";

/// Context data available to notification templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TemplateContext<'a> {
    /// Rule metadata that triggered the notification.
    pub rule: RuleContext,
    /// The matched event, with its field names as serialized.
    pub event: &'a Event,
    /// Channel the notification is rendered for.
    pub channel: String,
    /// Current timestamp in ISO 8601 format.
    pub now: String,
}

/// Rule metadata exposed to templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RuleContext {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub logic: String,
    pub cooldown_hours: u32,
}

impl<'a> TemplateContext<'a> {
    pub fn new(rule: &Rule, event: &'a Event, channel: &str, now: DateTime<Utc>) -> Self {
        Self {
            rule: RuleContext {
                id: rule.id.clone(),
                name: rule.name.clone(),
                description: rule.description.clone(),
                logic: rule.logic.to_string(),
                cooldown_hours: rule.effective_cooldown_hours(),
            },
            event,
            channel: channel.to_string(),
            now: now.to_rfc3339(),
        }
    }
}

/// Renders notification templates using minijinja.
#[derive(Debug, Default)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Build a minijinja environment with the message filters. Rule templates
    /// are authored from the dashboard, so no process state is exposed.
    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("round", round_filter);
        env.add_filter("lower", lower_filter);
        env.add_filter("upper", upper_filter);
        env
    }

    /// Render a template string with the given context.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template is invalid or
    /// rendering fails.
    pub fn render(&self, template_str: &str, ctx: &TemplateContext<'_>) -> Result<String, NotifyError> {
        let env = Self::build_env();
        env.render_str(template_str, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Render `(subject, body)` for a notification. Never fails: a broken
    /// rule template falls back to [`DEFAULT_BODY`], and a failing default
    /// falls back to the raw event title.
    pub fn render_message(&self, rule: &Rule, ctx: &TemplateContext<'_>) -> (String, String) {
        let subject = self
            .render(DEFAULT_SUBJECT, ctx)
            .unwrap_or_else(|_| rule.name.clone());

        let custom = rule.template.as_deref().and_then(|tpl| {
            self.render(tpl, ctx)
                .map_err(|e| {
                    tracing::warn!(
                        rule_id = %rule.id,
                        error = %e,
                        "rule template failed to render, using default body"
                    );
                })
                .ok()
        });

        let body = match custom {
            Some(body) => body,
            None => self
                .render(DEFAULT_BODY, ctx)
                .unwrap_or_else(|_| ctx.event.title.clone()),
        };

        (subject, body)
    }
}

/// Custom filter: round a float to N decimal places.
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}

fn lower_filter(value: String) -> String {
    value.to_lowercase()
}

fn upper_filter(value: String) -> String {
    value.to_uppercase()
}
