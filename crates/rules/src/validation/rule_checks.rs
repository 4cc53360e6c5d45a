//! Rule-level checks: identity, cooldown range, channel list, body template.

use super::fuzzy::{fuzzy_match, is_kebab_case};
use super::ValidationResult;
use crate::schema::*;

pub(super) fn validate_metadata(rule: &Rule, result: &mut ValidationResult) {
    if rule.id.trim().is_empty() {
        result.error("id", "Rule id must not be empty");
    } else if !is_kebab_case(&rule.id) {
        result.error(
            "id",
            format!("Rule id '{}' must be kebab-case (lowercase letters, digits, single dashes)", rule.id),
        );
    }

    if rule.name.trim().is_empty() {
        result.error("name", "Rule name must not be empty");
    } else if rule.name.chars().count() > 255 {
        result.error("name", "Rule name must be at most 255 characters");
    }

    if !(MIN_COOLDOWN_HOURS..=MAX_COOLDOWN_HOURS).contains(&rule.cooldown_hours) {
        result.error(
            "cooldown_hours",
            format!(
                "cooldown_hours must be between {MIN_COOLDOWN_HOURS} and {MAX_COOLDOWN_HOURS}, got {}",
                rule.cooldown_hours
            ),
        );
    }
}

pub(super) fn validate_channels(
    rule: &Rule,
    known: Option<&[&str]>,
    result: &mut ValidationResult,
) {
    if rule.channels.is_empty() {
        result.error("channels", "At least one notification channel must be configured");
        return;
    }

    for (i, channel) in rule.channels.iter().enumerate() {
        let path = format!("channels[{i}]");
        if channel.trim().is_empty() {
            result.error(path, "Channel name must not be empty");
            continue;
        }
        if rule.channels[..i].contains(channel) {
            result.warn(path, format!("Channel '{channel}' is listed more than once"));
            continue;
        }
        if let Some(known) = known {
            if !known.contains(&channel.as_str()) {
                let message = format!("Unknown channel '{channel}'");
                match fuzzy_match(channel, known) {
                    Some(s) => result.error_with_suggestion(path, message, s),
                    None => result.error(path, message),
                }
            }
        }
    }
}

/// Syntax check only: filters and variables are resolved when rendering.
pub(super) fn validate_template(rule: &Rule, result: &mut ValidationResult) {
    let Some(template) = rule.template.as_deref() else {
        return;
    };
    if template.trim().is_empty() {
        result.warn("template", "Template is empty; the default body will be used");
        return;
    }
    let env = minijinja::Environment::new();
    if let Err(e) = env.template_from_str(template) {
        result.error("template", format!("Template does not parse: {e}"));
    }
}
