//! Save-time rule validation with structured errors and suggestions.
//!
//! Catches configuration errors before a rule reaches the engine: illegal
//! field/operator pairs, operand shapes that can never match, missing
//! channels, out-of-range cooldowns, body templates that do not parse. The evaluator tolerates all of these at
//! runtime, so validation is advisory for the engine and blocking for saves.
//! Returns a [`ValidationResult`] with errors (block save) and warnings (advisory).

mod condition_checks;
mod rule_checks;

pub mod fuzzy;

use crate::schema::*;
use serde::{Deserialize, Serialize};

// ── Result types ────────────────────────────────────────────────────

/// Overall validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A blocking validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// JSON-path-like location, e.g. `"conditions[1].operator"`.
    pub path: String,
    pub message: String,
    /// Optional "Did you mean …?" suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A non-blocking advisory warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    pub(crate) fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        });
    }

    pub(crate) fn error_with_suggestion(
        &mut self,
        path: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: Some(suggestion.into()),
        });
    }

    pub(crate) fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
        });
    }

    /// Whether any error was reported at `path`.
    pub fn has_error_at(&self, path: &str) -> bool {
        self.errors.iter().any(|e| e.path == path)
    }
}

// ── Public API ──────────────────────────────────────────────────────

/// Validate a [`Rule`] without knowledge of which channels exist.
pub fn validate_rule(rule: &Rule) -> ValidationResult {
    let mut result = ValidationResult::new();
    rule_checks::validate_metadata(rule, &mut result);
    rule_checks::validate_channels(rule, None, &mut result);
    rule_checks::validate_template(rule, &mut result);
    condition_checks::validate_conditions(rule, &mut result);
    result
}

/// Validate a [`Rule`], also checking channel names against the registered ones.
pub fn validate_rule_with_channels(rule: &Rule, known_channels: &[&str]) -> ValidationResult {
    let mut result = ValidationResult::new();
    rule_checks::validate_metadata(rule, &mut result);
    rule_checks::validate_channels(rule, Some(known_channels), &mut result);
    rule_checks::validate_template(rule, &mut result);
    condition_checks::validate_conditions(rule, &mut result);
    result
}

/// Parse raw YAML and validate. Returns parse errors merged with validation errors.
pub fn validate_yaml(yaml: &str) -> ValidationResult {
    match serde_yaml::from_str::<Rule>(yaml) {
        Ok(rule) => validate_rule(&rule),
        Err(e) => {
            let mut result = ValidationResult::new();
            result.error("", format!("YAML parse error: {e}"));
            result
        }
    }
}
