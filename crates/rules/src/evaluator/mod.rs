//! Rule evaluator combining condition results with AND/OR logic.
//!
//! Evaluation is pure: no I/O, no clock, no shared state. The live ingest
//! pipeline and the preview path call the same functions, so a rule that
//! matches in preview matches identically on live events.

mod condition;
mod field_value;

use boardwatch_core::Event;
use serde::Serialize;

use crate::schema::{Field, Logic, Operator, Rule};

pub use condition::ConditionEvaluator;
pub use field_value::{resolve, FieldValue};

// ── Rule evaluator ──────────────────────────────────────────────────

/// Evaluates a whole [`Rule`] against one event.
pub struct RuleEvaluator;

impl RuleEvaluator {
    /// Whether `rule` matches `event`.
    ///
    /// A rule with no conditions never matches, regardless of logic. The
    /// rule's `enabled` flag is not consulted here; callers on the live
    /// path filter disabled rules before evaluating.
    pub fn evaluate(rule: &Rule, event: &Event) -> bool {
        if rule.conditions.is_empty() {
            return false;
        }

        let mut results = rule
            .conditions
            .iter()
            .map(|c| ConditionEvaluator::evaluate(c, event));

        match rule.logic {
            Logic::And => results.all(|r| r),
            Logic::Or => results.any(|r| r),
        }
    }

    /// Evaluate and keep the per-condition breakdown, for preview output.
    pub fn explain(rule: &Rule, event: &Event) -> RuleMatch {
        let conditions: Vec<ConditionOutcome> = rule
            .conditions
            .iter()
            .enumerate()
            .map(|(index, c)| ConditionOutcome {
                index,
                field: c.field,
                operator: c.operator,
                enabled: c.enabled,
                matched: ConditionEvaluator::evaluate(c, event),
            })
            .collect();

        let matched = !conditions.is_empty()
            && match rule.logic {
                Logic::And => conditions.iter().all(|c| c.matched),
                Logic::Or => conditions.iter().any(|c| c.matched),
            };

        RuleMatch {
            rule_id: rule.id.clone(),
            event_id: event.id.clone(),
            matched,
            conditions,
        }
    }
}

/// Outcome of one condition inside [`RuleMatch`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionOutcome {
    pub index: usize,
    pub field: Field,
    pub operator: Operator,
    pub enabled: bool,
    pub matched: bool,
}

/// Rule evaluation result with the condition breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleMatch {
    pub rule_id: String,
    pub event_id: String,
    pub matched: bool,
    pub conditions: Vec<ConditionOutcome>,
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Condition, ConditionValue};
    use boardwatch_core::EventKind;

    fn discount_event(store: &str, pct: f64) -> Event {
        Event::new("e1", EventKind::Discount, "Скидка на Dune")
            .with_store(store)
            .with_discount(pct)
    }

    fn discount_rule(logic: Logic) -> Rule {
        Rule::new("r1", "Discounts", logic)
            .with_condition(Condition::new(Field::DiscountPct, Operator::Gte, 20.0))
            .with_condition(Condition::new(
                Field::StoreId,
                Operator::In,
                vec!["lavkaigr", "hobbygames"],
            ))
            .with_channels(["telegram"])
    }

    #[test]
    fn and_requires_all() {
        let rule = discount_rule(Logic::And);
        assert!(RuleEvaluator::evaluate(&rule, &discount_event("lavkaigr", 25.0)));
        assert!(!RuleEvaluator::evaluate(&rule, &discount_event("evrikus", 25.0)));
        assert!(!RuleEvaluator::evaluate(&rule, &discount_event("lavkaigr", 10.0)));
    }

    #[test]
    fn or_requires_any() {
        let rule = discount_rule(Logic::Or);
        assert!(RuleEvaluator::evaluate(&rule, &discount_event("evrikus", 25.0)));
        assert!(RuleEvaluator::evaluate(&rule, &discount_event("lavkaigr", 10.0)));
        assert!(!RuleEvaluator::evaluate(&rule, &discount_event("evrikus", 10.0)));
    }

    #[test]
    fn empty_rule_never_matches() {
        for logic in [Logic::And, Logic::Or] {
            let rule = Rule::new("empty", "Empty", logic).with_channels(["telegram"]);
            assert!(!RuleEvaluator::evaluate(&rule, &discount_event("lavkaigr", 25.0)));
            assert!(!RuleEvaluator::explain(&rule, &discount_event("lavkaigr", 25.0)).matched);
        }
    }

    #[test]
    fn disabling_a_failing_and_condition_can_only_help() {
        let mut rule = discount_rule(Logic::And);
        let event = discount_event("evrikus", 25.0);
        assert!(!RuleEvaluator::evaluate(&rule, &event));
        rule.conditions[1].enabled = false;
        assert!(RuleEvaluator::evaluate(&rule, &event));
    }

    #[test]
    fn all_disabled_and_rule_matches_everything() {
        let mut rule = discount_rule(Logic::And);
        for c in &mut rule.conditions {
            c.enabled = false;
        }
        assert!(RuleEvaluator::evaluate(&rule, &discount_event("anywhere", 0.0)));
    }

    #[test]
    fn type_mismatch_does_not_abort_remaining_conditions() {
        let rule = Rule::new("r", "r", Logic::Or)
            .with_condition(Condition::new(
                Field::Price,
                Operator::Gte,
                ConditionValue::Text("cheap".to_string()),
            ))
            .with_condition(Condition::new(Field::StoreId, Operator::Equals, "lavkaigr"));
        assert!(RuleEvaluator::evaluate(&rule, &discount_event("lavkaigr", 5.0)));
    }

    #[test]
    fn explain_agrees_with_evaluate() {
        let rule = discount_rule(Logic::And);
        for (store, pct) in [("lavkaigr", 25.0), ("evrikus", 25.0), ("hobbygames", 5.0)] {
            let event = discount_event(store, pct);
            let explained = RuleEvaluator::explain(&rule, &event);
            assert_eq!(explained.matched, RuleEvaluator::evaluate(&rule, &event));
            assert_eq!(explained.conditions.len(), 2);
        }
    }

    #[test]
    fn disabled_rule_still_evaluates() {
        let rule = discount_rule(Logic::And).disabled();
        assert!(RuleEvaluator::evaluate(&rule, &discount_event("lavkaigr", 25.0)));
    }
}
