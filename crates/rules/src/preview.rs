//! Dry-run evaluation of a rule over a batch of events.
//!
//! Backs the rule builder's "does this rule fire?" feedback. Only the pure
//! evaluator runs here; nothing is deduplicated, rate limited, or sent.

use boardwatch_core::{Event, EventKind};
use chrono::{TimeZone, Utc};
use serde::Serialize;

use crate::evaluator::{ConditionOutcome, RuleEvaluator};
use crate::schema::Rule;

/// Per-event preview outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    pub event_id: String,
    pub title: String,
    pub matched: bool,
    pub conditions: Vec<ConditionOutcome>,
}

/// Preview outcome for a whole batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewReport {
    pub rule_id: String,
    pub rule_enabled: bool,
    pub results: Vec<PreviewResult>,
    pub match_count: usize,
    pub total_count: usize,
}

impl PreviewReport {
    pub fn matched_ids(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|r| r.matched)
            .map(|r| r.event_id.as_str())
    }
}

/// Evaluate `rule` against each event. Disabled rules are evaluated too,
/// since rules are authored before they are switched on.
pub fn preview(rule: &Rule, events: &[Event]) -> PreviewReport {
    let results: Vec<PreviewResult> = events
        .iter()
        .map(|event| {
            let m = RuleEvaluator::explain(rule, event);
            PreviewResult {
                event_id: m.event_id,
                title: event.title.clone(),
                matched: m.matched,
                conditions: m.conditions,
            }
        })
        .collect();

    let match_count = results.iter().filter(|r| r.matched).count();

    PreviewReport {
        rule_id: rule.id.clone(),
        rule_enabled: rule.enabled,
        total_count: results.len(),
        match_count,
        results,
    }
}

/// Synthetic events offered by the rule builder when no live sample is at hand.
pub fn sample_events() -> Vec<Event> {
    let at = |h: u32, m: u32| Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).single();
    let mut events = vec![
        Event::new("sample-1", EventKind::Preorder, "Предзаказ на Громкое дело стартовал!")
            .with_game("sample-game-1", "Громкое дело")
            .with_store("hobbygames")
            .with_price(2990.0)
            .with_discount(0.0)
            .with_stock(false)
            .with_publisher("Студия Игромаг")
            .with_tags(["стратегия", "партия"]),
        Event::new("sample-2", EventKind::Discount, "Большая скидка 25% на Dune: Империум")
            .with_game("sample-game-2", "Dune: Империум")
            .with_store("lavkaigr")
            .with_price(2250.0)
            .with_discount(25.0)
            .with_stock(true)
            .with_publisher("Galaxy Games")
            .with_tags(["стратегия", "научная фантастика"]),
        Event::new("sample-3", EventKind::Release, "Новое поступление Покорение Марса")
            .with_game("sample-game-3", "Покорение Марса")
            .with_store("evrikus")
            .with_price(4500.0)
            .with_discount(10.0)
            .with_stock(true)
            .with_publisher("Stronghold Games")
            .with_tags(["стратегия", "экономическая"]),
    ];
    for (event, (h, m)) in events.iter_mut().zip([(10, 30), (9, 15), (8, 45)]) {
        if let Some(ts) = at(h, m) {
            event.created_at = ts;
        }
    }
    events
        .into_iter()
        .map(Event::with_computed_signature)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Condition, Field, Logic, Operator};

    #[test]
    fn counts_matches_over_samples() {
        let rule = Rule::new("r", "Strategy under 3000", Logic::And)
            .with_condition(Condition::new(Field::Tags, Operator::ContainsAny, vec!["стратегия"]))
            .with_condition(Condition::new(Field::Price, Operator::Lte, 3000.0));

        let report = preview(&rule, &sample_events());
        assert_eq!(report.total_count, 3);
        assert_eq!(report.match_count, 2);
        assert_eq!(
            report.matched_ids().collect::<Vec<_>>(),
            vec!["sample-1", "sample-2"]
        );
    }

    #[test]
    fn disabled_rule_is_previewable() {
        let rule = Rule::new("r", "Preorders", Logic::Or)
            .with_condition(Condition::new(Field::Kind, Operator::Equals, "preorder"))
            .disabled();

        let report = preview(&rule, &sample_events());
        assert!(!report.rule_enabled);
        assert_eq!(report.match_count, 1);
    }

    #[test]
    fn empty_batch() {
        let rule = Rule::new("r", "r", Logic::And);
        let report = preview(&rule, &[]);
        assert_eq!(report.total_count, 0);
        assert_eq!(report.match_count, 0);
    }

    #[test]
    fn serializes_summary_in_camel_case() {
        let rule = Rule::new("r", "r", Logic::And);
        let json = serde_json::to_value(preview(&rule, &sample_events())).unwrap();
        assert_eq!(json["matchCount"], 0);
        assert_eq!(json["totalCount"], 3);
    }

    #[test]
    fn sample_events_carry_signatures() {
        assert!(sample_events().iter().all(|e| e.validate().is_ok()));
    }
}
