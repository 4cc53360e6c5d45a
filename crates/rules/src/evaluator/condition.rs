//! Single-condition evaluation.
//!
//! Evaluation never fails: a disabled condition passes, while an illegal
//! field/operator pair or a value of the wrong shape simply does not match.

use boardwatch_core::Event;
use tracing::debug;

use crate::schema::{Condition, ConditionValue, Operator, Scalar};

use super::field_value::{resolve, FieldValue};

/// Evaluates one [`Condition`] against one event.
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    pub fn evaluate(condition: &Condition, event: &Event) -> bool {
        if !condition.enabled {
            return true;
        }

        if !condition.field.allows(condition.operator) {
            debug!(
                field = %condition.field,
                operator = %condition.operator,
                event_id = %event.id,
                "operator not allowed for field, condition does not match"
            );
            return false;
        }

        let actual = resolve(condition.field, event);
        apply(condition.operator, actual, &condition.value)
    }
}

/// Apply `operator` to a resolved field value. Shape mismatches yield `false`.
pub(crate) fn apply(operator: Operator, actual: FieldValue<'_>, expected: &ConditionValue) -> bool {
    match operator {
        Operator::Equals => equals(actual, expected),
        Operator::Contains => match (actual, expected) {
            (FieldValue::Text(a), ConditionValue::Text(b)) => contains_ci(a, b),
            _ => false,
        },
        Operator::ContainsAny => {
            let Some(wanted) = expected.as_list() else {
                return false;
            };
            match actual {
                FieldValue::Text(a) => wanted
                    .iter()
                    .filter_map(Scalar::as_text)
                    .any(|w| contains_ci(a, w)),
                FieldValue::List(items) => wanted
                    .iter()
                    .filter_map(Scalar::as_text)
                    .any(|w| items.iter().any(|i| i == w)),
                _ => false,
            }
        }
        Operator::ContainsAll => match (actual, expected.as_list()) {
            (FieldValue::List(items), Some(wanted)) => wanted.iter().all(|w| match w {
                Scalar::Text(w) => items.iter().any(|i| i == w),
                _ => false,
            }),
            _ => false,
        },
        Operator::StartsWith => match (actual, expected) {
            (FieldValue::Text(a), ConditionValue::Text(b)) => {
                a.to_lowercase().starts_with(&b.to_lowercase())
            }
            _ => false,
        },
        Operator::In => match expected.as_list() {
            Some(candidates) => candidates.iter().any(|c| scalar_eq(actual, c)),
            None => false,
        },
        Operator::Gte => match (actual, expected) {
            (FieldValue::Number(a), ConditionValue::Number(b)) => a >= *b,
            _ => false,
        },
        Operator::Lte => match (actual, expected) {
            (FieldValue::Number(a), ConditionValue::Number(b)) => a <= *b,
            _ => false,
        },
        Operator::Between => match (actual, expected.as_range()) {
            (FieldValue::Number(a), Some((lo, hi))) => lo <= a && a <= hi,
            _ => false,
        },
    }
}

fn equals(actual: FieldValue<'_>, expected: &ConditionValue) -> bool {
    match (actual, expected) {
        (FieldValue::Text(a), ConditionValue::Text(b)) => a == b,
        (FieldValue::Number(a), ConditionValue::Number(b)) => a == *b,
        (FieldValue::Bool(a), ConditionValue::Bool(b)) => a == *b,
        _ => false,
    }
}

fn scalar_eq(actual: FieldValue<'_>, candidate: &Scalar) -> bool {
    match (actual, candidate) {
        (FieldValue::Text(a), Scalar::Text(b)) => a == b,
        (FieldValue::Number(a), Scalar::Number(b)) => a == *b,
        (FieldValue::Bool(a), Scalar::Bool(b)) => a == *b,
        _ => false,
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use boardwatch_core::EventKind;

    fn event() -> Event {
        Event::new("e1", EventKind::Preorder, "Предзаказ на игру открыт")
            .with_store("hobbygames")
            .with_game("g-42", "Громкое дело")
            .with_price(2990.0)
            .with_discount(0.0)
            .with_stock(false)
            .with_publisher("Студия Игромаг")
            .with_tags(["стратегия", "партия"])
    }

    fn check(field: Field, op: Operator, value: impl Into<ConditionValue>) -> bool {
        ConditionEvaluator::evaluate(&Condition::new(field, op, value), &event())
    }

    #[test]
    fn contains_any_is_case_insensitive() {
        assert!(check(
            Field::Title,
            Operator::ContainsAny,
            vec!["предзаказ", "в продаже"]
        ));
        assert!(!check(Field::Title, Operator::ContainsAny, vec!["скидка"]));
    }

    #[test]
    fn between_is_inclusive() {
        let at = |price: f64| {
            let e = event().with_price(price);
            ConditionEvaluator::evaluate(
                &Condition::new(Field::Price, Operator::Between, [2000.0, 3000.0]),
                &e,
            )
        };
        assert!(!at(3500.0));
        assert!(at(3000.0));
        assert!(at(2000.0));
        assert!(!at(1999.99));
    }

    #[test]
    fn between_requires_exactly_two_numbers() {
        assert!(!check(Field::Price, Operator::Between, vec![2000.0]));
        assert!(!check(Field::Price, Operator::Between, vec![1.0, 2.0, 3000.0]));
        assert!(!check(Field::Price, Operator::Between, vec!["2000", "3000"]));
    }

    #[test]
    fn numeric_comparisons() {
        assert!(check(Field::Price, Operator::Gte, 2990.0));
        assert!(!check(Field::Price, Operator::Gte, 2990.01));
        assert!(check(Field::Price, Operator::Lte, 3000.0));
        assert!(check(Field::DiscountPct, Operator::Lte, 0.0));
    }

    #[test]
    fn numeric_operator_on_text_value_is_mismatch() {
        assert!(!check(Field::Price, Operator::Gte, "2000"));
    }

    #[test]
    fn equals_is_strict() {
        assert!(check(Field::StoreId, Operator::Equals, "hobbygames"));
        assert!(!check(Field::StoreId, Operator::Equals, "HobbyGames"));
        assert!(check(Field::InStock, Operator::Equals, false));
        assert!(!check(Field::InStock, Operator::Equals, "false"));
        assert!(check(Field::Kind, Operator::Equals, "preorder"));
    }

    #[test]
    fn in_matches_scalar_membership() {
        assert!(check(
            Field::StoreId,
            Operator::In,
            vec!["lavkaigr", "hobbygames"]
        ));
        assert!(!check(Field::StoreId, Operator::In, vec!["lavkaigr"]));
        assert!(check(Field::Kind, Operator::In, vec!["discount", "preorder"]));
        assert!(!check(Field::StoreId, Operator::In, "hobbygames"));
    }

    #[test]
    fn starts_with_and_contains() {
        assert!(check(Field::Title, Operator::StartsWith, "предзаказ"));
        assert!(!check(Field::Title, Operator::StartsWith, "игру"));
        assert!(check(Field::Publisher, Operator::Contains, "игромаг"));
    }

    #[test]
    fn game_falls_back_to_id() {
        let mut e = event();
        e.game_title = None;
        let cond = Condition::new(Field::Game, Operator::Equals, "g-42");
        assert!(ConditionEvaluator::evaluate(&cond, &e));
    }

    #[test]
    fn tag_operators_use_exact_elements() {
        assert!(check(Field::Tags, Operator::ContainsAll, vec!["стратегия", "партия"]));
        assert!(!check(Field::Tags, Operator::ContainsAll, vec!["стратегия", "кооператив"]));
        assert!(check(Field::Tags, Operator::ContainsAny, vec!["кооператив", "партия"]));
        assert!(!check(Field::Tags, Operator::ContainsAny, vec!["страт"]));
    }

    #[test]
    fn missing_field_never_matches() {
        let e = Event::new("e2", EventKind::Announce, "Анонс");
        for (field, op, value) in [
            (Field::Price, Operator::Lte, ConditionValue::Number(1e9)),
            (Field::StoreId, Operator::In, vec!["lavkaigr"].into()),
            (Field::InStock, Operator::Equals, ConditionValue::Bool(false)),
            (Field::Publisher, Operator::Contains, ConditionValue::Text(String::new())),
        ] {
            assert!(!ConditionEvaluator::evaluate(&Condition::new(field, op, value), &e));
        }
    }

    #[test]
    fn disallowed_operator_does_not_match() {
        assert!(!check(Field::Title, Operator::Gte, 1.0));
        assert!(!check(Field::Tags, Operator::Equals, "стратегия"));
    }

    #[test]
    fn disabled_condition_passes() {
        let cond = Condition::new(Field::Price, Operator::Gte, 1_000_000.0).disabled();
        assert!(ConditionEvaluator::evaluate(&cond, &event()));
        let illegal = Condition::new(Field::Title, Operator::Between, "x").disabled();
        assert!(ConditionEvaluator::evaluate(&illegal, &event()));
    }
}
