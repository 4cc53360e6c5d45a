//! Condition checks: operator legality per field and operand shapes.

use super::ValidationResult;
use crate::schema::*;

pub(super) fn validate_conditions(rule: &Rule, result: &mut ValidationResult) {
    if rule.conditions.is_empty() {
        result.warn("conditions", "Rule has no conditions and will never match");
        return;
    }

    if rule.conditions.iter().all(|c| !c.enabled) {
        result.warn(
            "conditions",
            "All conditions are disabled; the rule matches every event",
        );
    }

    for (i, condition) in rule.conditions.iter().enumerate() {
        validate_condition(condition, &format!("conditions[{i}]"), result);
    }
}

fn validate_condition(condition: &Condition, path: &str, result: &mut ValidationResult) {
    let field = condition.field;
    let op = condition.operator;

    if !field.allows(op) {
        let allowed: Vec<&str> = field.allowed_operators().iter().map(|o| o.as_str()).collect();
        result.error_with_suggestion(
            format!("{path}.operator"),
            format!("Operator '{op}' is not valid for field '{field}'"),
            format!("use one of: {}", allowed.join(", ")),
        );
        return;
    }

    let value_path = format!("{path}.value");
    let value = &condition.value;

    match op {
        Operator::Between => match value.as_range() {
            Some((lo, hi)) if lo > hi => {
                result.error(value_path, format!("Range lower bound {lo} exceeds upper bound {hi}"));
            }
            Some(_) => {}
            None => result.error(value_path, "'between' requires a [lo, hi] pair of numbers"),
        },
        Operator::Gte | Operator::Lte => {
            if !matches!(value, ConditionValue::Number(_)) {
                result.error(
                    value_path,
                    format!("'{op}' requires a number, got {}", value.kind_name()),
                );
            }
        }
        Operator::In | Operator::ContainsAny | Operator::ContainsAll => match value.as_list() {
            None => result.error(
                value_path,
                format!("'{op}' requires a list, got {}", value.kind_name()),
            ),
            Some([]) => result.warn(value_path, format!("'{op}' with an empty list")),
            Some(items) => {
                if op != Operator::In && items.iter().any(|s| s.as_text().is_none()) {
                    result.error(value_path, format!("'{op}' requires a list of strings"));
                }
            }
        },
        Operator::Contains | Operator::StartsWith => {
            if !matches!(value, ConditionValue::Text(_)) {
                result.error(
                    value_path,
                    format!("'{op}' requires a string, got {}", value.kind_name()),
                );
            }
        }
        Operator::Equals => {
            let shape_ok = match value {
                ConditionValue::Number(_) => field.is_numeric(),
                ConditionValue::Bool(_) => field == Field::InStock,
                ConditionValue::Text(_) => !field.is_numeric() && field != Field::InStock,
                ConditionValue::Null | ConditionValue::List(_) => false,
            };
            if !shape_ok {
                result.error(
                    value_path,
                    format!("'equals' on '{field}' cannot match a {}", value.kind_name()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::validate_rule;
    use crate::schema::*;

    fn rule_with(condition: Condition) -> Rule {
        Rule::new("r", "r", Logic::And)
            .with_condition(condition)
            .with_channels(["log"])
    }

    #[test]
    fn operator_not_valid_for_field() {
        let result = validate_rule(&rule_with(Condition::new(Field::Title, Operator::Gte, 5.0)));
        assert!(result.has_error_at("conditions[0].operator"));
        assert!(result.errors[0]
            .suggestion
            .as_deref()
            .unwrap()
            .contains("starts_with"));
    }

    #[test]
    fn between_shape() {
        let bad = validate_rule(&rule_with(Condition::new(Field::Price, Operator::Between, 2000.0)));
        assert!(bad.has_error_at("conditions[0].value"));

        let inverted = validate_rule(&rule_with(Condition::new(
            Field::Price,
            Operator::Between,
            [3000.0, 2000.0],
        )));
        assert!(inverted.has_error_at("conditions[0].value"));

        let ok = validate_rule(&rule_with(Condition::new(
            Field::Price,
            Operator::Between,
            [2000.0, 3000.0],
        )));
        assert!(ok.valid);
    }

    #[test]
    fn list_operators_need_lists() {
        let result = validate_rule(&rule_with(Condition::new(Field::StoreId, Operator::In, "lavkaigr")));
        assert!(result.has_error_at("conditions[0].value"));
    }

    #[test]
    fn equals_shape_follows_field_type() {
        assert!(validate_rule(&rule_with(Condition::new(Field::InStock, Operator::Equals, true))).valid);
        assert!(!validate_rule(&rule_with(Condition::new(Field::InStock, Operator::Equals, "yes"))).valid);
        assert!(!validate_rule(&rule_with(Condition::new(Field::Price, Operator::Equals, "100"))).valid);
    }

    #[test]
    fn empty_and_all_disabled_warn() {
        let empty = validate_rule(&Rule::new("r", "r", Logic::Or).with_channels(["log"]));
        assert!(empty.valid);
        assert_eq!(empty.warnings.len(), 1);

        let disabled = validate_rule(&rule_with(
            Condition::new(Field::Price, Operator::Gte, 1.0).disabled(),
        ));
        assert!(disabled.valid);
        assert!(disabled.warnings.iter().any(|w| w.path == "conditions"));
    }
}
