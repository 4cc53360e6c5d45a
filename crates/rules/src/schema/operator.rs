//! Comparison operators usable in conditions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator of a condition. Which operators are legal depends on
/// the field, see [`super::Field::allowed_operators`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Strict equality. `=` is accepted as an alias.
    #[serde(alias = "=")]
    Equals,
    /// Case-insensitive substring.
    Contains,
    /// Any of the listed substrings (or, for list fields, any listed element).
    ContainsAny,
    /// Every listed element present in a list field.
    ContainsAll,
    /// Case-insensitive prefix.
    StartsWith,
    /// Scalar field value is one of the listed values.
    In,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    /// Inclusive `[lo, hi]` range.
    Between,
}

impl Operator {
    pub const ALL: [Operator; 9] = [
        Operator::Equals,
        Operator::Contains,
        Operator::ContainsAny,
        Operator::ContainsAll,
        Operator::StartsWith,
        Operator::In,
        Operator::Gte,
        Operator::Lte,
        Operator::Between,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::Contains => "contains",
            Operator::ContainsAny => "contains_any",
            Operator::ContainsAll => "contains_all",
            Operator::StartsWith => "starts_with",
            Operator::In => "in",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Between => "between",
        }
    }

    /// Operators whose value must be a list.
    pub fn takes_list(&self) -> bool {
        matches!(
            self,
            Operator::ContainsAny | Operator::ContainsAll | Operator::In | Operator::Between
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
