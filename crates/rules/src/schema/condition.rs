//! Condition predicate and its value shapes.

use serde::{Deserialize, Serialize};

use super::{default_true, Field, Operator};

/// One field/operator/value predicate within a rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    pub field: Field,
    #[serde(alias = "op")]
    pub operator: Operator,
    #[serde(default)]
    pub value: ConditionValue,
    /// A disabled condition passes vacuously.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Condition {
    pub fn new(field: Field, operator: Operator, value: impl Into<ConditionValue>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A single comparable value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Condition operand: a scalar, a list, or a `[lo, hi]` pair for `between`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ConditionValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<Scalar>),
}

impl ConditionValue {
    pub fn as_list(&self) -> Option<&[Scalar]> {
        match self {
            ConditionValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// The `[lo, hi]` bounds of a two-element numeric list.
    pub fn as_range(&self) -> Option<(f64, f64)> {
        match self.as_list()? {
            [lo, hi] => Some((lo.as_number()?, hi.as_number()?)),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ConditionValue::Null => "null",
            ConditionValue::Bool(_) => "boolean",
            ConditionValue::Number(_) => "number",
            ConditionValue::Text(_) => "string",
            ConditionValue::List(_) => "list",
        }
    }
}

impl From<bool> for ConditionValue {
    fn from(v: bool) -> Self {
        ConditionValue::Bool(v)
    }
}

impl From<f64> for ConditionValue {
    fn from(v: f64) -> Self {
        ConditionValue::Number(v)
    }
}

impl From<&str> for ConditionValue {
    fn from(v: &str) -> Self {
        ConditionValue::Text(v.to_string())
    }
}

impl From<String> for ConditionValue {
    fn from(v: String) -> Self {
        ConditionValue::Text(v)
    }
}

impl From<Vec<&str>> for ConditionValue {
    fn from(v: Vec<&str>) -> Self {
        ConditionValue::List(v.into_iter().map(|s| Scalar::Text(s.to_string())).collect())
    }
}

impl From<Vec<f64>> for ConditionValue {
    fn from(v: Vec<f64>) -> Self {
        ConditionValue::List(v.into_iter().map(Scalar::Number).collect())
    }
}

impl From<[f64; 2]> for ConditionValue {
    fn from(v: [f64; 2]) -> Self {
        ConditionValue::List(v.into_iter().map(Scalar::Number).collect())
    }
}
