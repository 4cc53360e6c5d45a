//! Alert rule schema types with serde deserialization.
//!
//! Defines the rule model shared by the live pipeline, the preview path and
//! the dashboard:
//! - `Rule`: a named AND/OR policy over conditions plus dispatch settings
//! - `Condition`: one field/operator/value predicate
//! - `Field` / `Operator`: the typed vocabulary and which pairs are legal
//!
//! Rules serialize the same way in YAML files and in dashboard JSON.

mod condition;
mod field;
mod operator;
mod rule;

pub use condition::*;
pub use field::*;
pub use operator::*;
pub use rule::*;

pub(crate) fn default_true() -> bool {
    true
}
