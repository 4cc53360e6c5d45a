//! Alert rule definitions and matching.
//!
//! This crate provides:
//! - Rule, condition, field and operator types with serde (YAML and dashboard JSON)
//! - A pure evaluator shared by live ingest and preview
//! - Dry-run preview over a batch of events
//! - Rule validation with "did you mean" suggestions
//! - Filesystem loader and the [`RuleStore`] read interface

pub mod evaluator;
pub mod loader;
pub mod preview;
pub mod schema;
pub mod store;
pub mod validation;

pub use evaluator::{RuleEvaluator, RuleMatch};
pub use loader::{RuleError, RuleLoader};
pub use preview::{preview, sample_events, PreviewReport, PreviewResult};
pub use schema::{Condition, ConditionValue, Field, Logic, Operator, Rule};
pub use store::{InMemoryRuleStore, RuleStore};
