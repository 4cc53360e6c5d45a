//! Alert engine: dedup, rule matching, cooldown and notification fan-out.
//!
//! This crate provides:
//! - `DedupStore` with an atomic test-and-set on event signatures
//! - `CooldownStore` enforcing at most one fire per rule per window
//! - `Engine` coordinating the live ingest path and the dry-run preview
//! - Dead-letter queue and per-rule audit log

pub mod audit_log;
pub mod cooldown;
pub mod coordinator;
pub mod dead_letter;
pub mod dedup;
pub mod error;
pub mod report;

pub use coordinator::Engine;
pub use cooldown::{CooldownState, CooldownStore, FireDecision, InMemoryCooldownStore};
pub use dedup::{DedupStore, InMemoryDedupStore};
pub use error::{CooldownError, DedupError, IngestError};
pub use report::{IngestReport, RuleOutcome, RuleReport};
