//! Filesystem rule loader.
//!
//! Scans the rules directory for YAML rule files, keeps them in an in-memory
//! map keyed by rule id, and writes/deletes rule files atomically on behalf
//! of the dashboard.

mod core;
mod error;


pub use self::core::RuleLoader;
pub use self::error::{LoadResult, LoadStatus, Result, RuleError};
