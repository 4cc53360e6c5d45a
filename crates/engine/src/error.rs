//! Error types for the ingest pipeline and its state stores.

use boardwatch_core::CoreError;
use boardwatch_rules::RuleError;

/// Dedup store could not answer. The event must not be treated as new.
#[derive(Debug, thiserror::Error)]
pub enum DedupError {
    #[error("Dedup store unavailable: {0}")]
    Unavailable(String),
}

/// Cooldown store could not answer. The match must not be dispatched.
#[derive(Debug, thiserror::Error)]
pub enum CooldownError {
    #[error("Cooldown store unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a whole `ingest` call for one event.
///
/// Per-rule and per-channel failures are reported inside the
/// [`IngestReport`](crate::coordinator::IngestReport) instead.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    InvalidEvent(#[from] CoreError),

    /// The event was dead-lettered and not marked as seen; the caller may retry.
    #[error("Dedup check failed, event dead-lettered: {0}")]
    DedupUnavailable(#[source] DedupError),

    /// Rules could not be read; the event was not marked as seen.
    #[error("Rule store failed: {0}")]
    RuleStore(#[from] RuleError),
}
