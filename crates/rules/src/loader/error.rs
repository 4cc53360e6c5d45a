//! Loader errors and per-file scan outcomes.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The rule parsed but is not acceptable (empty id, failed checks on write).
    #[error("Invalid rule: {0}")]
    Validation(String),

    /// Two files in one scan declare the same rule id.
    #[error("Duplicate rule id '{rule_id}' (first defined in {})", .first.display())]
    DuplicateId { rule_id: String, first: PathBuf },

    /// The backing rule store could not be read.
    #[error("Rule store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, RuleError>;

/// What happened to one file during a directory scan.
#[derive(Debug)]
pub struct LoadResult {
    pub path: PathBuf,
    pub status: LoadStatus,
}

impl LoadResult {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, LoadStatus::Failed { .. })
    }
}

#[derive(Debug)]
pub enum LoadStatus {
    Loaded { rule_id: String },
    /// Dotfile or non-YAML file.
    Skipped { reason: String },
    /// Unparseable file, rejected rule, or duplicate id. The rest of the scan continues.
    Failed { error: String },
}
