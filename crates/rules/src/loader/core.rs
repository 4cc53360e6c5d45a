//! Core [`RuleLoader`] struct: filesystem-backed rule loading.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::schema::{Rule, DEFAULT_COOLDOWN_HOURS};
use crate::store::RuleStore;
use crate::validation::fuzzy::is_kebab_case;
use crate::validation::validate_rule;

use super::error::{LoadResult, LoadStatus, Result, RuleError};

/// Filesystem-backed rule store.
///
/// Scans a directory (recursively) for `*.yml` / `*.yaml` files, deserializes
/// each into a [`Rule`], and maintains an in-memory map keyed by rule id in
/// file discovery order.
pub struct RuleLoader {
    /// Root directory containing rule YAML files.
    rules_dir: PathBuf,
    /// Loaded rules keyed by `id`.
    rules: Arc<RwLock<IndexMap<String, Rule>>>,
    /// Cooldown applied to rule files that do not set one.
    default_cooldown_hours: u32,
}

impl RuleLoader {
    /// Create a new loader for the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist.
    pub fn new(rules_dir: PathBuf) -> Self {
        if !rules_dir.exists() {
            if let Err(e) = fs::create_dir_all(&rules_dir) {
                warn!(path = %rules_dir.display(), error = %e, "failed to create rules directory");
            }
        }
        Self {
            rules_dir,
            rules: Arc::new(RwLock::new(IndexMap::new())),
            default_cooldown_hours: DEFAULT_COOLDOWN_HOURS,
        }
    }

    /// Override the cooldown used for rule files without `cooldown_hours`.
    pub fn with_default_cooldown_hours(mut self, hours: u32) -> Self {
        self.default_cooldown_hours = hours;
        self
    }

    /// Rescan the rules directory and replace the in-memory rule set.
    ///
    /// Dotfiles and non-YAML files are skipped. Parse errors and duplicate
    /// ids are reported per file and do not abort the scan. Rules that fail
    /// validation are still loaded (the evaluator tolerates bad conditions)
    /// and their problems are logged.
    pub fn load_all(&self) -> Result<Vec<LoadResult>> {
        let mut results = Vec::new();
        let mut loaded = IndexMap::new();
        let mut origins = HashMap::new();
        self.scan_dir_recursive(&self.rules_dir, &mut loaded, &mut origins, &mut results)?;

        let count = loaded.len();
        *self.rules.write().expect("rules lock poisoned") = loaded;
        info!(path = %self.rules_dir.display(), count, "rules loaded");
        Ok(results)
    }

    fn scan_dir_recursive(
        &self,
        dir: &Path,
        loaded: &mut IndexMap<String, Rule>,
        origins: &mut HashMap<String, PathBuf>,
        results: &mut Vec<LoadResult>,
    ) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "failed to read directory");
                return Ok(());
            }
        };

        let mut paths = entries
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        paths.sort();

        for path in paths {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    if path.is_file() {
                        results.push(LoadResult {
                            path,
                            status: LoadStatus::Skipped {
                                reason: "dotfile".to_string(),
                            },
                        });
                    }
                    continue;
                }
            }

            if path.is_dir() {
                self.scan_dir_recursive(&path, loaded, origins, results)?;
                continue;
            }

            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "yml" || e == "yaml")
                .unwrap_or(false);

            if !is_yaml {
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped {
                        reason: "not a YAML file".to_string(),
                    },
                });
                continue;
            }

            let status = match self.load_file(&path) {
                Ok(rule) if loaded.contains_key(&rule.id) => {
                    let err = RuleError::DuplicateId {
                        first: origins.get(&rule.id).cloned().unwrap_or_default(),
                        rule_id: rule.id,
                    };
                    warn!(path = %path.display(), error = %err, "duplicate rule id");
                    LoadStatus::Failed {
                        error: err.to_string(),
                    }
                }
                Ok(rule) => {
                    let rule_id = rule.id.clone();
                    info!(rule_id = %rule_id, enabled = rule.enabled, path = %path.display(), "loaded rule");
                    origins.insert(rule_id.clone(), path.clone());
                    loaded.insert(rule_id.clone(), rule);
                    LoadStatus::Loaded { rule_id }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load rule file");
                    LoadStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            results.push(LoadResult { path, status });
        }

        Ok(())
    }

    /// Parse a single YAML rule file.
    pub fn load_file(&self, path: &Path) -> Result<Rule> {
        let contents = fs::read_to_string(path)?;
        let mut raw: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        if let serde_yaml::Value::Mapping(map) = &mut raw {
            let has_cooldown = map.contains_key("cooldown_hours") || map.contains_key("cooldownHours");
            if !has_cooldown {
                map.insert(
                    serde_yaml::Value::from("cooldown_hours"),
                    serde_yaml::Value::Number(u64::from(self.default_cooldown_hours).into()),
                );
            }
        }
        let rule: Rule = serde_yaml::from_value(raw)?;

        if rule.id.trim().is_empty() {
            return Err(RuleError::Validation("rule id must not be empty".to_string()));
        }

        let report = validate_rule(&rule);
        for e in &report.errors {
            warn!(rule_id = %rule.id, path = %e.path, "{}", e.message);
        }

        Ok(rule)
    }

    /// Get the rules directory path.
    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Snapshot of all loaded rules in discovery order.
    pub fn rules(&self) -> Vec<Rule> {
        self.rules
            .read()
            .expect("rules lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Validate and atomically write a rule to `<id>.yml`.
    ///
    /// Writes to a `.tmp` file first, then renames to the final path to
    /// avoid partial writes on crash. Rules with validation errors are
    /// rejected.
    pub fn write_rule(&self, rule: &Rule) -> Result<PathBuf> {
        ensure_file_id(&rule.id)?;
        let report = validate_rule(rule);
        if !report.valid {
            let messages: Vec<String> = report
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.path, e.message))
                .collect();
            return Err(RuleError::Validation(messages.join("; ")));
        }

        let final_path = self.rules_dir.join(format!("{}.yml", rule.id));
        let tmp_path = self.rules_dir.join(format!(".{}.tmp", rule.id));

        let yaml = serde_yaml::to_string(rule)?;
        fs::write(&tmp_path, yaml)?;
        fs::rename(&tmp_path, &final_path)?;

        info!(rule_id = %rule.id, path = %final_path.display(), "wrote rule file");

        self.rules
            .write()
            .expect("rules lock poisoned")
            .insert(rule.id.clone(), rule.clone());
        Ok(final_path)
    }

    /// Delete a rule file by rule ID.
    ///
    /// Removes both the file and the in-memory entry.
    pub fn delete_rule(&self, id: &str) -> Result<()> {
        ensure_file_id(id)?;
        let candidates = [
            self.rules_dir.join(format!("{id}.yml")),
            self.rules_dir.join(format!("{id}.yaml")),
        ];

        let Some(path) = candidates.iter().find(|p| p.exists()) else {
            return Err(RuleError::Validation(format!(
                "no rule file found for id '{id}'"
            )));
        };
        fs::remove_file(path)?;

        self.rules
            .write()
            .expect("rules lock poisoned")
            .shift_remove(id);

        info!(rule_id = %id, "deleted rule");
        Ok(())
    }
}

/// Rule ids become file names; anything but kebab-case could leave `rules_dir`.
fn ensure_file_id(id: &str) -> Result<()> {
    if is_kebab_case(id) {
        Ok(())
    } else {
        Err(RuleError::Validation(format!(
            "rule id '{id}' is not kebab-case and cannot name a rule file"
        )))
    }
}

#[async_trait::async_trait]
impl RuleStore for RuleLoader {
    async fn all(&self) -> Result<Vec<Rule>> {
        Ok(self.rules())
    }

    async fn get(&self, id: &str) -> Result<Option<Rule>> {
        Ok(self
            .rules
            .read()
            .expect("rules lock poisoned")
            .get(id)
            .cloned())
    }
}
