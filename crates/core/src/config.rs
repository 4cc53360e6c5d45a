use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Engine config ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Active profile name (empty = default).
    pub profile: String,
    pub dedup: DedupConfig,
    pub rules: RulesConfig,
    pub audit: AuditConfig,
    pub default_currency: String,
}

impl EngineConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `BOARDWATCH_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("BOARDWATCH_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            dedup: DedupConfig::from_env_profiled(p),
            rules: RulesConfig::from_env_profiled(p),
            audit: AuditConfig::from_env_profiled(p),
            default_currency: profiled_env_or(p, "DEFAULT_CURRENCY", "RUB"),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  dedup:   ttl={}h, sweep every {}s",
            self.dedup.ttl_hours,
            self.dedup.sweep_interval_secs
        );
        tracing::info!(
            "  rules:   dir={}, default cooldown={}h",
            self.rules.dir.display(),
            self.rules.default_cooldown_hours
        );
        tracing::info!(
            "  audit:   max entries per rule={}, max dead letters={}",
            self.audit.max_entries_per_rule,
            self.audit.max_dead_letters
        );
        tracing::info!("  currency: {}", self.default_currency);
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profile: String::new(),
            dedup: DedupConfig::default(),
            rules: RulesConfig::default(),
            audit: AuditConfig::default(),
            default_currency: "RUB".to_string(),
        }
    }
}

// ── Dedup ─────────────────────────────────────────────────────

/// Below one hour, re-crawls of the same listing would pass the dedup gate.
pub const MIN_DEDUP_TTL_HOURS: u64 = 1;
/// One year.
pub const MAX_DEDUP_TTL_HOURS: u64 = 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// How long a signature stays "seen". Longer than any plausible
    /// re-observation interval of the same listing.
    pub ttl_hours: u64,
    pub sweep_interval_secs: u64,
}

impl DedupConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            ttl_hours: clamp_ttl_hours(profiled_env_u64(p, "DEDUP_TTL_HOURS", 72)),
            sweep_interval_secs: profiled_env_u64(p, "DEDUP_SWEEP_SECS", 3600),
        }
    }

    /// Clamped again here since the fields are public.
    pub fn ttl(&self) -> chrono::Duration {
        let hours = self.ttl_hours.clamp(MIN_DEDUP_TTL_HOURS, MAX_DEDUP_TTL_HOURS);
        chrono::Duration::hours(hours as i64)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

fn clamp_ttl_hours(hours: u64) -> u64 {
    let clamped = hours.clamp(MIN_DEDUP_TTL_HOURS, MAX_DEDUP_TTL_HOURS);
    if clamped != hours {
        tracing::warn!(
            requested = hours,
            effective = clamped,
            "DEDUP_TTL_HOURS out of range ({MIN_DEDUP_TTL_HOURS}..={MAX_DEDUP_TTL_HOURS}), clamped"
        );
    }
    clamped
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 72,
            sweep_interval_secs: 3600,
        }
    }
}

// ── Rules ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    pub dir: PathBuf,
    pub default_cooldown_hours: u32,
}

impl RulesConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            dir: PathBuf::from(profiled_env_or(p, "RULES_DIR", "data/rules")),
            default_cooldown_hours: profiled_env_u32(p, "DEFAULT_COOLDOWN_HOURS", 12),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/rules"),
            default_cooldown_hours: 12,
        }
    }
}

// ── Audit ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub max_entries_per_rule: usize,
    /// Oldest dead letters are dropped beyond this.
    pub max_dead_letters: usize,
}

impl AuditConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_entries_per_rule: profiled_env_u32(p, "AUDIT_MAX_ENTRIES", 500) as usize,
            max_dead_letters: profiled_env_u32(p, "DEAD_LETTER_MAX", 1000) as usize,
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_entries_per_rule: 500,
            max_dead_letters: 1000,
        }
    }
}
