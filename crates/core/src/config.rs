use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CadenceError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Load a specific env file. Unlike [`load_dotenv`], a missing file is an error.
pub fn load_dotenv_from(path: &Path) -> Result<(), CadenceError> {
    dotenvy::from_path(path).map_err(|e| match e {
        dotenvy::Error::Io(io) => CadenceError::Io(io),
        other => CadenceError::Other(other.to_string()),
    })
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

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub scheduler: SchedulerConfig,
    pub log: LogConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `CADENCE_PROFILE`. When set (e.g. `STAGING`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("CADENCE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            scheduler: SchedulerConfig::from_env_profiled(p),
            log: LogConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Reject values the scheduler cannot represent.
    pub fn validate(&self) -> Result<(), CadenceError> {
        self.scheduler.validate()
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  scheduler:   duration_bits={}, weight_bits={}",
            self.scheduler.duration_bits,
            self.scheduler.weight_bits
        );
        tracing::info!("  log:         filter={}", self.log.filter);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: String::new(),
            scheduler: SchedulerConfig::default(),
            log: LogConfig::default(),
        }
    }
}

// ── Scheduler ─────────────────────────────────────────────────

/// Storage widths for cycle fields. Proposals that do not fit are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Bits available for a cycle duration (1..=64).
    pub duration_bits: u32,
    /// Bits available for a cycle weight (1..=127).
    pub weight_bits: u32,
}

pub const DEFAULT_DURATION_BITS: u32 = 64;
pub const DEFAULT_WEIGHT_BITS: u32 = 88;

impl SchedulerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            duration_bits: profiled_env_u32(p, "CYCLE_DURATION_BITS", DEFAULT_DURATION_BITS),
            weight_bits: profiled_env_u32(p, "CYCLE_WEIGHT_BITS", DEFAULT_WEIGHT_BITS),
        }
    }

    pub fn validate(&self) -> Result<(), CadenceError> {
        if !(1..=64).contains(&self.duration_bits) {
            return Err(CadenceError::InvalidConfig {
                key: "CYCLE_DURATION_BITS".to_string(),
                value: self.duration_bits.to_string(),
                reason: "must be between 1 and 64".to_string(),
            });
        }
        if !(1..=127).contains(&self.weight_bits) {
            return Err(CadenceError::InvalidConfig {
                key: "CYCLE_WEIGHT_BITS".to_string(),
                value: self.weight_bits.to_string(),
                reason: "must be between 1 and 127".to_string(),
            });
        }
        Ok(())
    }

    /// Largest duration that fits `duration_bits`.
    pub fn max_duration(&self) -> u64 {
        let bits = self.duration_bits.clamp(1, 64);
        if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 }
    }

    /// Largest weight that fits `weight_bits`.
    pub fn max_weight(&self) -> u128 {
        let bits = self.weight_bits.clamp(1, 127);
        (1u128 << bits) - 1
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            duration_bits: DEFAULT_DURATION_BITS,
            weight_bits: DEFAULT_WEIGHT_BITS,
        }
    }
}

// ── Logging ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl LogConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            filter: profiled_env_or(p, "LOG_FILTER", "info"),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
