//! Controller configuration structures.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::util::serde::ResourceAmounts;

/// Environment variable holding the CPU capacity.
pub const ENV_CPU_CAPACITY: &str = "ADMISSION_CPU_CAPACITY";
/// Environment variable holding the RAM capacity.
pub const ENV_RAM_CAPACITY: &str = "ADMISSION_RAM_CAPACITY";
/// Environment variable holding the disk capacity.
pub const ENV_DISK_CAPACITY: &str = "ADMISSION_DISK_CAPACITY";
/// Environment variable selecting the grant policy.
pub const ENV_POLICY: &str = "ADMISSION_POLICY";
/// Environment variable selecting the evaluation mode.
pub const ENV_EVALUATION: &str = "ADMISSION_EVALUATION";
/// Environment variable selecting the audit backend.
pub const ENV_AUDIT: &str = "ADMISSION_AUDIT";

/// How queue heads are compared on each evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantPolicy {
    /// Test the High head, then the Low head, independently. A satisfiable Low
    /// head is granted even while an unsatisfiable High request waits.
    #[default]
    SkipAhead,
    /// Never grant Low while any High request is queued.
    StrictPriority,
}

impl FromStr for GrantPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip_ahead" => Ok(Self::SkipAhead),
            "strict_priority" => Ok(Self::StrictPriority),
            other => Err(format!("unknown grant policy `{other}`")),
        }
    }
}

/// How many grants one `request`/`release` call may produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// At most one grant per call.
    #[default]
    Single,
    /// Keep granting until no queue head fits.
    Drain,
}

impl FromStr for EvaluationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "drain" => Ok(Self::Drain),
            other => Err(format!("unknown evaluation mode `{other}`")),
        }
    }
}

/// Audit backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditBackendConfig {
    /// No audit trail.
    #[default]
    Disabled,
    /// Emit audit events as tracing lines.
    Tracing,
}

impl FromStr for AuditBackendConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" | "none" => Ok(Self::Disabled),
            "tracing" => Ok(Self::Tracing),
            other => Err(format!("unknown audit backend `{other}`")),
        }
    }
}

/// Controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Compute slot capacity.
    pub cpu_capacity: u32,
    /// Memory unit capacity.
    pub ram_capacity: u32,
    /// Storage unit capacity.
    pub disk_capacity: u32,
    /// Grant policy.
    #[serde(default)]
    pub policy: GrantPolicy,
    /// Evaluation mode.
    #[serde(default)]
    pub evaluation: EvaluationMode,
    /// Audit backend.
    #[serde(default)]
    pub audit: AuditBackendConfig,
}

impl ControllerConfig {
    /// Configuration with default policy, single evaluation and no audit.
    #[must_use]
    pub fn new(cpu_capacity: u32, ram_capacity: u32, disk_capacity: u32) -> Self {
        Self {
            cpu_capacity,
            ram_capacity,
            disk_capacity,
            policy: GrantPolicy::default(),
            evaluation: EvaluationMode::default(),
            audit: AuditBackendConfig::default(),
        }
    }

    /// Set the grant policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: GrantPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the evaluation mode.
    #[must_use]
    pub const fn with_evaluation(mut self, evaluation: EvaluationMode) -> Self {
        self.evaluation = evaluation;
        self
    }

    /// Set the audit backend.
    #[must_use]
    pub const fn with_audit(mut self, audit: AuditBackendConfig) -> Self {
        self.audit = audit;
        self
    }

    /// Capacities as amounts.
    #[must_use]
    pub const fn capacities(&self) -> ResourceAmounts {
        ResourceAmounts::new(self.cpu_capacity, self.ram_capacity, self.disk_capacity)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns a message naming the first zero capacity.
    pub fn validate(&self) -> Result<(), String> {
        for (kind, capacity) in self.capacities().iter() {
            if capacity == 0 {
                return Err(format!("{kind}_capacity must be greater than 0"));
            }
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    /// Parse failures and validation failures, as messages.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read configuration from the process environment, loading `.env` first.
    ///
    /// # Errors
    /// Missing or malformed variables, or validation failures.
    pub fn from_env() -> Result<Self, String> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), but every capacity defaults to
    /// `default` when none of the capacity variables is set.
    ///
    /// # Errors
    /// Partially set, malformed or invalid values.
    pub fn from_env_with_default_capacity(default: u32) -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup_with_default_capacity(|key| std::env::var(key).ok(), default)
    }

    /// [`from_lookup`](Self::from_lookup) with every capacity defaulting to
    /// `default` when none of the capacity keys is present.
    ///
    /// # Errors
    /// Partially set, malformed or invalid values.
    pub fn from_lookup_with_default_capacity<F>(lookup: F, default: u32) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let capacity_keys = [ENV_CPU_CAPACITY, ENV_RAM_CAPACITY, ENV_DISK_CAPACITY];
        let unset = capacity_keys.iter().all(|&key| lookup(key).is_none());
        if unset {
            tracing::info!(units = default, "no capacities configured, using defaults");
        }
        Self::from_lookup(|key: &str| {
            lookup(key).or_else(|| {
                (unset && capacity_keys.iter().any(|k| *k == key)).then(|| default.to_string())
            })
        })
    }

    /// Build configuration from an arbitrary key lookup using the
    /// `ADMISSION_*` variable names.
    ///
    /// # Errors
    /// Missing or malformed values, or validation failures.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let capacity = |key: &str| -> Result<u32, String> {
            let raw = lookup(key).ok_or_else(|| format!("{key} is not set"))?;
            raw.trim()
                .parse::<u32>()
                .map_err(|e| format!("{key}={raw:?} is not a valid capacity: {e}"))
        };
        let mut cfg = Self::new(
            capacity(ENV_CPU_CAPACITY)?,
            capacity(ENV_RAM_CAPACITY)?,
            capacity(ENV_DISK_CAPACITY)?,
        );
        if let Some(policy) = lookup(ENV_POLICY) {
            cfg.policy = policy.parse()?;
        }
        if let Some(evaluation) = lookup(ENV_EVALUATION) {
            cfg.evaluation = evaluation.parse()?;
        }
        if let Some(audit) = lookup(ENV_AUDIT) {
            cfg.audit = audit.parse()?;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
