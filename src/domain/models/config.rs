use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::profile::{WeightProfile, DEFAULT_CAPACITY};
use crate::domain::errors::GovernorResult;

/// Main configuration structure for Loadgate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Working-memory accounting
    #[serde(default)]
    pub governor: GovernorConfig,

    /// Circuit breaker policy
    #[serde(default)]
    pub breaker: BreakerConfig,

    /// Flow-state smoothing
    #[serde(default)]
    pub flow: FlowConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Weight profiles keyed by domain/persona name
    #[serde(default)]
    pub profiles: Vec<ProfileConfig>,
}

/// Working-memory accounting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GovernorConfig {
    /// Capacity for phases started without an explicit one (5-9)
    #[serde(default = "default_capacity")]
    pub default_capacity: u8,

    /// Number of scores kept per session
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Post-trip load as a fraction of capacity
    #[serde(default = "default_baseline_fraction")]
    pub baseline_fraction: f64,

    /// Compact session history when the breaker trips
    #[serde(default = "default_true")]
    pub compress_on_trip: bool,
}

const fn default_capacity() -> u8 {
    DEFAULT_CAPACITY
}

const fn default_history_limit() -> usize {
    50
}

const fn default_baseline_fraction() -> f64 {
    0.4
}

const fn default_true() -> bool {
    true
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            default_capacity: default_capacity(),
            history_limit: default_history_limit(),
            baseline_fraction: default_baseline_fraction(),
            compress_on_trip: default_true(),
        }
    }
}

/// Whether breakers are per session or shared per domain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerScopeKind {
    #[default]
    Session,
    Domain,
}

/// Circuit breaker policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BreakerConfig {
    /// When disabled, overflow only produces `simplify` verdicts
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Breaker ownership
    #[serde(default)]
    pub scope: BreakerScopeKind,

    /// Base cooldown before a probe is allowed
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Cap on cooldown growth, as a multiple of the base cooldown
    #[serde(default = "default_max_cooldown_multiplier")]
    pub max_cooldown_multiplier: u32,

    /// Trips after which the recovery action becomes `reroute`
    #[serde(default = "default_reroute_after_trips")]
    pub reroute_after_trips: u32,
}

const fn default_cooldown_secs() -> u64 {
    30
}

const fn default_max_cooldown_multiplier() -> u32 {
    5
}

const fn default_reroute_after_trips() -> u32 {
    3
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            scope: BreakerScopeKind::default(),
            cooldown_secs: default_cooldown_secs(),
            max_cooldown_multiplier: default_max_cooldown_multiplier(),
            reroute_after_trips: default_reroute_after_trips(),
        }
    }
}

/// Flow-state smoothing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FlowConfig {
    /// Weight of the newest reading in the moving average
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Snapshots retained per tracker
    #[serde(default = "default_flow_history_limit")]
    pub history_limit: usize,
}

const fn default_alpha() -> f64 {
    0.3
}

const fn default_flow_history_limit() -> usize {
    256
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            history_limit: default_flow_history_limit(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Log file rotation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for JSON log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation for file output
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}

/// Weight profile as it appears in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProfileConfig {
    /// Domain or persona name
    pub name: String,

    /// Working-memory capacity (5-9)
    #[serde(default = "default_capacity")]
    pub capacity: u8,

    /// Overflow threshold; defaults to the capacity
    #[serde(default)]
    pub overload_threshold: Option<f64>,

    /// Feature name to non-negative weight
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
}

impl ProfileConfig {
    /// Build the validated immutable profile.
    pub fn to_profile(&self) -> GovernorResult<WeightProfile> {
        let profile = WeightProfile::new(self.name.clone(), self.capacity, self.weights.clone())?;
        match self.overload_threshold {
            Some(threshold) => profile.with_overload_threshold(threshold),
            None => Ok(profile),
        }
    }
}
