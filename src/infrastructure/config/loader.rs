use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::collections::HashSet;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::{MAX_CAPACITY, MIN_CAPACITY};
use crate::services::circuit_breaker::{MAX_COOLDOWN_MULTIPLIER, MAX_COOLDOWN_SECS};

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid capacity for {0}: {1}. Must be between 5 and 9")]
    InvalidCapacity(String, u8),

    #[error("Invalid weight for profile '{profile}' feature '{feature}': {weight}. Must be finite and non-negative")]
    InvalidWeight {
        profile: String,
        feature: String,
        weight: f64,
    },

    #[error("Invalid overload threshold for profile '{0}': {1}. Must be positive")]
    InvalidThreshold(String, f64),

    #[error("Duplicate profile name: {0}")]
    DuplicateProfile(String),

    #[error("Invalid flow alpha: {0}. Must be in (0, 1]")]
    InvalidAlpha(f64),

    #[error("Invalid baseline_fraction: {0}. Must be in [0, 0.7)")]
    InvalidBaseline(f64),

    #[error("Invalid {0}: {1}. Must be at least 2")]
    InvalidHistoryLimit(&'static str, usize),

    #[error("Invalid cooldown_secs: {0}. Must be between 1 and 86400")]
    InvalidCooldown(u64),

    #[error("Invalid max_cooldown_multiplier: {0}. Must be between 1 and 100")]
    InvalidMultiplier(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .loadgate/config.yaml (project config)
    /// 3. .loadgate/local.yaml (project local overrides, optional)
    /// 4. Environment variables (LOADGATE_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment()
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".loadgate/config.yaml"))
            .merge(Yaml::file(".loadgate/local.yaml"))
            .merge(Env::prefixed("LOADGATE_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let capacity_range = MIN_CAPACITY..=MAX_CAPACITY;

        // Governor
        if !capacity_range.contains(&config.governor.default_capacity) {
            return Err(ConfigError::InvalidCapacity(
                "governor.default_capacity".to_string(),
                config.governor.default_capacity,
            ));
        }
        if config.governor.history_limit < 2 {
            return Err(ConfigError::InvalidHistoryLimit(
                "governor.history_limit",
                config.governor.history_limit,
            ));
        }
        let baseline = config.governor.baseline_fraction;
        if !(0.0..0.7).contains(&baseline) {
            return Err(ConfigError::InvalidBaseline(baseline));
        }

        // Breaker
        if config.breaker.cooldown_secs == 0 || config.breaker.cooldown_secs > MAX_COOLDOWN_SECS {
            return Err(ConfigError::InvalidCooldown(config.breaker.cooldown_secs));
        }
        let multiplier = config.breaker.max_cooldown_multiplier;
        if multiplier == 0 || multiplier > MAX_COOLDOWN_MULTIPLIER {
            return Err(ConfigError::InvalidMultiplier(multiplier));
        }
        if config.breaker.reroute_after_trips == 0 {
            return Err(ConfigError::ValidationFailed(
                "breaker.reroute_after_trips must be at least 1".to_string(),
            ));
        }

        // Flow
        let alpha = config.flow.alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(ConfigError::InvalidAlpha(alpha));
        }
        if config.flow.history_limit < 2 {
            return Err(ConfigError::InvalidHistoryLimit(
                "flow.history_limit",
                config.flow.history_limit,
            ));
        }

        // Logging
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        // Profiles
        let mut seen = HashSet::new();
        for profile in &config.profiles {
            if profile.name.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "profile name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(profile.name.as_str()) {
                return Err(ConfigError::DuplicateProfile(profile.name.clone()));
            }
            if !capacity_range.contains(&profile.capacity) {
                return Err(ConfigError::InvalidCapacity(
                    format!("profile '{}'", profile.name),
                    profile.capacity,
                ));
            }
            if let Some(threshold) = profile.overload_threshold {
                if !threshold.is_finite() || threshold <= 0.0 {
                    return Err(ConfigError::InvalidThreshold(profile.name.clone(), threshold));
                }
            }
            if let Some((feature, weight)) = profile
                .weights
                .iter()
                .find(|(_, w)| !w.is_finite() || **w < 0.0)
            {
                return Err(ConfigError::InvalidWeight {
                    profile: profile.name.clone(),
                    feature: feature.clone(),
                    weight: *weight,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::config::{BreakerScopeKind, LogFormat, ProfileConfig};
    use std::collections::BTreeMap;

    fn profile(name: &str, capacity: u8) -> ProfileConfig {
        ProfileConfig {
            name: name.to_string(),
            capacity,
            overload_threshold: None,
            weights: BTreeMap::new(),
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.governor.default_capacity, 7);
        assert_eq!(config.breaker.cooldown_secs, 30);
        assert!((config.flow.alpha - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
governor:
  default_capacity: 5
  compress_on_trip: false
breaker:
  scope: domain
  cooldown_secs: 10
logging:
  level: debug
  format: pretty
profiles:
  - name: support
    capacity: 7
    weights:
      word_count: 1.0
      questions: 1.5
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.governor.default_capacity, 5);
        assert!(!config.governor.compress_on_trip);
        assert_eq!(config.breaker.scope, BreakerScopeKind::Domain);
        assert_eq!(config.breaker.cooldown_secs, 10);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.profiles.len(), 1);
        assert!((config.profiles[0].weights["questions"] - 1.5).abs() < f64::EPSILON);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_default_capacity_range() {
        let mut config = Config::default();
        config.governor.default_capacity = 4;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidCapacity(_, 4))
        ));

        config.governor.default_capacity = 10;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidCapacity(_, 10))
        ));
    }

    #[test]
    fn test_validate_profile_capacity() {
        let mut config = Config::default();
        config.profiles.push(profile("support", 12));
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidCapacity(_, 12))
        ));
    }

    #[test]
    fn test_validate_negative_weight() {
        let mut config = Config::default();
        let mut p = profile("support", 7);
        p.weights.insert("questions".to_string(), -1.0);
        config.profiles.push(p);

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidWeight { feature, .. } => assert_eq!(feature, "questions"),
            other => panic!("Expected InvalidWeight error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_threshold() {
        let mut config = Config::default();
        let mut p = profile("support", 7);
        p.overload_threshold = Some(0.0);
        config.profiles.push(p);
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidThreshold(_, _))
        ));
    }

    #[test]
    fn test_validate_duplicate_profiles() {
        let mut config = Config::default();
        config.profiles.push(profile("support", 7));
        config.profiles.push(profile("support", 8));
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::DuplicateProfile(name)) if name == "support"
        ));
    }

    #[test]
    fn test_validate_alpha() {
        for alpha in [0.0, -0.1, 1.5, f64::NAN] {
            let mut config = Config::default();
            config.flow.alpha = alpha;
            assert!(
                matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidAlpha(_))),
                "alpha {alpha} should be rejected"
            );
        }
        let mut config = Config::default();
        config.flow.alpha = 1.0;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_baseline() {
        let mut config = Config::default();
        config.governor.baseline_fraction = 0.7;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBaseline(_))
        ));
        config.governor.baseline_fraction = 0.0;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_history_limits() {
        let mut config = Config::default();
        config.governor.history_limit = 1;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidHistoryLimit("governor.history_limit", 1))
        ));

        let mut config = Config::default();
        config.flow.history_limit = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidHistoryLimit("flow.history_limit", 0))
        ));
    }

    #[test]
    fn test_validate_breaker() {
        let mut config = Config::default();
        config.breaker.cooldown_secs = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidCooldown(0))
        ));

        let mut config = Config::default();
        config.breaker.max_cooldown_multiplier = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMultiplier(0))
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_log_format_fails_extraction() {
        let yaml = "logging:\n  format: xml\n";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_env_override() {
        temp_env::with_vars(
            [
                ("LOADGATE_BREAKER__COOLDOWN_SECS", Some("45")),
                ("LOADGATE_LOGGING__LEVEL", Some("debug")),
            ],
            || {
                let config: Config = ConfigLoader::figment().extract().unwrap();
                assert_eq!(config.breaker.cooldown_secs, 45);
                assert_eq!(config.logging.level, "debug");
                ConfigLoader::validate(&config).unwrap();
            },
        );
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "breaker:\n  cooldown_secs: 12\nprofiles:\n  - name: installer\n    capacity: 5"
        )
        .unwrap();
        file.flush().unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.breaker.cooldown_secs, 12);
        assert_eq!(config.profiles[0].name, "installer");
        assert_eq!(config.profiles[0].capacity, 5);
    }

    #[test]
    fn test_load_from_file_rejects_invalid() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "governor:\n  default_capacity: 3").unwrap();
        file.flush().unwrap();

        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_hierarchical_merging() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "breaker:\n  cooldown_secs: 20\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "breaker:\n  cooldown_secs: 60\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.breaker.cooldown_secs, 60, "Override should win");
        assert_eq!(
            config.logging.level, "debug",
            "Override should win for nested fields"
        );
        assert_eq!(
            config.logging.format,
            LogFormat::Json,
            "Base value should persist when not overridden"
        );
        assert_eq!(config.breaker.max_cooldown_multiplier, 5);
    }
}
