use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::errors::{GovernorError, GovernorResult};

/// Smallest working-memory capacity a profile or session may declare.
pub const MIN_CAPACITY: u8 = 5;
/// Largest working-memory capacity a profile or session may declare.
pub const MAX_CAPACITY: u8 = 9;
/// Capacity used when nothing else is configured (7±2).
pub const DEFAULT_CAPACITY: u8 = 7;
/// Name of the built-in fallback profile.
pub const DEFAULT_PROFILE_NAME: &str = "default";

/// Validate a working-memory capacity.
pub fn check_capacity(capacity: u8) -> GovernorResult<u8> {
    if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
        Err(GovernorError::InvalidCapacity(capacity))
    } else {
        Ok(capacity)
    }
}

/// Immutable weights for one domain or persona.
///
/// Profiles are validated on construction and never mutated afterwards; the
/// registry replaces them wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightProfile {
    name: String,
    capacity: u8,
    overload_threshold: f64,
    weights: BTreeMap<String, f64>,
    /// Weight applied to features the profile does not name.
    fallback_weight: f64,
}

impl WeightProfile {
    /// Create a profile. Weights must be finite and non-negative.
    pub fn new(
        name: impl Into<String>,
        capacity: u8,
        weights: BTreeMap<String, f64>,
    ) -> GovernorResult<Self> {
        let name = name.into();
        check_capacity(capacity)?;

        if name.trim().is_empty() {
            return Err(GovernorError::InvalidProfile {
                name,
                reason: "name cannot be empty".to_string(),
            });
        }

        if let Some((feature, weight)) = weights.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
            return Err(GovernorError::InvalidProfile {
                reason: format!("weight for '{feature}' must be finite and non-negative, got {weight}"),
                name,
            });
        }

        Ok(Self {
            name,
            capacity,
            overload_threshold: f64::from(capacity),
            weights,
            fallback_weight: 0.0,
        })
    }

    /// Override the accumulated load at which a session counts as overflowed.
    pub fn with_overload_threshold(mut self, threshold: f64) -> GovernorResult<Self> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(GovernorError::InvalidProfile {
                name: self.name,
                reason: format!("overload threshold must be positive, got {threshold}"),
            });
        }
        self.overload_threshold = threshold;
        Ok(self)
    }

    /// The built-in fallback: capacity 7, every feature weighted 1.0.
    pub fn builtin_default() -> Self {
        Self {
            name: DEFAULT_PROFILE_NAME.to_string(),
            capacity: DEFAULT_CAPACITY,
            overload_threshold: f64::from(DEFAULT_CAPACITY),
            weights: BTreeMap::new(),
            fallback_weight: 1.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn capacity(&self) -> u8 {
        self.capacity
    }

    pub const fn overload_threshold(&self) -> f64 {
        self.overload_threshold
    }

    pub const fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    /// Weight for a feature; features the profile does not name get the
    /// fallback weight (0 for configured profiles).
    pub fn weight(&self, feature: &str) -> f64 {
        self.weights
            .get(feature)
            .copied()
            .unwrap_or(self.fallback_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    #[test]
    fn test_new_profile_defaults_threshold_to_capacity() {
        let profile = WeightProfile::new("support", 7, weights(&[("word_count", 1.0)])).unwrap();
        assert_eq!(profile.capacity(), 7);
        assert!((profile.overload_threshold() - 7.0).abs() < f64::EPSILON);
        assert!((profile.weight("word_count") - 1.0).abs() < f64::EPSILON);
        assert!(profile.weight("unknown").abs() < f64::EPSILON);
    }

    #[test]
    fn test_capacity_bounds() {
        assert!(matches!(
            WeightProfile::new("x", 4, BTreeMap::new()),
            Err(GovernorError::InvalidCapacity(4))
        ));
        assert!(matches!(
            WeightProfile::new("x", 10, BTreeMap::new()),
            Err(GovernorError::InvalidCapacity(10))
        ));
        assert!(WeightProfile::new("x", 5, BTreeMap::new()).is_ok());
        assert!(WeightProfile::new("x", 9, BTreeMap::new()).is_ok());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let result = WeightProfile::new("x", 7, weights(&[("questions", -1.5)]));
        match result {
            Err(GovernorError::InvalidProfile { name, reason }) => {
                assert_eq!(name, "x");
                assert!(reason.contains("questions"));
            }
            other => panic!("Expected InvalidProfile, got {other:?}"),
        }
    }

    #[test]
    fn test_threshold_must_be_positive() {
        let profile = WeightProfile::new("x", 7, BTreeMap::new()).unwrap();
        assert!(profile.clone().with_overload_threshold(0.0).is_err());
        let profile = profile.with_overload_threshold(6.5).unwrap();
        assert!((profile.overload_threshold() - 6.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_builtin_default_uses_unit_weights() {
        let profile = WeightProfile::builtin_default();
        assert_eq!(profile.name(), DEFAULT_PROFILE_NAME);
        assert_eq!(profile.capacity(), DEFAULT_CAPACITY);
        assert!((profile.weight("anything") - 1.0).abs() < f64::EPSILON);
    }
}
