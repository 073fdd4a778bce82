//! Complexity scoring.
//!
//! Turns a feature vector into a weighted scalar and a category band. Scoring
//! is pure: no clock, no logging, no shared state.

use crate::domain::models::{ComplexityScore, FeatureVector, LoadCategory, WeightProfile};

use super::profile_registry::ProfileRegistry;

/// Weighted-sum scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplexityScorer;

impl ComplexityScorer {
    /// Score `features` against `profile`.
    ///
    /// Features the profile does not weight contribute nothing. Negative or
    /// non-finite magnitudes contribute nothing either, so the weighted value
    /// is always finite and non-negative.
    pub fn score(features: &FeatureVector, profile: &WeightProfile) -> ComplexityScore {
        let weighted: f64 = features
            .iter()
            .map(|(name, magnitude)| clean(magnitude) * profile.weight(name))
            .sum();

        ComplexityScore {
            raw: features.clone(),
            weighted,
            category: LoadCategory::classify(weighted, profile.capacity()),
            degraded: false,
        }
    }

    /// Score against the profile registered for `domain`, falling back to the
    /// built-in default profile (and flagging the result) when there is none.
    pub fn score_for(
        registry: &ProfileRegistry,
        domain: &str,
        features: &FeatureVector,
    ) -> ComplexityScore {
        let resolved = registry.resolve(domain);
        let mut score = Self::score(features, &resolved.profile);
        score.degraded = resolved.degraded;
        score
    }
}

fn clean(magnitude: f64) -> f64 {
    if magnitude.is_finite() {
        magnitude.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn profile() -> WeightProfile {
        let mut weights = BTreeMap::new();
        weights.insert("word_count".to_string(), 1.0);
        weights.insert("questions".to_string(), 1.5);
        WeightProfile::new("support", 7, weights).unwrap()
    }

    #[test]
    fn test_weighted_sum() {
        let features = FeatureVector::new().with("word_count", 2.0).with("questions", 2.0);
        let score = ComplexityScorer::score(&features, &profile());
        assert!((score.weighted - 5.0).abs() < f64::EPSILON);
        assert_eq!(score.category, LoadCategory::Complex);
        assert!(!score.degraded);
    }

    #[test]
    fn test_unknown_features_ignored() {
        let features = FeatureVector::new()
            .with("word_count", 1.0)
            .with("emoji_count", 40.0);
        let score = ComplexityScorer::score(&features, &profile());
        assert!((score.weighted - 1.0).abs() < f64::EPSILON);
        assert_eq!(score.category, LoadCategory::Simple);
        // Raw vector is kept as submitted.
        assert_eq!(score.raw.len(), 2);
    }

    #[test]
    fn test_empty_vector_is_simple() {
        let score = ComplexityScorer::score(&FeatureVector::new(), &profile());
        assert!(score.weighted.abs() < f64::EPSILON);
        assert_eq!(score.category, LoadCategory::Simple);
    }

    #[test]
    fn test_negative_and_nan_contribute_nothing() {
        let features = FeatureVector::new()
            .with("word_count", -10.0)
            .with("questions", f64::NAN);
        let score = ComplexityScorer::score(&features, &profile());
        assert!(score.weighted.abs() < f64::EPSILON);
    }

    #[test]
    fn test_overload_at_capacity() {
        let features = FeatureVector::new().with("word_count", 7.0);
        let score = ComplexityScorer::score(&features, &profile());
        assert_eq!(score.category, LoadCategory::Overload);
    }

    #[test]
    fn test_score_is_idempotent() {
        let features = FeatureVector::new().with("word_count", 3.0).with("questions", 1.0);
        let first = ComplexityScorer::score(&features, &profile());
        let second = ComplexityScorer::score(&features, &profile());
        assert_eq!(first, second);
    }

    #[test]
    fn test_score_for_missing_domain_is_degraded() {
        let registry = ProfileRegistry::from_profiles(vec![profile()]).unwrap();
        let features = FeatureVector::new().with("word_count", 2.0).with("anything", 1.0);

        let score = ComplexityScorer::score_for(&registry, "billing", &features);
        assert!(score.degraded);
        // Built-in default weighs every feature 1.0.
        assert!((score.weighted - 3.0).abs() < f64::EPSILON);

        let score = ComplexityScorer::score_for(&registry, "support", &features);
        assert!(!score.degraded);
        assert!((score.weighted - 2.0).abs() < f64::EPSILON);
    }
}
