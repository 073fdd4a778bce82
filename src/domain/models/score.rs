use serde::{Deserialize, Serialize};
use std::fmt;

use super::work_unit::FeatureVector;

/// Fraction of capacity below which a unit is `simple`.
pub const SIMPLE_FRACTION: f64 = 0.4;
/// Fraction of capacity below which a unit is `moderate`.
pub const MODERATE_FRACTION: f64 = 0.7;

/// `fraction` of `capacity`, rounded to six decimal places so that decimal
/// fractions land on the nearest double (`7 x 0.4` is exactly `2.8`).
pub fn capacity_fraction(capacity: u8, fraction: f64) -> f64 {
    let scaled = f64::from(capacity) * fraction;
    (scaled * 1e6).round() / 1e6
}

/// Qualitative complexity band of a weighted score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadCategory {
    Simple,
    Moderate,
    Complex,
    Overload,
}

impl LoadCategory {
    /// Band a weighted score against a capacity.
    pub fn classify(weighted: f64, capacity: u8) -> Self {
        if weighted < capacity_fraction(capacity, SIMPLE_FRACTION) {
            Self::Simple
        } else if weighted < capacity_fraction(capacity, MODERATE_FRACTION) {
            Self::Moderate
        } else if weighted < f64::from(capacity) {
            Self::Complex
        } else {
            Self::Overload
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
            Self::Overload => "overload",
        }
    }

    /// Whether a half-open probe of this category closes the breaker.
    pub const fn passes_probe(&self) -> bool {
        matches!(self, Self::Simple | Self::Moderate)
    }
}

impl fmt::Display for LoadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of scoring one unit. Created fresh per evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityScore {
    /// The (sanitized) features that were scored.
    pub raw: FeatureVector,
    /// Weighted sum of the features.
    pub weighted: f64,
    pub category: LoadCategory,
    /// Set when the domain had no profile and the built-in default was used.
    #[serde(default)]
    pub degraded: bool,
}

impl ComplexityScore {
    /// Synthetic entry standing in for a run of compacted history.
    pub fn aggregate(weighted: f64, capacity: u8) -> Self {
        Self {
            raw: FeatureVector::new(),
            weighted,
            category: LoadCategory::classify(weighted, capacity),
            degraded: false,
        }
    }
}
