use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Qualitative flow band of a smoothed level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowClassification {
    Optimal,
    Focused,
    Challenged,
    Overloaded,
}

impl FlowClassification {
    pub fn classify(level: f64) -> Self {
        if level >= 0.8 {
            Self::Optimal
        } else if level >= 0.6 {
            Self::Focused
        } else if level >= 0.4 {
            Self::Challenged
        } else {
            Self::Overloaded
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Optimal => "optimal",
            Self::Focused => "focused",
            Self::Challenged => "challenged",
            Self::Overloaded => "overloaded",
        }
    }
}

impl fmt::Display for FlowClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One point of the flow time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSnapshot {
    /// Factor readings, each clamped into `[0, 1]`.
    pub factors: BTreeMap<String, f64>,
    /// EWMA of the per-reading factor mean, in `[0, 1]`.
    pub smoothed_level: f64,
    pub classified_as: FlowClassification,
    pub timestamp: DateTime<Utc>,
}
