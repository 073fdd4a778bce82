//! Admission verdicts and status views returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::breaker::BreakerState;
use super::flow::FlowClassification;
use super::score::LoadCategory;
use super::session::SessionId;

/// What the caller should do with the unit it just submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Proceed,
    Simplify,
    Pause,
    Reroute,
    Reject,
}

impl RecommendedAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Proceed => "proceed",
            Self::Simplify => "simplify",
            Self::Pause => "pause",
            Self::Reroute => "reroute",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision for one evaluated unit. Not persisted by the governor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionVerdict {
    pub admit: bool,
    pub category: LoadCategory,
    pub recommended_action: RecommendedAction,
    /// Breaker state after this evaluation.
    pub breaker_state: BreakerState,
    pub weighted_score: f64,
    /// Session load after this evaluation.
    pub accumulated: f64,
    /// True when the fallback profile scored the unit.
    pub degraded: bool,
    pub session_id: SessionId,
    pub domain: String,
    /// When a rejected caller may try again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<DateTime<Utc>>,
}

/// Read-only view of a session for status lines and dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernorStatus {
    pub session_id: SessionId,
    pub phase_id: String,
    pub accumulated: f64,
    pub capacity: u8,
    pub breaker_state: BreakerState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_classification: Option<FlowClassification>,
    pub trip_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<DateTime<Utc>>,
}
