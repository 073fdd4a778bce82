//! Phase-scoped load sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use uuid::Uuid;

use super::score::ComplexityScore;

/// Identifier of a live load session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SessionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Working-memory bookkeeping for one phase.
///
/// `capacity` and `overflow_threshold` are fixed when the phase begins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadSession {
    pub session_id: SessionId,
    pub phase_id: String,
    /// Cumulative load in the current phase, never negative.
    pub accumulated: f64,
    pub capacity: u8,
    /// Accumulated load at which the session overflows.
    pub overflow_threshold: f64,
    /// Most recent scores, oldest first.
    pub history: VecDeque<ComplexityScore>,
    /// Highest `accumulated` observed during the phase.
    pub peak: f64,
    /// Units added to `accumulated`.
    pub admitted_units: u64,
    /// Units recorded in history without being admitted.
    pub rejected_units: u64,
    pub started_at: DateTime<Utc>,
}

impl LoadSession {
    /// A cold session: nothing accumulated, empty history.
    pub fn new(phase_id: impl Into<String>, capacity: u8, started_at: DateTime<Utc>) -> Self {
        Self {
            session_id: SessionId::new(),
            phase_id: phase_id.into(),
            accumulated: 0.0,
            capacity,
            overflow_threshold: f64::from(capacity),
            history: VecDeque::new(),
            peak: 0.0,
            admitted_units: 0,
            rejected_units: 0,
            started_at,
        }
    }

    pub fn with_overflow_threshold(mut self, threshold: f64) -> Self {
        self.overflow_threshold = threshold;
        self
    }

    /// Remaining headroom before overflow (0 when overflowed).
    pub fn headroom(&self) -> f64 {
        (self.overflow_threshold - self.accumulated).max(0.0)
    }

    /// Load as a fraction of capacity.
    pub fn utilization(&self) -> f64 {
        self.accumulated / f64::from(self.capacity)
    }
}

/// Audit record produced when a phase ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub session_id: SessionId,
    pub phase_id: String,
    pub capacity: u8,
    pub final_accumulated: f64,
    pub peak_accumulated: f64,
    pub admitted_units: u64,
    pub rejected_units: u64,
    /// Trips of the session's breaker (or of the domain breaker while this
    /// session was the one overflowing).
    pub trip_count: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl PhaseSummary {
    pub fn duration(&self) -> chrono::Duration {
        self.ended_at - self.started_at
    }
}
