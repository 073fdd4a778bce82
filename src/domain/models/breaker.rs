//! Circuit breaker state and the events it emits.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::session::SessionId;
use super::verdict::RecommendedAction;

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    /// Work is admitted normally.
    Closed,
    /// Work is rejected until the cooldown elapses.
    Open,
    /// The next unit is a probe deciding whether to close.
    HalfOpen,
}

impl BreakerState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which workload a breaker guards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerScope {
    /// One breaker per load session.
    Session(SessionId),
    /// One breaker shared by every session in a domain.
    Domain(String),
}

impl BreakerScope {
    pub fn domain(name: impl Into<String>) -> Self {
        Self::Domain(name.into())
    }
}

impl fmt::Display for BreakerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(id) => write!(f, "session:{id}"),
            Self::Domain(name) => write!(f, "domain:{name}"),
        }
    }
}

/// Mutable state of one breaker. Transitions live in
/// [`crate::services::circuit_breaker::CircuitBreaker`].
#[derive(Debug, Clone)]
pub struct CircuitBreakerState {
    pub scope: BreakerScope,
    pub state: BreakerState,
    /// When the breaker last opened.
    pub opened_at: Option<DateTime<Utc>>,
    /// Current cooldown; grows on failed probes up to the configured cap.
    pub cooldown: Duration,
    /// Total Closed→Open and HalfOpen→Open transitions.
    pub trip_count: u32,
    pub state_changed_at: DateTime<Utc>,
}

impl CircuitBreakerState {
    pub fn new(scope: BreakerScope, cooldown: Duration, now: DateTime<Utc>) -> Self {
        Self {
            scope,
            state: BreakerState::Closed,
            opened_at: None,
            cooldown,
            trip_count: 0,
            state_changed_at: now,
        }
    }

    /// Earliest time the breaker may move to half-open.
    pub fn retry_after(&self) -> Option<DateTime<Utc>> {
        match self.state {
            BreakerState::Open => self.opened_at.map(|opened| opened + self.cooldown),
            BreakerState::Closed | BreakerState::HalfOpen => None,
        }
    }

    /// Whether the cooldown has elapsed at `now`.
    pub fn cooldown_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.opened_at
            .is_some_and(|opened| now - opened >= self.cooldown)
    }
}

/// What the caller should do after a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum RecoveryAction {
    /// Take a break of at least the cooldown.
    Pause { cooldown_secs: i64 },
    /// Hand subsequent work to a simpler downstream handler.
    Reroute { reason: String },
    /// Stop submitting; waiting longer will not help.
    Reject { reason: String },
}

impl RecoveryAction {
    pub fn reroute(reason: impl Into<String>) -> Self {
        Self::Reroute {
            reason: reason.into(),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self::Reject {
            reason: reason.into(),
        }
    }

    /// The verdict action this recovery maps to.
    pub const fn recommended(&self) -> RecommendedAction {
        match self {
            Self::Pause { .. } => RecommendedAction::Pause,
            Self::Reroute { .. } => RecommendedAction::Reroute,
            Self::Reject { .. } => RecommendedAction::Reject,
        }
    }
}

/// Kind of breaker transition reported to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerTransition {
    /// Closed → Open after an overflow.
    Tripped,
    /// Open → HalfOpen once the cooldown elapsed.
    Probing,
    /// HalfOpen → Closed after a light probe.
    Recovered,
    /// HalfOpen → Open after a heavy probe.
    Reopened,
}

/// Event emitted on every breaker transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerEvent {
    pub transition: BreakerTransition,
    pub scope: BreakerScope,
    /// Session whose evaluation caused the transition.
    pub session_id: SessionId,
    pub at: DateTime<Utc>,
    pub trip_count: u32,
    /// Cooldown in effect after the transition, in seconds.
    pub cooldown_secs: i64,
    /// Load left in the session after the transition.
    pub accumulated: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_action: Option<RecoveryAction>,
}
