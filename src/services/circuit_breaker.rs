//! Circuit breaker for cognitive overload.
//!
//! Trips when a session's accumulated load overflows, rejects work during a
//! cooldown, then lets a single probe decide whether to close again. Failed
//! probes reopen the breaker with a doubled cooldown, capped.
//!
//! All transitions are plain functions over [`CircuitBreakerState`] taking
//! `now` explicitly; nothing here sleeps or reads the clock.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::domain::models::{
    BreakerConfig, BreakerScope, BreakerState, CircuitBreakerState, LoadCategory, RecoveryAction,
};

/// Longest base cooldown accepted from configuration (one day).
pub const MAX_COOLDOWN_SECS: u64 = 86_400;
/// Largest cooldown growth multiplier accepted from configuration.
pub const MAX_COOLDOWN_MULTIPLIER: u32 = 100;

/// Policy for choosing the recovery action on a trip.
#[derive(Debug, Clone)]
pub struct RecoveryPolicy {
    /// Trip count at which `pause` gives way to `reroute`.
    pub reroute_after_trips: u32,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            reroute_after_trips: 3,
        }
    }
}

impl RecoveryPolicy {
    /// Determine the recovery action for a breaker that has tripped
    /// `trip_count` times and now cools down for `cooldown`.
    pub fn determine_action(&self, trip_count: u32, cooldown: Duration) -> RecoveryAction {
        if trip_count >= self.reroute_after_trips {
            RecoveryAction::reroute(format!(
                "breaker tripped {trip_count} times, route work to a simpler handler"
            ))
        } else {
            RecoveryAction::Pause {
                cooldown_secs: cooldown.num_seconds(),
            }
        }
    }
}

/// Tunables for the breaker state machine.
#[derive(Debug, Clone)]
pub struct CircuitBreakerPolicy {
    /// When disabled the breaker never leaves `Closed`.
    pub enabled: bool,
    /// Cooldown after a first trip.
    pub base_cooldown: Duration,
    /// Upper bound for cooldown growth.
    pub max_cooldown: Duration,
    pub recovery: RecoveryPolicy,
}

impl Default for CircuitBreakerPolicy {
    fn default() -> Self {
        Self::from_config(&BreakerConfig::default())
    }
}

impl CircuitBreakerPolicy {
    pub fn from_config(config: &BreakerConfig) -> Self {
        let secs = config.cooldown_secs.min(MAX_COOLDOWN_SECS);
        let base_cooldown = Duration::seconds(i64::try_from(secs).unwrap_or(0));
        let multiplier = i32::try_from(config.max_cooldown_multiplier.clamp(1, MAX_COOLDOWN_MULTIPLIER))
            .unwrap_or(1);
        Self {
            enabled: config.enabled,
            base_cooldown,
            max_cooldown: base_cooldown * multiplier,
            recovery: RecoveryPolicy {
                reroute_after_trips: config.reroute_after_trips,
            },
        }
    }
}

/// Result of checking a breaker before admitting a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakerCheck {
    /// Breaker closed, admit normally.
    Allowed,
    /// Breaker just moved to half-open; the unit is the probe.
    Probe,
    /// Breaker open and cooling down.
    Blocked { retry_after: DateTime<Utc> },
}

/// Outcome of a half-open probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Probe was light; breaker closed.
    Closed,
    /// Probe was heavy; breaker reopened with a longer cooldown.
    Reopened(RecoveryAction),
}

/// The breaker state machine.
#[derive(Debug, Clone, Default)]
pub struct CircuitBreaker {
    policy: CircuitBreakerPolicy,
}

impl CircuitBreaker {
    pub const fn new(policy: CircuitBreakerPolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> &CircuitBreakerPolicy {
        &self.policy
    }

    /// Fresh closed breaker for `scope`.
    pub fn new_state(&self, scope: BreakerScope, now: DateTime<Utc>) -> CircuitBreakerState {
        CircuitBreakerState::new(scope, self.policy.base_cooldown, now)
    }

    /// Check whether a unit may be admitted, moving Open→HalfOpen when the
    /// cooldown has elapsed.
    pub fn check(&self, state: &mut CircuitBreakerState, now: DateTime<Utc>) -> BreakerCheck {
        if !self.policy.enabled {
            return BreakerCheck::Allowed;
        }

        match self.poll(state, now) {
            BreakerState::Closed => BreakerCheck::Allowed,
            BreakerState::HalfOpen => BreakerCheck::Probe,
            BreakerState::Open => BreakerCheck::Blocked {
                retry_after: state.retry_after().unwrap_or(now),
            },
        }
    }

    /// Advance Open→HalfOpen if the cooldown is over and return the state.
    pub fn poll(&self, state: &mut CircuitBreakerState, now: DateTime<Utc>) -> BreakerState {
        if self.policy.enabled && state.state == BreakerState::Open && state.cooldown_elapsed(now) {
            Self::half_open(state, now);
        }
        state.state
    }

    /// Closed→Open on overflow. Returns the recovery action, or `None` if
    /// the breaker is disabled or not closed.
    pub fn trip(&self, state: &mut CircuitBreakerState, now: DateTime<Utc>) -> Option<RecoveryAction> {
        if !self.policy.enabled || state.state != BreakerState::Closed {
            return None;
        }

        Self::open(state, now);
        let action = self
            .policy
            .recovery
            .determine_action(state.trip_count, state.cooldown);

        info!(
            scope = %state.scope,
            trip_count = state.trip_count,
            cooldown_secs = state.cooldown.num_seconds(),
            "circuit breaker tripped"
        );
        Some(action)
    }

    /// Settle a half-open breaker using the probe's category.
    ///
    /// Returns `None` if the breaker is not half-open.
    pub fn resolve_probe(
        &self,
        state: &mut CircuitBreakerState,
        category: LoadCategory,
        now: DateTime<Utc>,
    ) -> Option<ProbeOutcome> {
        if state.state != BreakerState::HalfOpen {
            return None;
        }

        if category.passes_probe() {
            self.close(state, now);
            info!(scope = %state.scope, probe = %category, "circuit breaker closed");
            return Some(ProbeOutcome::Closed);
        }

        let saturated = state.cooldown >= self.policy.max_cooldown;
        state.cooldown = (state.cooldown * 2).min(self.policy.max_cooldown);
        Self::open(state, now);

        let action = if saturated {
            RecoveryAction::reject(format!(
                "probe still {category} with cooldown at its {}s cap",
                self.policy.max_cooldown.num_seconds()
            ))
        } else {
            self.policy
                .recovery
                .determine_action(state.trip_count, state.cooldown)
        };

        info!(
            scope = %state.scope,
            probe = %category,
            trip_count = state.trip_count,
            cooldown_secs = state.cooldown.num_seconds(),
            "circuit breaker reopened"
        );
        Some(ProbeOutcome::Reopened(action))
    }

    /// State as it would be reported at `now`, without transitioning.
    pub fn state_at(&self, state: &CircuitBreakerState, now: DateTime<Utc>) -> BreakerState {
        match state.state {
            BreakerState::Open if state.cooldown_elapsed(now) => BreakerState::HalfOpen,
            other => other,
        }
    }

    /// Manually reset to closed with the base cooldown and no trips.
    pub fn reset(&self, state: &mut CircuitBreakerState, now: DateTime<Utc>) {
        self.close(state, now);
        state.trip_count = 0;
    }

    fn open(state: &mut CircuitBreakerState, now: DateTime<Utc>) {
        state.state = BreakerState::Open;
        state.opened_at = Some(now);
        state.state_changed_at = now;
        state.trip_count += 1;
    }

    fn half_open(state: &mut CircuitBreakerState, now: DateTime<Utc>) {
        state.state = BreakerState::HalfOpen;
        state.state_changed_at = now;
    }

    fn close(&self, state: &mut CircuitBreakerState, now: DateTime<Utc>) {
        state.state = BreakerState::Closed;
        state.opened_at = None;
        state.state_changed_at = now;
        state.cooldown = self.policy.base_cooldown;
    }
}
