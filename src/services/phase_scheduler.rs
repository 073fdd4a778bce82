//! Phase scheduler.
//!
//! Partitions a workflow into independent phases. Each phase owns one
//! [`LoadSession`] plus its session-scoped breaker and flow tracker, kept
//! behind a per-session mutex so evaluations against different sessions
//! never contend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::domain::errors::{GovernorError, GovernorResult};
use crate::domain::models::{
    check_capacity, AdmissionVerdict, BreakerScope, CircuitBreakerState, Config, FlowConfig,
    LoadSession, PhaseSummary, SessionId, WorkUnit,
};
use crate::domain::ports::{Clock, SystemClock};

use super::admission_gateway::AdmissionGateway;
use super::circuit_breaker::{CircuitBreaker, CircuitBreakerPolicy};
use super::flow_tracker::FlowStateTracker;
use super::load_accumulator::LoadAccumulator;

/// Per-session state guarded by one mutex.
#[derive(Debug)]
pub(crate) struct SessionSlot {
    pub session: LoadSession,
    /// Used when breakers are session-scoped.
    pub breaker: CircuitBreakerState,
    pub flow: FlowStateTracker,
    /// Domain the session was opened for, or last evaluated against.
    pub domain: Option<String>,
    /// Trips caused by this session's evaluations.
    pub trips: u32,
    /// Set once `end_phase` has claimed the slot; late writers must bail.
    pub ended: bool,
}

pub(crate) type SharedSlot = Arc<Mutex<SessionSlot>>;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything a phase produced when run to completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseReport {
    pub summary: PhaseSummary,
    pub verdicts: Vec<AdmissionVerdict>,
}

/// Owner of every live load session.
pub struct PhaseScheduler {
    sessions: RwLock<HashMap<SessionId, SharedSlot>>,
    clock: Arc<dyn Clock>,
    breaker: CircuitBreaker,
    accumulator: LoadAccumulator,
    flow: FlowConfig,
}

impl std::fmt::Debug for PhaseScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseScheduler")
            .field("active", &self.read_sessions().len())
            .field("breaker", &self.breaker)
            .field("accumulator", &self.accumulator)
            .finish_non_exhaustive()
    }
}

impl Default for PhaseScheduler {
    fn default() -> Self {
        Self::new(
            Arc::new(SystemClock),
            CircuitBreaker::default(),
            LoadAccumulator::default(),
            FlowConfig::default(),
        )
    }
}

impl PhaseScheduler {
    pub fn new(
        clock: Arc<dyn Clock>,
        breaker: CircuitBreaker,
        accumulator: LoadAccumulator,
        flow: FlowConfig,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
            breaker,
            accumulator,
            flow,
        }
    }

    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            clock,
            CircuitBreaker::new(CircuitBreakerPolicy::from_config(&config.breaker)),
            LoadAccumulator::new(config.governor.history_limit),
            config.flow.clone(),
        )
    }

    /// Start a cold phase whose overflow threshold equals its capacity.
    pub fn begin_phase(&self, phase_id: impl Into<String>, capacity: u8) -> GovernorResult<LoadSession> {
        self.begin_phase_with_threshold(phase_id, capacity, f64::from(capacity))
    }

    /// Start a cold phase with an explicit overflow threshold.
    ///
    /// A non-positive or non-finite threshold falls back to the capacity.
    pub fn begin_phase_with_threshold(
        &self,
        phase_id: impl Into<String>,
        capacity: u8,
        overflow_threshold: f64,
    ) -> GovernorResult<LoadSession> {
        self.open_slot(phase_id.into(), capacity, overflow_threshold, None)
    }

    pub(crate) fn open_slot(
        &self,
        phase_id: String,
        capacity: u8,
        overflow_threshold: f64,
        domain: Option<String>,
    ) -> GovernorResult<LoadSession> {
        let capacity = check_capacity(capacity)?;
        let threshold = if overflow_threshold.is_finite() && overflow_threshold > 0.0 {
            overflow_threshold
        } else {
            warn!(
                phase_id = %phase_id,
                overflow_threshold,
                "invalid overflow threshold, using capacity"
            );
            f64::from(capacity)
        };

        let now = self.clock.now();
        let session = LoadSession::new(phase_id, capacity, now).with_overflow_threshold(threshold);
        let slot = SessionSlot {
            breaker: self
                .breaker
                .new_state(BreakerScope::Session(session.session_id), now),
            flow: FlowStateTracker::from_config(&self.flow),
            session: session.clone(),
            domain,
            trips: 0,
            ended: false,
        };

        self.write_sessions()
            .insert(session.session_id, Arc::new(Mutex::new(slot)));

        info!(
            session_id = %session.session_id,
            phase_id = %session.phase_id,
            capacity,
            overflow_threshold = threshold,
            "phase started"
        );
        Ok(session)
    }

    /// Finalize a phase and discard its accumulator.
    ///
    /// Evaluations already waiting on the session complete with
    /// `SessionNotFound` and leave nothing behind.
    pub fn end_phase(&self, session_id: &SessionId) -> GovernorResult<PhaseSummary> {
        let slot = self
            .write_sessions()
            .remove(session_id)
            .ok_or(GovernorError::SessionNotFound(*session_id))?;

        let mut slot = lock(&slot);
        slot.ended = true;

        let session = &slot.session;
        let summary = PhaseSummary {
            session_id: session.session_id,
            phase_id: session.phase_id.clone(),
            capacity: session.capacity,
            final_accumulated: session.accumulated,
            peak_accumulated: session.peak,
            admitted_units: session.admitted_units,
            rejected_units: session.rejected_units,
            trip_count: slot.trips,
            started_at: session.started_at,
            ended_at: self.clock.now(),
        };

        info!(
            session_id = %summary.session_id,
            phase_id = %summary.phase_id,
            final_accumulated = summary.final_accumulated,
            peak_accumulated = summary.peak_accumulated,
            admitted_units = summary.admitted_units,
            rejected_units = summary.rejected_units,
            trip_count = summary.trip_count,
            "phase ended"
        );
        Ok(summary)
    }

    /// Snapshot of a live session.
    pub fn session(&self, session_id: &SessionId) -> GovernorResult<LoadSession> {
        let slot = self.slot(session_id)?;
        let slot = lock(&slot);
        if slot.ended {
            return Err(GovernorError::SessionNotFound(*session_id));
        }
        Ok(slot.session.clone())
    }

    /// Snapshots of every live session, oldest first.
    pub fn active_phases(&self) -> Vec<LoadSession> {
        let slots: Vec<SharedSlot> = self.read_sessions().values().cloned().collect();
        let mut sessions: Vec<LoadSession> = slots
            .iter()
            .filter_map(|slot| {
                let slot = lock(slot);
                (!slot.ended).then(|| slot.session.clone())
            })
            .collect();
        sessions.sort_by_key(|s| s.started_at);
        sessions
    }

    /// Begin a phase, evaluate `units` through `gateway` in order, then end it.
    ///
    /// `gateway` must be built over this scheduler.
    pub fn run_phase<'a, I>(
        &self,
        gateway: &AdmissionGateway,
        phase_id: impl Into<String>,
        capacity: u8,
        units: I,
    ) -> GovernorResult<PhaseReport>
    where
        I: IntoIterator<Item = &'a WorkUnit>,
    {
        let session = self.begin_phase(phase_id, capacity)?;
        let id = session.session_id;

        let mut verdicts = Vec::new();
        for unit in units {
            match gateway.evaluate(&id, unit) {
                Ok(verdict) => verdicts.push(verdict),
                Err(e) => {
                    if let Err(end_err) = self.end_phase(&id) {
                        debug!(session_id = %id, error = %end_err, "phase already ended");
                    }
                    return Err(e);
                }
            }
        }

        let summary = self.end_phase(&id)?;
        Ok(PhaseReport { summary, verdicts })
    }

    /// Current time on the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Breaker policy applied to every session and domain breaker.
    pub const fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Accumulator that charges and compacts session history.
    pub const fn accumulator(&self) -> &LoadAccumulator {
        &self.accumulator
    }

    pub(crate) fn slot(&self, session_id: &SessionId) -> GovernorResult<SharedSlot> {
        self.read_sessions()
            .get(session_id)
            .cloned()
            .ok_or(GovernorError::SessionNotFound(*session_id))
    }

    fn read_sessions(&self) -> std::sync::RwLockReadGuard<'_, HashMap<SessionId, SharedSlot>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_sessions(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<SessionId, SharedSlot>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}
