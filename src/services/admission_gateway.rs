//! Admission gateway.
//!
//! Facade over the governor: scores a work unit, charges it to the caller's
//! session, consults the breaker and returns a verdict. Evaluation never
//! blocks on time; cooldowns are compared against the injected clock.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{info, warn};

use crate::domain::errors::{GovernorError, GovernorResult};
use crate::domain::models::{
    AdmissionVerdict, BreakerEvent, BreakerScope, BreakerScopeKind, BreakerState,
    BreakerTransition, CircuitBreakerState, ComplexityScore, Config, FlowSnapshot,
    GovernorConfig, GovernorStatus, LoadSession, RecommendedAction, RecoveryAction, SessionId,
    WorkUnit, DEFAULT_PROFILE_NAME,
};
use crate::domain::models::score::{capacity_fraction, MODERATE_FRACTION, SIMPLE_FRACTION};
use crate::domain::ports::{BreakerEventSink, Clock, NullEventSink};

use super::circuit_breaker::{BreakerCheck, ProbeOutcome};
use super::complexity_scorer::ComplexityScorer;
use super::load_accumulator::LoadAccumulator;
use super::phase_scheduler::{lock, PhaseScheduler, SessionSlot};
use super::profile_registry::ProfileRegistry;

type SharedBreaker = Arc<Mutex<CircuitBreakerState>>;

/// Admission control entry point.
pub struct AdmissionGateway {
    registry: Arc<ProfileRegistry>,
    scheduler: Arc<PhaseScheduler>,
    sink: Arc<dyn BreakerEventSink>,
    scope: BreakerScopeKind,
    baseline_fraction: f64,
    compress_on_trip: bool,
    domain_breakers: RwLock<HashMap<String, SharedBreaker>>,
}

impl std::fmt::Debug for AdmissionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGateway")
            .field("scope", &self.scope)
            .field("baseline_fraction", &self.baseline_fraction)
            .field("compress_on_trip", &self.compress_on_trip)
            .field("profiles", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl AdmissionGateway {
    /// Session-scoped breakers, default baseline, events discarded.
    pub fn new(registry: Arc<ProfileRegistry>, scheduler: Arc<PhaseScheduler>) -> Self {
        Self {
            registry,
            scheduler,
            sink: Arc::new(NullEventSink),
            scope: BreakerScopeKind::Session,
            baseline_fraction: SIMPLE_FRACTION,
            compress_on_trip: true,
            domain_breakers: RwLock::new(HashMap::new()),
        }
    }

    /// Wire registry, scheduler and gateway from one configuration.
    pub fn from_config(
        config: &Config,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn BreakerEventSink>,
    ) -> GovernorResult<Self> {
        let registry = Arc::new(ProfileRegistry::from_config(&config.profiles)?);
        let scheduler = Arc::new(PhaseScheduler::from_config(config, clock));
        Ok(Self::new(registry, scheduler)
            .with_event_sink(sink)
            .with_scope(config.breaker.scope)
            .with_governor_config(&config.governor))
    }

    /// Publish breaker transitions to `sink` instead of discarding them.
    pub fn with_event_sink(mut self, sink: Arc<dyn BreakerEventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Guard each session with its own breaker, or share one per domain.
    pub fn with_scope(mut self, scope: BreakerScopeKind) -> Self {
        self.scope = scope;
        self
    }

    /// Apply the post-trip baseline and compaction settings.
    ///
    /// A baseline outside `[0, 0.7)` of capacity keeps the current one.
    pub fn with_governor_config(mut self, config: &GovernorConfig) -> Self {
        if (0.0..MODERATE_FRACTION).contains(&config.baseline_fraction) {
            self.baseline_fraction = config.baseline_fraction;
        } else {
            warn!(
                baseline_fraction = config.baseline_fraction,
                "ignoring out-of-range baseline fraction"
            );
        }
        self.compress_on_trip = config.compress_on_trip;
        self
    }

    /// Weight profiles used to score and size sessions.
    pub fn registry(&self) -> &Arc<ProfileRegistry> {
        &self.registry
    }

    /// Phase lifecycle owner; use it to end phases and list active ones.
    pub fn scheduler(&self) -> &Arc<PhaseScheduler> {
        &self.scheduler
    }

    /// Begin a phase sized by `domain`'s weight profile.
    pub fn begin_phase_for(
        &self,
        phase_id: impl Into<String>,
        domain: impl Into<String>,
    ) -> GovernorResult<LoadSession> {
        let domain = domain.into();
        let resolved = self.registry.resolve(&domain);
        self.scheduler.open_slot(
            phase_id.into(),
            resolved.profile.capacity(),
            resolved.profile.overload_threshold(),
            Some(domain),
        )
    }

    /// Evaluate one work unit against `session_id`.
    ///
    /// Fails only with `SessionNotFound`; a breaker rejection is an ordinary
    /// verdict with `admit: false`.
    pub fn evaluate(&self, session_id: &SessionId, unit: &WorkUnit) -> GovernorResult<AdmissionVerdict> {
        let features = unit.features.clone().sanitized();
        let score = ComplexityScorer::score_for(&self.registry, &unit.domain, &features);

        let slot = self.scheduler.slot(session_id)?;
        let mut slot = lock(&slot);
        if slot.ended {
            return Err(GovernorError::SessionNotFound(*session_id));
        }

        let now = self.scheduler.now();
        slot.domain = Some(unit.domain.clone());

        let SessionSlot {
            session,
            breaker,
            trips,
            flow,
            ..
        } = &mut *slot;

        let verdict = match self.scope {
            BreakerScopeKind::Session => {
                let before = breaker.trip_count;
                let verdict = self.decide(session, breaker, score, &unit.domain, now);
                *trips += breaker.trip_count - before;
                verdict
            }
            BreakerScopeKind::Domain => {
                let shared = self.domain_breaker(&unit.domain, now);
                let mut breaker = lock(&shared);
                let before = breaker.trip_count;
                let verdict = self.decide(session, &mut breaker, score, &unit.domain, now);
                *trips += breaker.trip_count - before;
                verdict
            }
        };

        if let Some(factors) = &unit.flow {
            if let Err(err) = flow.update_at(factors, now) {
                warn!(session_id = %session_id, error = %err, "ignoring flow reading");
            }
        }

        info!(
            domain_id = %verdict.domain,
            weighted_score = verdict.weighted_score,
            category = %verdict.category,
            breaker_state = %verdict.breaker_state,
            session_id = %verdict.session_id,
            accumulated = verdict.accumulated,
            admit = verdict.admit,
            recommended_action = %verdict.recommended_action,
            degraded = verdict.degraded,
            "work unit evaluated"
        );
        Ok(verdict)
    }

    /// Fold a flow reading into the session's tracker.
    pub fn record_flow(
        &self,
        session_id: &SessionId,
        factors: &BTreeMap<String, f64>,
    ) -> GovernorResult<FlowSnapshot> {
        let slot = self.scheduler.slot(session_id)?;
        let mut slot = lock(&slot);
        if slot.ended {
            return Err(GovernorError::SessionNotFound(*session_id));
        }
        let now = self.scheduler.now();
        slot.flow.update_at(factors, now)
    }

    /// Read-only view of a session and the breaker guarding it.
    pub fn status(&self, session_id: &SessionId) -> GovernorResult<GovernorStatus> {
        let slot = self.scheduler.slot(session_id)?;
        let slot = lock(&slot);
        if slot.ended {
            return Err(GovernorError::SessionNotFound(*session_id));
        }

        let now = self.scheduler.now();
        let (breaker_state, trip_count, retry_after) = match self.scope {
            BreakerScopeKind::Session => self.breaker_view(&slot.breaker, now),
            BreakerScopeKind::Domain => {
                let domain = slot.domain.as_deref().unwrap_or(DEFAULT_PROFILE_NAME);
                let shared = self.read_domains().get(domain).cloned();
                match shared {
                    Some(shared) => self.breaker_view(&lock(&shared), now),
                    None => (BreakerState::Closed, 0, None),
                }
            }
        };

        Ok(GovernorStatus {
            session_id: slot.session.session_id,
            phase_id: slot.session.phase_id.clone(),
            accumulated: slot.session.accumulated,
            capacity: slot.session.capacity,
            breaker_state,
            flow_classification: slot.flow.classification(),
            trip_count,
            retry_after,
        })
    }

    fn breaker_view(
        &self,
        breaker: &CircuitBreakerState,
        now: DateTime<Utc>,
    ) -> (BreakerState, u32, Option<DateTime<Utc>>) {
        let state = self.scheduler.breaker().state_at(breaker, now);
        let retry_after = match state {
            BreakerState::Open => breaker.retry_after(),
            BreakerState::Closed | BreakerState::HalfOpen => None,
        };
        (state, breaker.trip_count, retry_after)
    }

    /// The check-then-act sequence for one unit. Callers hold the session
    /// lock (and the domain breaker lock when breakers are shared).
    fn decide(
        &self,
        session: &mut LoadSession,
        breaker: &mut CircuitBreakerState,
        score: ComplexityScore,
        domain: &str,
        now: DateTime<Utc>,
    ) -> AdmissionVerdict {
        let policy = self.scheduler.breaker();
        let accumulator = self.scheduler.accumulator();
        let outline = Outline::new(&score, session.session_id, domain);

        match policy.check(breaker, now) {
            BreakerCheck::Blocked { retry_after } => {
                accumulator.record(session, score);
                return outline.verdict(
                    false,
                    RecommendedAction::Pause,
                    breaker.state,
                    session.accumulated,
                    Some(retry_after),
                );
            }
            BreakerCheck::Probe => {
                self.publish(BreakerTransition::Probing, breaker, session, now, None);
                match policy.resolve_probe(breaker, score.category, now) {
                    Some(ProbeOutcome::Reopened(action)) => {
                        accumulator.record(session, score);
                        let recommended = action.recommended();
                        self.publish(BreakerTransition::Reopened, breaker, session, now, Some(action));
                        return outline.verdict(
                            false,
                            recommended,
                            breaker.state,
                            session.accumulated,
                            breaker.retry_after(),
                        );
                    }
                    Some(ProbeOutcome::Closed) => {
                        self.publish(BreakerTransition::Recovered, breaker, session, now, None);
                    }
                    None => {}
                }
            }
            BreakerCheck::Allowed => {}
        }

        accumulator.admit(session, score);
        if !LoadAccumulator::is_overflow(session) {
            return outline.verdict(
                true,
                RecommendedAction::Proceed,
                breaker.state,
                session.accumulated,
                None,
            );
        }

        // The overflowing unit is still admitted, degraded.
        if let Some(action) = policy.trip(breaker, now) {
            if self.compress_on_trip {
                accumulator.compact(session);
            }
            let baseline = capacity_fraction(session.capacity, self.baseline_fraction);
            accumulator.reset(session, baseline);
            self.publish(BreakerTransition::Tripped, breaker, session, now, Some(action));
        }

        outline.verdict(
            true,
            RecommendedAction::Simplify,
            breaker.state,
            session.accumulated,
            breaker.retry_after(),
        )
    }

    fn publish(
        &self,
        transition: BreakerTransition,
        breaker: &CircuitBreakerState,
        session: &LoadSession,
        at: DateTime<Utc>,
        recovery_action: Option<RecoveryAction>,
    ) {
        self.sink.publish(&BreakerEvent {
            transition,
            scope: breaker.scope.clone(),
            session_id: session.session_id,
            at,
            trip_count: breaker.trip_count,
            cooldown_secs: breaker.cooldown.num_seconds(),
            accumulated: session.accumulated,
            recovery_action,
        });
    }

    fn domain_breaker(&self, domain: &str, now: DateTime<Utc>) -> SharedBreaker {
        if let Some(shared) = self.read_domains().get(domain) {
            return Arc::clone(shared);
        }
        let mut breakers = self
            .domain_breakers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let shared = breakers.entry(domain.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(
                self.scheduler
                    .breaker()
                    .new_state(BreakerScope::domain(domain), now),
            ))
        });
        Arc::clone(shared)
    }

    fn read_domains(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, SharedBreaker>> {
        self.domain_breakers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Score-derived verdict fields, fixed before the breaker decides.
struct Outline<'a> {
    category: crate::domain::models::LoadCategory,
    weighted_score: f64,
    degraded: bool,
    session_id: SessionId,
    domain: &'a str,
}

impl<'a> Outline<'a> {
    fn new(score: &ComplexityScore, session_id: SessionId, domain: &'a str) -> Self {
        Self {
            category: score.category,
            weighted_score: score.weighted,
            degraded: score.degraded,
            session_id,
            domain,
        }
    }

    fn verdict(
        &self,
        admit: bool,
        recommended_action: RecommendedAction,
        breaker_state: BreakerState,
        accumulated: f64,
        retry_after: Option<DateTime<Utc>>,
    ) -> AdmissionVerdict {
        AdmissionVerdict {
            admit,
            category: self.category,
            recommended_action,
            breaker_state,
            weighted_score: self.weighted_score,
            accumulated,
            degraded: self.degraded,
            session_id: self.session_id,
            domain: self.domain.to_string(),
            retry_after,
        }
    }
}
