//! Loadgate - cognitive-load admission control
//!
//! Loadgate rates incoming units of work by complexity, charges them against
//! a bounded working-memory capacity, and trips a circuit breaker with a
//! cooldown when a session overflows. It never executes work itself: every
//! call returns a verdict (`proceed`, `simplify`, `pause`, `reroute` or
//! `reject`) for the caller to act on.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): value objects, errors, and the clock and
//!   event-sink ports
//! - **Service Layer** (`services`): scorer, accumulator, breaker, flow
//!   tracker, phase scheduler and the admission gateway
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line presentation
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use loadgate::{AdmissionGateway, Config, FeatureVector, SystemClock, NullEventSink, WorkUnit};
//!
//! let gateway = AdmissionGateway::from_config(
//!     &Config::default(),
//!     Arc::new(SystemClock),
//!     Arc::new(NullEventSink),
//! )?;
//! let session = gateway.begin_phase_for("chat", "default")?;
//! let unit = WorkUnit::new("default", FeatureVector::new().with("questions", 2.0));
//! let verdict = gateway.evaluate(&session.session_id, &unit)?;
//! assert!(verdict.admit);
//! # Ok::<(), loadgate::GovernorError>(())
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    AdmissionVerdict, BreakerEvent, BreakerScope, BreakerState, ComplexityScore, Config,
    FeatureVector, FlowClassification, FlowSnapshot, GovernorStatus, LoadCategory, LoadSession,
    PhaseSummary, RecommendedAction, RecoveryAction, SessionId, WeightProfile, WorkUnit,
};
pub use domain::ports::{BreakerEventSink, Clock, ManualClock, NullEventSink, SystemClock};
pub use domain::{GovernorError, GovernorResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    AdmissionGateway, CircuitBreaker, ComplexityScorer, FlowStateTracker, LoadAccumulator,
    PhaseScheduler, ProfileRegistry, StructureAuditor,
};
