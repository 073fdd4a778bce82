pub mod breaker;
pub mod config;
pub mod flow;
pub mod profile;
pub mod score;
pub mod session;
pub mod verdict;
pub mod work_unit;

pub use breaker::{
    BreakerEvent, BreakerScope, BreakerState, BreakerTransition, CircuitBreakerState,
    RecoveryAction,
};
pub use config::{
    BreakerConfig, BreakerScopeKind, Config, FlowConfig, GovernorConfig, LogFormat,
    LoggingConfig, ProfileConfig, RotationPolicy,
};
pub use flow::{FlowClassification, FlowSnapshot};
pub use profile::{
    check_capacity, WeightProfile, DEFAULT_CAPACITY, DEFAULT_PROFILE_NAME, MAX_CAPACITY,
    MIN_CAPACITY,
};
pub use score::{ComplexityScore, LoadCategory};
pub use session::{LoadSession, PhaseSummary, SessionId};
pub use verdict::{AdmissionVerdict, GovernorStatus, RecommendedAction};
pub use work_unit::{FeatureVector, WorkUnit};
