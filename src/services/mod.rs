pub mod admission_gateway;
pub mod circuit_breaker;
pub mod complexity_scorer;
pub mod flow_tracker;
pub mod load_accumulator;
pub mod phase_scheduler;
pub mod profile_registry;
pub mod structure_audit;

pub use admission_gateway::AdmissionGateway;
pub use circuit_breaker::{
    BreakerCheck, CircuitBreaker, CircuitBreakerPolicy, ProbeOutcome, RecoveryPolicy,
};
pub use complexity_scorer::ComplexityScorer;
pub use flow_tracker::FlowStateTracker;
pub use load_accumulator::LoadAccumulator;
pub use phase_scheduler::{PhaseReport, PhaseScheduler};
pub use profile_registry::{ProfileRegistry, ResolvedProfile};
pub use structure_audit::{AuditReport, Severity, StructureAuditor, Violation, ViolationKind};
