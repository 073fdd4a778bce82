//! Common test utilities for integration tests
//!
//! Provides shared fixtures and helpers used across multiple integration
//! test files.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use loadgate::domain::models::BreakerScopeKind;
use loadgate::domain::ports::RecordingEventSink;
use loadgate::services::{CircuitBreakerPolicy, LoadAccumulator};
use loadgate::{
    AdmissionGateway, CircuitBreaker, FeatureVector, ManualClock, PhaseScheduler, ProfileRegistry,
    WeightProfile, WorkUnit,
};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Profile `support`: capacity 7, `word_count` weighted 1.0, `questions` 1.5.
pub fn support_profile() -> WeightProfile {
    let mut weights = BTreeMap::new();
    weights.insert("word_count".to_string(), 1.0);
    weights.insert("questions".to_string(), 1.5);
    WeightProfile::new("support", 7, weights).expect("valid profile")
}

/// Profile `installer`: capacity 5, one `steps` feature.
pub fn installer_profile() -> WeightProfile {
    let mut weights = BTreeMap::new();
    weights.insert("steps".to_string(), 1.0);
    WeightProfile::new("installer", 5, weights).expect("valid profile")
}

/// A `support` unit whose weighted score equals `score`.
pub fn support_unit(score: f64) -> WorkUnit {
    WorkUnit::new("support", FeatureVector::new().with("word_count", score))
}

/// Gateway over a manual clock with recorded events.
pub struct Fixture {
    pub gateway: AdmissionGateway,
    pub clock: Arc<ManualClock>,
    pub events: Arc<RecordingEventSink>,
}

impl Fixture {
    pub fn new(scope: BreakerScopeKind) -> Self {
        Self::with_policy(scope, CircuitBreakerPolicy::default())
    }

    pub fn with_policy(scope: BreakerScopeKind, policy: CircuitBreakerPolicy) -> Self {
        let clock = Arc::new(ManualClock::default());
        let events = Arc::new(RecordingEventSink::new());
        let registry = Arc::new(
            ProfileRegistry::from_profiles(vec![support_profile(), installer_profile()])
                .expect("unique profiles"),
        );
        let scheduler = Arc::new(PhaseScheduler::new(
            clock.clone(),
            CircuitBreaker::new(policy),
            LoadAccumulator::default(),
            loadgate::domain::models::FlowConfig::default(),
        ));
        let gateway = AdmissionGateway::new(registry, scheduler)
            .with_scope(scope)
            .with_event_sink(events.clone());

        Self {
            gateway,
            clock,
            events,
        }
    }
}
