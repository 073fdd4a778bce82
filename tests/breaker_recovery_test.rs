//! Breaker cooldown, backoff and recovery driven by a manual clock.

mod common;

use chrono::Duration;
use common::{support_unit, Fixture};
use loadgate::domain::models::{BreakerScopeKind, BreakerTransition};
use loadgate::services::{CircuitBreakerPolicy, RecoveryPolicy};
use loadgate::{BreakerState, Clock, RecommendedAction, RecoveryAction};

#[test]
fn test_failed_probes_double_cooldown_then_reroute() {
    let f = Fixture::new(BreakerScopeKind::Session);
    let id = f.gateway.begin_phase_for("chat", "support").unwrap().session_id;

    f.gateway.evaluate(&id, &support_unit(8.0)).unwrap();

    f.clock.advance(Duration::seconds(30));
    let second = f.gateway.evaluate(&id, &support_unit(8.0)).unwrap();
    assert!(!second.admit);
    assert_eq!(second.recommended_action, RecommendedAction::Pause);
    assert_eq!(second.retry_after, Some(f.clock.now() + Duration::seconds(60)));

    f.clock.advance(Duration::seconds(60));
    let third = f.gateway.evaluate(&id, &support_unit(8.0)).unwrap();
    assert!(!third.admit);
    assert_eq!(third.recommended_action, RecommendedAction::Reroute);
    assert_eq!(third.retry_after, Some(f.clock.now() + Duration::seconds(120)));

    let reopened: Vec<_> = f
        .events
        .events()
        .into_iter()
        .filter(|e| e.transition == BreakerTransition::Reopened)
        .collect();
    assert_eq!(reopened.len(), 2);
    assert_eq!(
        reopened[0].recovery_action,
        Some(RecoveryAction::Pause { cooldown_secs: 60 })
    );
    assert!(matches!(
        reopened[1].recovery_action,
        Some(RecoveryAction::Reroute { .. })
    ));
    assert_eq!(reopened[1].trip_count, 3);
}

#[test]
fn test_cooldown_cap_turns_into_reject() {
    let policy = CircuitBreakerPolicy {
        enabled: true,
        base_cooldown: Duration::seconds(10),
        max_cooldown: Duration::seconds(20),
        recovery: RecoveryPolicy {
            reroute_after_trips: 10,
        },
    };
    let f = Fixture::with_policy(BreakerScopeKind::Session, policy);
    let id = f.gateway.begin_phase_for("chat", "support").unwrap().session_id;

    f.gateway.evaluate(&id, &support_unit(8.0)).unwrap();
    f.clock.advance(Duration::seconds(10));
    let capped = f.gateway.evaluate(&id, &support_unit(8.0)).unwrap();
    assert_eq!(capped.recommended_action, RecommendedAction::Pause);

    f.clock.advance(Duration::seconds(20));
    let rejected = f.gateway.evaluate(&id, &support_unit(8.0)).unwrap();
    assert!(!rejected.admit);
    assert_eq!(rejected.recommended_action, RecommendedAction::Reject);
    assert_eq!(
        rejected.retry_after,
        Some(f.clock.now() + Duration::seconds(20))
    );
}

#[test]
fn test_light_probe_restores_base_cooldown() {
    let f = Fixture::new(BreakerScopeKind::Session);
    let id = f.gateway.begin_phase_for("chat", "support").unwrap().session_id;

    f.gateway.evaluate(&id, &support_unit(8.0)).unwrap();
    f.clock.advance(Duration::seconds(30));
    f.gateway.evaluate(&id, &support_unit(8.0)).unwrap();

    f.clock.advance(Duration::seconds(60));
    let probe = f.gateway.evaluate(&id, &support_unit(0.5)).unwrap();
    assert!(probe.admit);
    assert_eq!(probe.breaker_state, BreakerState::Closed);
    assert_eq!(probe.recommended_action, RecommendedAction::Proceed);

    // Overflow again: cooldown starts from the base value.
    let verdict = f.gateway.evaluate(&id, &support_unit(8.0)).unwrap();
    assert_eq!(verdict.recommended_action, RecommendedAction::Simplify);
    assert_eq!(
        verdict.retry_after,
        Some(f.clock.now() + Duration::seconds(30))
    );
}

#[test]
fn test_status_never_transitions() {
    let f = Fixture::new(BreakerScopeKind::Session);
    let id = f.gateway.begin_phase_for("chat", "support").unwrap().session_id;
    f.gateway.evaluate(&id, &support_unit(8.0)).unwrap();

    f.clock.advance(Duration::seconds(45));
    for _ in 0..3 {
        let status = f.gateway.status(&id).unwrap();
        assert_eq!(status.breaker_state, BreakerState::HalfOpen);
        assert_eq!(status.retry_after, None);
    }
    assert_eq!(f.events.events().len(), 1);
}

#[test]
fn test_disabled_breaker_only_simplifies() {
    let policy = CircuitBreakerPolicy {
        enabled: false,
        ..CircuitBreakerPolicy::default()
    };
    let f = Fixture::with_policy(BreakerScopeKind::Session, policy);
    let id = f.gateway.begin_phase_for("chat", "support").unwrap().session_id;

    for _ in 0..3 {
        let verdict = f.gateway.evaluate(&id, &support_unit(8.0)).unwrap();
        assert!(verdict.admit);
        assert_eq!(verdict.recommended_action, RecommendedAction::Simplify);
        assert_eq!(verdict.breaker_state, BreakerState::Closed);
        assert_eq!(verdict.retry_after, None);
    }
    assert!(f.events.events().is_empty());
    assert!((f.gateway.status(&id).unwrap().accumulated - 24.0).abs() < 1e-9);
}
