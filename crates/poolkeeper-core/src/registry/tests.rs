use std::sync::{Arc, Barrier};

use poolkeeper_types::{Account, AccountError, FailureCategory, RefreshOutcome, ResourceKind};

use super::{AccountRegistry, RefreshPolicy};
use crate::backoff::BackoffPolicy;
use crate::clock::ManualClock;

const T0: f64 = 1_700_000_000.0;

fn registry_with(clock: &Arc<ManualClock>, ids: &[&str]) -> Arc<AccountRegistry> {
    let policy = RefreshPolicy {
        backoff: BackoffPolicy {
            base_seconds: 60,
            cap_exponent: 6,
            max_backoff_seconds: 12 * 3600,
            interval_seconds: 3600,
        },
        ema_alpha: 0.2,
        disable_after_consecutive_failures: None,
    };
    let registry = Arc::new(AccountRegistry::new(clock.clone(), policy));
    for id in ids {
        registry.register(Account::new(*id)).unwrap();
    }
    registry
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_snapshot_keeps_registration_order() {
    let clock = Arc::new(ManualClock::new(T0));
    let registry = registry_with(&clock, &["zeta", "alpha", "mid"]);
    let ids: Vec<_> = registry.snapshot().iter().map(|s| s.id().to_string()).collect();
    assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn test_duplicate_register_rejected() {
    let clock = Arc::new(ManualClock::new(T0));
    let registry = registry_with(&clock, &["a"]);
    assert!(matches!(
        registry.register(Account::new("a")),
        Err(AccountError::AlreadyExists { .. })
    ));
}

#[test]
fn test_no_state_before_first_attempt() {
    let clock = Arc::new(ManualClock::new(T0));
    let registry = registry_with(&clock, &["a"]);
    let snap = registry.get("a").unwrap();
    assert!(snap.state.is_none());
    assert!(!snap.in_flight);
    assert!(approx(snap.last_attempt_at(), 0.0));
}

#[test]
fn test_second_claim_is_already_in_flight() {
    let clock = Arc::new(ManualClock::new(T0));
    let registry = registry_with(&clock, &["a"]);

    let token = registry.begin_attempt("a").unwrap();
    assert!(matches!(registry.begin_attempt("a"), Err(AccountError::AlreadyInFlight { .. })));
    assert!(registry.get("a").unwrap().in_flight);

    registry.complete_attempt(&token, RefreshOutcome::Success { duration_seconds: 1.0 }).unwrap();
    assert!(registry.begin_attempt("a").is_ok());
}

#[test]
fn test_racing_claims_admit_exactly_one() {
    const THREADS: usize = 8;
    let clock = Arc::new(ManualClock::new(T0));
    let registry = registry_with(&clock, &["a"]);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                registry.begin_attempt("a")
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    let losers = results
        .iter()
        .filter(|r| matches!(r, Err(AccountError::AlreadyInFlight { .. })))
        .count();
    assert_eq!(losers, THREADS - 1);
    assert_eq!(registry.in_flight_count(), 1);

    registry
        .complete_attempt(winners[0], RefreshOutcome::Success { duration_seconds: 1.0 })
        .unwrap();
    assert_eq!(registry.in_flight_count(), 0);
}

#[test]
fn test_unknown_and_disabled_claims_rejected() {
    let clock = Arc::new(ManualClock::new(T0));
    let registry = registry_with(&clock, &["a"]);
    assert!(matches!(registry.begin_attempt("nope"), Err(AccountError::NotFound { .. })));

    registry.set_disabled("a", true, Some("banned".to_string())).unwrap();
    match registry.begin_attempt("a") {
        Err(AccountError::Disabled { reason, .. }) => assert_eq!(reason.as_deref(), Some("banned")),
        other => panic!("expected Disabled, got {other:?}"),
    }
}

#[test]
fn test_failure_then_success_updates_state() {
    let clock = Arc::new(ManualClock::new(T0));
    let registry = registry_with(&clock, &["a"]);

    for _ in 0..3 {
        let token = registry.begin_attempt("a").unwrap();
        clock.advance(10.0);
        registry
            .complete_attempt(&token, RefreshOutcome::failure("HTTP 429 from upstream", 10.0))
            .unwrap();
    }
    let state = registry.get("a").unwrap().state.unwrap();
    assert_eq!(state.consecutive_failures, 3);
    assert!(approx(state.last_attempt_at, T0 + 30.0));
    assert!(approx(state.next_eligible_at, T0 + 30.0 + 480.0));
    assert_eq!(state.last_error, "HTTP 429 from upstream");
    assert_eq!(state.last_failure_category, Some(FailureCategory::RiskOrRateLimit));
    assert!(approx(state.last_success_at, 0.0));

    let token = registry.begin_attempt("a").unwrap();
    clock.advance(5.0);
    let state = registry
        .complete_attempt(&token, RefreshOutcome::Success { duration_seconds: 20.0 })
        .unwrap();
    assert_eq!(state.consecutive_failures, 0);
    assert!(approx(state.next_eligible_at, 0.0));
    assert!(state.last_error.is_empty());
    assert!(state.last_failure_category.is_none());
    assert!(approx(state.last_success_at, T0 + 35.0));
}

#[test]
fn test_ewma_seeded_then_smoothed() {
    let clock = Arc::new(ManualClock::new(T0));
    let registry = registry_with(&clock, &["a"]);

    let token = registry.begin_attempt("a").unwrap();
    let state = registry
        .complete_attempt(&token, RefreshOutcome::Success { duration_seconds: 10.0 })
        .unwrap();
    assert!(approx(state.avg_refresh_duration_seconds, 10.0));

    let token = registry.begin_attempt("a").unwrap();
    let state = registry
        .complete_attempt(&token, RefreshOutcome::Success { duration_seconds: 20.0 })
        .unwrap();
    assert!(approx(state.avg_refresh_duration_seconds, 0.2 * 20.0 + 0.8 * 10.0));

    // Zero-duration attempts do not move the average.
    let token = registry.begin_attempt("a").unwrap();
    let state = registry.complete_attempt(&token, RefreshOutcome::failure("x", 0.0)).unwrap();
    assert!(approx(state.avg_refresh_duration_seconds, 12.0));
}

#[test]
fn test_duplicate_completion_is_stale() {
    let clock = Arc::new(ManualClock::new(T0));
    let registry = registry_with(&clock, &["a"]);

    let token = registry.begin_attempt("a").unwrap();
    registry.complete_attempt(&token, RefreshOutcome::failure("boom", 1.0)).unwrap();
    let before = registry.get("a").unwrap().state;

    let again = registry.complete_attempt(&token, RefreshOutcome::failure("boom", 1.0));
    assert!(matches!(again, Err(AccountError::StaleAttempt { .. })));
    assert_eq!(registry.get("a").unwrap().state, before);
}

#[test]
fn test_last_error_truncated() {
    let clock = Arc::new(ManualClock::new(T0));
    let registry = registry_with(&clock, &["a"]);
    let token = registry.begin_attempt("a").unwrap();
    let state =
        registry.complete_attempt(&token, RefreshOutcome::failure("x".repeat(900), 1.0)).unwrap();
    assert_eq!(state.last_error.chars().count(), 500);
}

#[test]
fn test_guard_drop_abandons_claim() {
    let clock = Arc::new(ManualClock::new(T0));
    let registry = registry_with(&clock, &["a"]);
    {
        let guard = registry.claim("a").unwrap();
        assert_eq!(guard.account_id(), "a");
        assert!(registry.get("a").unwrap().in_flight);
    }
    let snap = registry.get("a").unwrap();
    assert!(!snap.in_flight);
    assert!(snap.state.is_none());
}

#[test]
fn test_guard_complete_records_outcome() {
    let clock = Arc::new(ManualClock::new(T0));
    let registry = registry_with(&clock, &["a"]);
    let guard = registry.claim("a").unwrap();
    let state = guard.complete(RefreshOutcome::Success { duration_seconds: 3.0 }).unwrap();
    assert!(approx(state.last_success_at, T0));
    assert_eq!(registry.in_flight_count(), 0);
}

#[test]
fn test_disable_after_consecutive_failures() {
    let clock = Arc::new(ManualClock::new(T0));
    let registry = registry_with(&clock, &["a"]);
    registry.set_policy(RefreshPolicy {
        disable_after_consecutive_failures: Some(2),
        ..registry.policy()
    });

    for _ in 0..2 {
        let token = registry.begin_attempt("a").unwrap();
        registry.complete_attempt(&token, RefreshOutcome::failure("boom", 1.0)).unwrap();
    }
    let snap = registry.get("a").unwrap();
    assert!(snap.account.disabled);
    assert_eq!(snap.account.disabled_reason.as_deref(), Some("2 consecutive refresh failures"));
}

#[test]
fn test_reset_in_flight() {
    let clock = Arc::new(ManualClock::new(T0));
    let registry = registry_with(&clock, &["a", "b"]);
    let _a = registry.begin_attempt("a").unwrap();
    let _b = registry.begin_attempt("b").unwrap();
    assert_eq!(registry.reset_in_flight(), 2);
    assert_eq!(registry.in_flight_count(), 0);
}

#[test]
fn test_cooldown_and_counters() {
    let clock = Arc::new(ManualClock::new(T0));
    let registry = registry_with(&clock, &["a"]);

    let account = registry.apply_cooldown("a", ResourceKind::Videos, 120.0, "429").unwrap();
    let cooldown = account.cooldowns.get(ResourceKind::Videos).unwrap();
    assert!(approx(cooldown.until, T0 + 120.0));
    assert!(registry.clear_cooldown("a", ResourceKind::Videos).unwrap());

    assert_eq!(registry.record_request_error("a").unwrap(), 1);
    assert_eq!(registry.record_request_failure("a").unwrap(), 1);
    assert!(registry.record_request_error("missing").is_err());
}

#[test]
fn test_export_import_roundtrip_drops_claims() {
    let clock = Arc::new(ManualClock::new(T0));
    let registry = registry_with(&clock, &["a", "b"]);
    let token = registry.begin_attempt("a").unwrap();
    registry.complete_attempt(&token, RefreshOutcome::failure("boom", 2.0)).unwrap();
    let _pending = registry.begin_attempt("b").unwrap();

    let restored = AccountRegistry::new(clock.clone(), RefreshPolicy::default());
    assert_eq!(restored.import(registry.export()), 2);
    assert_eq!(restored.in_flight_count(), 0);
    assert_eq!(restored.get("a").unwrap().state.unwrap().consecutive_failures, 1);
    let ids: Vec<_> = restored.snapshot().iter().map(|s| s.id().to_string()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn test_remove_makes_pending_completion_fail() {
    let clock = Arc::new(ManualClock::new(T0));
    let registry = registry_with(&clock, &["a"]);
    let token = registry.begin_attempt("a").unwrap();
    registry.remove("a").unwrap();
    assert!(matches!(
        registry.complete_attempt(&token, RefreshOutcome::failure("x", 1.0)),
        Err(AccountError::NotFound { .. })
    ));
}
