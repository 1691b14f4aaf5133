// ==============================
// tests/unit/rate_limit_tests.rs
// ==============================
//! This test suite is designed to validate the functionality of the `RateLimiter`
use std::sync::Arc;

use chrono::Duration;
use sentinel_auth::config::RateLimitSettings;
use sentinel_auth::{ManualClock, RateDecision, RateLimiter};

fn limiter() -> (Arc<RateLimiter>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_now());
    let limiter = RateLimiter::from_settings(&RateLimitSettings::default(), clock.clone());
    (Arc::new(limiter), clock)
}

#[test]
fn test_five_allowed_sixth_denied_then_window_passes() {
    let (limiter, clock) = limiter();
    let key = "203.0.113.7";

    for attempt in 1..=5 {
        assert_eq!(limiter.check(key), RateDecision::Allowed, "attempt {attempt}");
        limiter.record(key);
        clock.advance(Duration::seconds(1));
    }

    match limiter.check(key) {
        RateDecision::Denied { retry_after_secs } => {
            assert!(retry_after_secs > 0);
            // First attempt was 5s ago
            assert_eq!(retry_after_secs, 55);
        },
        RateDecision::Allowed => panic!("sixth attempt inside the window must be denied"),
    }

    clock.advance(Duration::seconds(60));
    assert!(limiter.check(key).is_allowed());
}

#[test]
fn test_record_counts_even_when_over_limit() {
    let (limiter, _) = limiter();
    for _ in 0..7 {
        limiter.record("k");
    }
    assert_eq!(limiter.attempts("k"), 7);
}

#[test]
fn test_check_does_not_consume() {
    let (limiter, _) = limiter();
    for _ in 0..20 {
        assert!(limiter.check("k").is_allowed());
    }
    assert_eq!(limiter.attempts("k"), 0);
}

#[test]
fn test_sweep_is_time_based() {
    let (limiter, clock) = limiter();
    limiter.record("a");
    limiter.record("b");

    // Nothing is evicted while attempts are inside the window
    assert_eq!(limiter.sweep(), 0);
    assert_eq!(limiter.tracked_keys(), 2);

    clock.advance(Duration::seconds(61));
    assert_eq!(limiter.sweep(), 2);
    assert_eq!(limiter.tracked_keys(), 0);
}

#[test]
fn test_parallel_attempts_allow_exactly_limit() {
    let (limiter, _) = limiter();
    let handles: Vec<_> = (0..64)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            std::thread::spawn(move || limiter.acquire("198.51.100.1").is_allowed())
        })
        .collect();

    let allowed = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|allowed| *allowed)
        .count();
    assert_eq!(allowed, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sweeper_stops_when_limiter_dropped() {
    let (limiter, _) = limiter();
    let handle = limiter.spawn_sweeper(std::time::Duration::from_millis(10));
    drop(limiter);

    tokio::time::timeout(std::time::Duration::from_secs(2), handle)
        .await
        .expect("sweeper should exit once the limiter is gone")
        .unwrap();
}
