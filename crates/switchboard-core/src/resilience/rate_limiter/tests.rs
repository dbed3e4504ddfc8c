//! Tests for the sliding-window rate limiter

use super::*;
use crate::clock::ManualClock;
use crate::error::ErrorKind;
use crate::resilience::CallContext;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn test_n_plus_one_call_waits_for_oldest_to_expire() {
    let limiter = RateLimiter::new("test", RateLimitConfig::new(3, Duration::from_secs(1)));
    let start = Instant::now();

    for _ in 0..3 {
        assert_eq!(limiter.acquire().await, Duration::ZERO);
    }

    let waited = limiter.acquire().await;
    assert_eq!(waited, Duration::from_secs(1));
    assert!(start.elapsed() >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_wait_is_only_until_oldest_leaves_window() {
    let limiter = RateLimiter::new("test", RateLimitConfig::new(3, Duration::from_secs(1)));

    for _ in 0..3 {
        limiter.acquire().await;
        tokio::time::advance(Duration::from_millis(200)).await;
    }

    // Oldest grant is 600ms old, so 400ms remain in its window
    let waited = limiter.acquire().await;
    assert_eq!(waited, Duration::from_millis(400));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_acquisitions_never_exceed_ceiling() {
    const CALLS: usize = 4;
    let period = Duration::from_millis(500);
    let limiter = Arc::new(RateLimiter::new("test", RateLimitConfig::new(CALLS as u32, period)));
    let grants = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for _ in 0..25 {
        let limiter = limiter.clone();
        let grants = grants.clone();
        handles.push(tokio::spawn(async move {
            limiter.acquire().await;
            grants.lock().push(Instant::now());
        }));
    }
    for handle in handles {
        handle.await.expect("task should not panic");
    }

    let mut grants = grants.lock().clone();
    grants.sort();
    assert_eq!(grants.len(), 25);
    for pair in grants.windows(CALLS + 1) {
        let span = pair[CALLS] - pair[0];
        assert!(
            span >= period,
            "{} grants within {:?}",
            CALLS + 1,
            span
        );
    }
}

#[tokio::test]
async fn test_concurrent_acquisitions_on_manual_clock() {
    let clock = Arc::new(ManualClock::new());
    let period = Duration::from_secs(2);
    let limiter = Arc::new(RateLimiter::with_clock(
        "test",
        RateLimitConfig::new(2, period),
        clock.clone(),
    ));
    let grants = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let limiter = limiter.clone();
        let grants = grants.clone();
        let clock = clock.clone();
        handles.push(tokio::spawn(async move {
            limiter.acquire().await;
            grants.lock().push(crate::clock::Clock::now(clock.as_ref()));
        }));
    }
    for handle in handles {
        handle.await.expect("task should not panic");
    }

    let mut grants = grants.lock().clone();
    grants.sort();
    for pair in grants.windows(3) {
        assert!(pair[2] - pair[0] >= period);
    }
}

#[tokio::test]
async fn test_try_acquire_and_available() {
    let clock = Arc::new(ManualClock::new());
    let limiter =
        RateLimiter::with_clock("test", RateLimitConfig::new(2, Duration::from_secs(10)), clock.clone());

    assert_eq!(limiter.available(), 2);
    assert!(limiter.try_acquire());
    assert!(limiter.try_acquire());
    assert!(!limiter.try_acquire());
    assert_eq!(limiter.available(), 0);

    clock.advance(Duration::from_secs(10));
    assert_eq!(limiter.available(), 2);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_defer_until_holds_grants() {
    let clock = Arc::new(ManualClock::new());
    let limiter =
        RateLimiter::with_clock("test", RateLimitConfig::new(10, Duration::from_secs(1)), clock.clone());

    limiter.defer_until(limiter.now() + Duration::from_secs(5));
    assert_eq!(limiter.available(), 0);

    let waited = limiter.acquire().await;
    assert_eq!(waited, Duration::from_secs(5));
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
}

#[tokio::test]
async fn test_acquire_with_respects_deadline() {
    let clock = Arc::new(ManualClock::new());
    let limiter =
        RateLimiter::with_clock("test", RateLimitConfig::new(1, Duration::from_secs(60)), clock.clone());
    limiter.acquire().await;

    let ctx = CallContext::new().with_deadline(limiter.now() + Duration::from_secs(1));
    let err = limiter
        .acquire_with(&ctx)
        .await
        .expect_err("wait would overrun deadline");

    assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_acquire_with_cancelled_context() {
    let limiter = RateLimiter::new("test", RateLimitConfig::new(1, Duration::from_secs(60)));
    limiter.acquire().await;

    let token = CancellationToken::new();
    token.cancel();
    let ctx = CallContext::new().with_cancellation(token);

    let err = limiter.acquire_with(&ctx).await.expect_err("cancelled");
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}
