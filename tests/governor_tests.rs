//! Integration coverage for the rate-limit/concurrency governor (C4),
//! exercised only through its public API (`Governor::with_clock` +
//! `acquire`), complementing the white-box unit tests in `governor.rs`
//! that reach into its private bucket state.

use homescan_core::governor::{Clock, Governor};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

struct FakeClock {
    base: Instant,
    offset_ms: AtomicU64,
}

impl FakeClock {
    fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }

    fn advance(&self, ms: u64) {
        self.offset_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }
}

struct DelegatingClock(Arc<FakeClock>);
impl Clock for DelegatingClock {
    fn now(&self) -> Instant {
        self.0.now()
    }
}

#[tokio::test]
async fn acquire_returns_none_when_cancelled_before_capacity_frees() {
    let clock = Arc::new(FakeClock::new());
    let governor = Arc::new(Governor::with_clock(1, 1, 1, Box::new(DelegatingClock(clock.clone()))));
    let cancel = CancellationToken::new();

    // Drain the single request-per-minute bucket.
    let first = governor.acquire(1, "first", &cancel).await;
    assert!(first.is_some());
    drop(first);

    cancel.cancel();
    let second = governor.acquire(1, "second", &cancel).await;
    assert!(second.is_none(), "a cancelled token must abort the wait instead of blocking forever");
}

#[tokio::test(start_paused = true)]
async fn acquire_blocks_concurrent_callers_past_the_semaphore_limit() {
    let clock = Arc::new(FakeClock::new());
    let governor = Arc::new(Governor::with_clock(
        1_000_000,
        1_000_000,
        1,
        Box::new(DelegatingClock(clock.clone())),
    ));
    let cancel = CancellationToken::new();

    let held = governor.acquire(1, "holder", &cancel).await;
    assert!(held.is_some());

    let g2 = governor.clone();
    let cancel2 = cancel.clone();
    let waiter = tokio::spawn(async move { g2.acquire(1, "waiter", &cancel2).await });

    tokio::task::yield_now().await;
    assert!(
        !waiter.is_finished(),
        "a second caller must not acquire while the only concurrency slot is held"
    );

    drop(held);
    let result = waiter.await.unwrap();
    assert!(result.is_some(), "releasing the held permit must unblock the waiter");
}
