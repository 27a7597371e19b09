// Interval ticker tests (paused tokio time, injected clocks)

use aligator::ticker::{Clock, IntervalTicker, is_boundary};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct FixedClock(u32);

impl Clock for FixedClock {
    fn second_of_hour(&self) -> u32 {
        self.0
    }
}

/// Advances one second per poll, wrapping at the hour.
struct SteppingClock(Arc<AtomicU32>);

impl Clock for SteppingClock {
    fn second_of_hour(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed) % 3600
    }
}

/// Second-of-hour from tokio time elapsed since creation (starts at 0).
struct TokioClock(tokio::time::Instant);

impl TokioClock {
    fn new() -> Self {
        Self(tokio::time::Instant::now())
    }
}

impl Clock for TokioClock {
    fn second_of_hour(&self) -> u32 {
        (self.0.elapsed().as_secs() % 3600) as u32
    }
}

/// Reads the boundary second 120 for the first 900ms, then moves past it.
struct HoldClock(tokio::time::Instant);

impl HoldClock {
    fn new() -> Self {
        Self(tokio::time::Instant::now())
    }
}

impl Clock for HoldClock {
    fn second_of_hour(&self) -> u32 {
        let elapsed = self.0.elapsed();
        if elapsed < Duration::from_millis(900) {
            120
        } else {
            121 + elapsed.as_secs() as u32
        }
    }
}

#[test]
fn boundary_detection() {
    assert!(is_boundary(0, 300));
    assert!(is_boundary(600, 300));
    assert!(!is_boundary(601, 300));
    assert!(is_boundary(3540, 60));
    assert!(is_boundary(17, 1));
    assert!(!is_boundary(0, 0));
}

#[tokio::test(start_paused = true)]
async fn ticker_fires_on_boundary() {
    let (tx, mut rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    let handle = IntervalTicker::with_clock(60, FixedClock(120)).spawn(tx, cancel.clone());

    let tick = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
    assert_eq!(tick.unwrap(), Some(()));

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn ticker_silent_off_boundary() {
    let (tx, mut rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    let handle = IntervalTicker::with_clock(60, FixedClock(61)).spawn(tx, cancel.clone());

    let tick = tokio::time::timeout(Duration::from_secs(30), rx.recv()).await;
    assert!(tick.is_err());

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn ticker_slow_consumer_gets_one_stale_tick() {
    let (tx, mut rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    let handle = IntervalTicker::with_clock(10, TokioClock::new()).spawn(tx, cancel.clone());

    // Consumer stalls across the 0s, 10s, 20s and 30s boundaries.
    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(rx.recv().await, Some(()));

    // Well before the 40s boundary: no second tick may follow.
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(rx.try_recv().is_err());

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn ticker_fires_once_per_boundary_second() {
    let (tx, mut rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    let handle = IntervalTicker::with_clock(60, HoldClock::new()).spawn(tx, cancel.clone());

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let mut ticks = 0;
    while let Ok(Some(())) = tokio::time::timeout_at(deadline, rx.recv()).await {
        ticks += 1;
    }
    assert_eq!(ticks, 1);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn ticker_fires_once_per_interval_with_moving_clock() {
    let (tx, mut rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    let seconds = Arc::new(AtomicU32::new(1));
    let handle =
        IntervalTicker::with_clock(10, SteppingClock(seconds.clone())).spawn(tx, cancel.clone());

    let mut fired_at = Vec::new();
    for _ in 0..3 {
        rx.recv().await.unwrap();
        fired_at.push(seconds.load(Ordering::Relaxed) - 1);
    }
    assert_eq!(fired_at, vec![10, 20, 30]);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn ticker_stops_when_receiver_dropped() {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let handle = IntervalTicker::with_clock(1, FixedClock(0)).spawn(tx, CancellationToken::new());
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("ticker should exit")
        .unwrap();
}
