// Wall-clock aligned tick source. Fires when the second-of-hour is a multiple of the
// interval, polling every 100ms; sleeps 1s after a fire so one boundary second fires once.

use std::time::Duration;

use chrono::Timelike;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const FIRE_COOLDOWN: Duration = Duration::from_secs(1);

/// Source of the current second within the hour (0..3600).
pub trait Clock: Send + Sync + 'static {
    fn second_of_hour(&self) -> u32;
}

/// Local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn second_of_hour(&self) -> u32 {
        let now = chrono::Local::now();
        now.minute() * 60 + now.second()
    }
}

/// True when `second_of_hour` lies on an `interval_secs` boundary.
pub fn is_boundary(second_of_hour: u32, interval_secs: u32) -> bool {
    interval_secs > 0 && second_of_hour % interval_secs == 0
}

pub struct IntervalTicker<C: Clock = SystemClock> {
    interval_secs: u32,
    clock: C,
}

impl IntervalTicker<SystemClock> {
    pub fn new(interval_secs: u32) -> Self {
        Self::with_clock(interval_secs, SystemClock)
    }
}

impl<C: Clock> IntervalTicker<C> {
    pub fn with_clock(interval_secs: u32, clock: C) -> Self {
        Self {
            interval_secs,
            clock,
        }
    }

    /// Spawns the ticker. Each boundary offers `()` on `tx` without waiting; while a previous
    /// tick is still pending the boundary is dropped, so a slow consumer sees at most one
    /// stale tick and never a burst. Use a channel of capacity 1.
    /// Stops when `cancel` fires or the receiver is dropped.
    pub fn spawn(
        self,
        tx: mpsc::Sender<()>,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run(tx, cancel).await;
        })
    }

    async fn run(self, tx: mpsc::Sender<()>, cancel: CancellationToken) {
        loop {
            if is_boundary(self.clock.second_of_hour(), self.interval_secs) {
                match tx.try_send(()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(())) => {
                        debug!("previous tick still pending, skipping boundary");
                    }
                    Err(TrySendError::Closed(())) => break,
                }
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(FIRE_COOLDOWN) => {}
                }
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
        debug!("interval ticker stopped");
    }
}
