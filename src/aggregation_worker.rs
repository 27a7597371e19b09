// Background worker: on every interval tick, merge raw statuses inside the lookback window
// into aggregated spans per service, persist them, then purge the consumed raw rows.
// VACUUM runs on a configurable schedule (cron expression or fixed interval).

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::aggregation::{build_batches, merge_runs};
use crate::config::{AppConfig, MaintenanceConfig};
use crate::store::StatusStore;
use crate::ticker::{Clock, IntervalTicker, SystemClock};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Config for one aggregation service.
#[derive(Debug, Clone)]
pub struct AggregationWorkerConfig {
    pub interval_secs: u32,
    pub lookback: Duration,
    pub safety_margin: Duration,
    pub time_profiling: bool,
}

impl AggregationWorkerConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            interval_secs: config.aggregation.interval_secs,
            lookback: Duration::from_secs(config.aggregation.lookback_hours as u64 * 3600),
            safety_margin: Duration::from_secs(config.aggregation.safety_margin_secs),
            time_profiling: config.aggregation.time_profiling,
        }
    }
}

/// Counters for one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    /// Services with at least one raw status left to merge after seed filtering.
    pub services: usize,
    pub saved: usize,
    pub save_failures: usize,
    /// Rows purged, or `None` when the window delete failed.
    pub deleted: Option<u64>,
}

pub struct AggregationService {
    store: Arc<dyn StatusStore>,
    config: AggregationWorkerConfig,
}

impl AggregationService {
    pub fn new(
        store: Arc<dyn StatusStore>,
        config: AggregationWorkerConfig,
    ) -> Result<Self, ServiceError> {
        if config.interval_secs == 0 {
            return Err(ServiceError::InvalidConfig(
                "interval_secs must not be zero".into(),
            ));
        }
        if config.lookback.is_zero() {
            return Err(ServiceError::InvalidConfig(
                "lookback must not be zero".into(),
            ));
        }
        if config.safety_margin >= config.lookback {
            return Err(ServiceError::InvalidConfig(format!(
                "safety margin {:?} must be shorter than lookback {:?}",
                config.safety_margin, config.lookback
            )));
        }
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &AggregationWorkerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn StatusStore> {
        &self.store
    }

    /// Raw window `[now - lookback, now - safety_margin]` in epoch ms.
    pub fn window(&self, now_ms: i64) -> (i64, i64) {
        let from = now_ms - self.config.lookback.as_millis() as i64;
        let to = now_ms - self.config.safety_margin.as_millis() as i64;
        (from, to)
    }

    /// Runs one cycle against the current wall clock.
    pub async fn run_cycle(&self) -> anyhow::Result<CycleReport> {
        self.run_cycle_at(chrono::Utc::now().timestamp_millis()).await
    }

    /// One aggregation pass for the instant `now_ms`.
    ///
    /// Returns `Err` only when the raw fetch fails; nothing is saved or deleted in that case.
    /// Save and delete failures are logged and reflected in the report.
    #[instrument(skip(self), fields(interval_secs = self.config.interval_secs))]
    pub async fn run_cycle_at(&self, now_ms: i64) -> anyhow::Result<CycleReport> {
        let (from_ts, to_ts) = self.window(now_ms);
        let mut report = CycleReport::default();

        let started = Instant::now();
        let mut raws = self
            .store
            .fetch_raw_statuses(from_ts, to_ts)
            .await
            .map_err(|e| e.context("fetch_raw_statuses"))?;
        self.profile("fetch", started);

        report.fetched = raws.len();
        if raws.is_empty() {
            debug!(from_ts, to_ts, "no raw statuses in window");
            return Ok(report);
        }
        raws.sort_by_key(|r| r.service_id);

        let started = Instant::now();
        let batches = build_batches(self.store.as_ref(), raws, from_ts, now_ms).await;
        for batch in batches {
            if batch.statuses.is_empty() {
                continue;
            }
            report.services += 1;
            let service_id = batch.service_id;
            let seed = batch.seed.clone();
            for agg in merge_runs(batch.into_merge_input()) {
                if seed.as_ref() == Some(&agg) {
                    continue;
                }
                match self.store.save_aggregate(&agg).await {
                    Ok(()) => report.saved += 1,
                    Err(e) => {
                        report.save_failures += 1;
                        warn!(
                            service_id,
                            operation = "save_aggregate",
                            error = %e,
                            "failed to save aggregated status"
                        );
                    }
                }
            }
        }
        self.profile("merge_and_save", started);

        let started = Instant::now();
        match self.store.delete_raw_statuses(from_ts, to_ts).await {
            Ok(n) => report.deleted = Some(n),
            Err(e) => {
                warn!(
                    operation = "delete_raw_statuses",
                    from_ts,
                    to_ts,
                    error = %e,
                    "failed to purge raw statuses; they will be re-read next cycle"
                );
            }
        }
        self.profile("delete", started);

        info!(
            fetched = report.fetched,
            services = report.services,
            saved = report.saved,
            save_failures = report.save_failures,
            deleted = report.deleted.unwrap_or(0),
            "aggregation cycle complete"
        );
        Ok(report)
    }

    fn profile(&self, phase: &'static str, started: Instant) {
        if self.config.time_profiling {
            debug!(
                phase,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "time profiling"
            );
        }
    }
}

/// Spawns the aggregation worker on the local wall clock. Returns a join handle.
pub fn spawn(
    service: Arc<AggregationService>,
    maintenance: MaintenanceConfig,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    spawn_with_clock(service, maintenance, SystemClock, cancel)
}

/// As [`spawn`], with an explicit clock driving the ticker.
pub fn spawn_with_clock<C: Clock>(
    service: Arc<AggregationService>,
    maintenance: MaintenanceConfig,
    clock: C,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(service, maintenance, clock, cancel).await;
    })
}

async fn run<C: Clock>(
    service: Arc<AggregationService>,
    maintenance: MaintenanceConfig,
    clock: C,
    cancel: CancellationToken,
) {
    let (tick_tx, mut tick_rx) = tokio::sync::mpsc::channel::<()>(1);
    let ticker = IntervalTicker::with_clock(service.config().interval_secs, clock)
        .spawn(tick_tx, cancel.child_token());

    let (vacuum_tx, mut vacuum_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(vacuum_scheduler(maintenance, vacuum_tx, cancel.child_token()));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            tick = tick_rx.recv() => {
                if tick.is_none() {
                    break;
                }
                if let Err(e) = service.run_cycle().await {
                    warn!(error = %e, "aggregation cycle failed");
                }
            }
            Some(()) = vacuum_rx.recv() => {
                if let Err(e) = service.store().vacuum().await {
                    warn!(error = %e, "vacuum failed");
                } else {
                    info!("vacuum complete");
                }
            }
        }
    }

    let _ = ticker.await;
    debug!("aggregation worker shutting down");
}

/// Sends a message on `tx` at each VACUUM time (cron or fixed interval). Uses local time for cron.
async fn vacuum_scheduler(
    config: MaintenanceConfig,
    tx: tokio::sync::mpsc::Sender<()>,
    cancel: CancellationToken,
) {
    if let Some(ref cron_str) = config.vacuum_schedule {
        let Ok(schedule) = cron::Schedule::from_str(cron_str) else {
            warn!(cron = %cron_str, "invalid vacuum_schedule; VACUUM will not run");
            return;
        };
        loop {
            let now = chrono::Local::now();
            let next = schedule.after(&now).next();
            let delay = match next {
                Some(next) => (next - now).to_std().unwrap_or(Duration::from_secs(1)),
                None => Duration::from_secs(3600),
            };
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            if next.is_some() && tx.send(()).await.is_err() {
                break;
            }
        }
    } else {
        let interval = Duration::from_secs(config.vacuum_interval_secs);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            if tx.send(()).await.is_err() {
                break;
            }
        }
    }
}
