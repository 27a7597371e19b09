use aligator::*;
use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "aligator", version)]
#[command(about = "Compacts raw service status records into aggregated result intervals")]
struct Args {
    /// Path to the TOML config file (falls back to CONFIG_FILE, then config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Override aggregation.interval_secs: how often the aggregation cycle runs
    #[arg(short, long)]
    interval: Option<u32>,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    debug: bool,

    /// Log per-phase cycle timings (shown at debug level)
    #[arg(long)]
    time_profiling: bool,

    /// Run a single aggregation cycle and exit
    #[arg(long)]
    once: bool,
}

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let mut app_config = config::AppConfig::load(args.config.as_deref())?;
    if let Some(interval) = args.interval {
        app_config.aggregation.interval_secs = interval;
    }
    if args.time_profiling {
        app_config.aggregation.time_profiling = true;
    }
    app_config.validate()?;
    if app_config.aggregation.time_profiling && !args.debug {
        tracing::warn!("time profiling is logged at debug level; enable --debug to see it");
    }

    let repo = Arc::new(
        status_repo::StatusRepo::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    repo.init().await?;

    let service = Arc::new(aggregation_worker::AggregationService::new(
        repo.clone(),
        aggregation_worker::AggregationWorkerConfig::from_app(&app_config),
    )?);

    tracing::info!(
        interval_secs = app_config.aggregation.interval_secs,
        lookback_hours = app_config.aggregation.lookback_hours,
        "booting {}",
        version::banner()
    );

    if args.once {
        let result = service.run_cycle().await;
        repo.close().await;
        result?;
        return Ok(());
    }

    if app_config.aggregation.run_on_startup
        && let Err(e) = backfill::run_backfill(&service).await
    {
        tracing::warn!(error = %e, "startup backfill failed");
    }

    let cancel = CancellationToken::new();
    let worker_handle =
        aggregation_worker::spawn(service, app_config.maintenance.clone(), cancel.clone());

    shutdown_signal().await;
    tracing::info!("Received shutdown signal");
    cancel.cancel();
    let _ = worker_handle.await;
    repo.close().await;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
