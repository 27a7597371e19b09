// One-time catch-up: run one aggregation cycle at startup so raw statuses that piled up
// while the process was down are compacted without waiting for the first tick.

use crate::aggregation_worker::{AggregationService, CycleReport};
use tracing::info;

/// Runs one cycle immediately. A fetch failure is returned to the caller.
pub async fn run_backfill(service: &AggregationService) -> anyhow::Result<CycleReport> {
    let report = service.run_cycle().await?;
    info!(
        fetched = report.fetched,
        saved = report.saved,
        "backfill complete"
    );
    Ok(report)
}
