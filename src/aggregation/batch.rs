// Splits one fetch of raw statuses into per-service merge inputs, each prefixed with the
// service's latest persisted aggregate (the seed) so runs continue across cycles.

use std::collections::BTreeMap;

use tracing::warn;

use crate::models::{AggregatedStatus, RawStatus};
use crate::store::StatusStore;

/// Merge input for one service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceBatch {
    pub service_id: i64,
    /// Latest persisted aggregate, if any was found in the lookback window.
    pub seed: Option<AggregatedStatus>,
    /// Raw statuses converted to single-count aggregates, ascending by timestamp.
    pub statuses: Vec<AggregatedStatus>,
    /// Raw statuses dropped because the seed already covers them.
    pub skipped: usize,
}

impl ServiceBatch {
    /// `[seed] + statuses`, with a `None` placeholder when there is no seed.
    pub fn into_merge_input(self) -> Vec<Option<AggregatedStatus>> {
        let mut input = Vec::with_capacity(1 + self.statuses.len());
        input.push(self.seed);
        input.extend(self.statuses.into_iter().map(Some));
        input
    }
}

/// Group raw statuses by service id (ascending), each group stably sorted by `inserted_at`.
pub fn group_by_service(raws: Vec<RawStatus>) -> BTreeMap<i64, Vec<RawStatus>> {
    let mut by_service: BTreeMap<i64, Vec<RawStatus>> = BTreeMap::new();
    for raw in raws {
        by_service.entry(raw.service_id).or_default().push(raw);
    }
    for statuses in by_service.values_mut() {
        statuses.sort_by_key(|s| s.inserted_at);
    }
    by_service
}

/// Builds one batch per distinct service in `raws`.
///
/// The seed is the latest aggregate with `timestamp_to` in `[from_ts, now_ts)`. A failed seed
/// lookup is logged and the service proceeds without a seed. Raw statuses at or before the
/// seed's `timestamp_to` were already folded into it and are skipped.
pub async fn build_batches(
    store: &dyn StatusStore,
    raws: Vec<RawStatus>,
    from_ts: i64,
    now_ts: i64,
) -> Vec<ServiceBatch> {
    let grouped = group_by_service(raws);
    let mut batches = Vec::with_capacity(grouped.len());

    for (service_id, statuses) in grouped {
        let seed = match store
            .fetch_latest_aggregate(from_ts, now_ts, service_id)
            .await
        {
            Ok(seed) => seed,
            Err(e) => {
                warn!(
                    service_id,
                    operation = "fetch_latest_aggregate",
                    error = %e,
                    "seed lookup failed, aggregating without seed"
                );
                None
            }
        };

        let covered_until = seed.as_ref().map(|s| s.timestamp_to);
        let total = statuses.len();
        let statuses: Vec<AggregatedStatus> = statuses
            .iter()
            .filter(|raw| covered_until.is_none_or(|to| raw.inserted_at > to))
            .map(AggregatedStatus::from)
            .collect();
        let skipped = total - statuses.len();
        if skipped > 0 {
            warn!(
                service_id,
                skipped,
                seed_id = seed.as_ref().and_then(|s| s.id),
                seed_timestamp_to = covered_until,
                "raw statuses at or before seed end dropped as already aggregated"
            );
        }

        batches.push(ServiceBatch {
            service_id,
            seed,
            statuses,
            skipped,
        });
    }

    batches
}
