// Persistence seam used by the aggregation cycle. The SQLite implementation lives in
// status_repo; tests plug in an in-memory store.

use async_trait::async_trait;

use crate::models::{AggregatedStatus, RawStatus};

/// Store operations the aggregation cycle depends on. Each call is independent; the cycle
/// never wraps them in a shared transaction.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Raw statuses with `from_ts <= inserted_at <= to_ts`.
    async fn fetch_raw_statuses(
        &self,
        from_ts: i64,
        to_ts: i64,
    ) -> anyhow::Result<Vec<RawStatus>>;

    /// Most recent aggregate for `service_id` with `from_ts <= timestamp_to < to_ts`.
    async fn fetch_latest_aggregate(
        &self,
        from_ts: i64,
        to_ts: i64,
        service_id: i64,
    ) -> anyhow::Result<Option<AggregatedStatus>>;

    /// Insert a new aggregate (`id == None`) or update the row it was loaded from.
    async fn save_aggregate(&self, agg: &AggregatedStatus) -> anyhow::Result<()>;

    /// Delete raw statuses with `from_ts <= inserted_at <= to_ts`. Returns rows removed.
    async fn delete_raw_statuses(&self, from_ts: i64, to_ts: i64) -> anyhow::Result<u64>;

    /// Reclaim space after deletes. Stores without a compaction step keep the default.
    async fn vacuum(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
