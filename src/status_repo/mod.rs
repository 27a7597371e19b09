// SQLite status store. Raw rows are written by the monitoring process and purged here once
// aggregated; aggregated rows are upserted by id.
// Uses sqlx for async + connection pooling.

mod schema;

use crate::models::{AggregatedStatus, CheckResult, RawStatus};
use crate::store::StatusStore;
use anyhow::Context;
use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

pub struct StatusRepo {
    pool: SqlitePool,
}

impl StatusRepo {
    /// Connect to SQLite at `path`, create parent dir and DB if missing, enable WAL + pragmas.
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await
            .with_context(|| format!("open status database {}", path))?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (key TEXT PRIMARY KEY, value INTEGER NOT NULL)",
        )
        .execute(&self.pool)
        .await?;

        schema::init_raw_table(&self.pool).await?;
        schema::init_aggregated_table(&self.pool).await?;

        Ok(())
    }

    /// Close the pool; waits for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Batch insert of raw observations in one transaction.
    #[instrument(skip(self, statuses), fields(repo = "status", operation = "save_raw_statuses", statuses_count = statuses.len()))]
    pub async fn save_raw_statuses(&self, statuses: &[RawStatus]) -> anyhow::Result<()> {
        if statuses.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for s in statuses {
            sqlx::query(
                "INSERT INTO raw_status (service_id, result, interval_secs, duration_ms, inserted_at) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(s.service_id)
            .bind(s.result.as_str())
            .bind(s.interval_secs)
            .bind(s.duration_ms)
            .bind(s.inserted_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Most recent aggregates across all services (for inspection/debug), oldest first.
    pub async fn get_recent_aggregates(&self, limit: u32) -> anyhow::Result<Vec<AggregatedStatus>> {
        let rows = sqlx::query(
            "SELECT id, service_id, result, interval_secs, aggregated_count, avg_duration_ms, timestamp_from, timestamp_to
             FROM aggregated_status ORDER BY timestamp_to DESC, id DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Self::parse_aggregated_row(&row)?);
        }
        out.reverse();
        Ok(out)
    }

    /// All aggregates of one service ordered by timestamp_from.
    pub async fn get_service_aggregates(
        &self,
        service_id: i64,
    ) -> anyhow::Result<Vec<AggregatedStatus>> {
        let rows = sqlx::query(
            "SELECT id, service_id, result, interval_secs, aggregated_count, avg_duration_ms, timestamp_from, timestamp_to
             FROM aggregated_status WHERE service_id = $1 ORDER BY timestamp_from ASC, id ASC",
        )
        .bind(service_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::parse_aggregated_row).collect()
    }

    fn parse_raw_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<RawStatus> {
        let result: String = row.try_get("result")?;
        Ok(RawStatus {
            id: Some(row.try_get("id")?),
            service_id: row.try_get("service_id")?,
            result: CheckResult::from_db(&result),
            interval_secs: row.try_get("interval_secs")?,
            duration_ms: row.try_get("duration_ms")?,
            inserted_at: row.try_get("inserted_at")?,
        })
    }

    fn parse_aggregated_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<AggregatedStatus> {
        let result: String = row.try_get("result")?;
        Ok(AggregatedStatus {
            id: Some(row.try_get("id")?),
            service_id: row.try_get("service_id")?,
            result: CheckResult::from_db(&result),
            interval_secs: row.try_get("interval_secs")?,
            aggregated_count: row.try_get("aggregated_count")?,
            avg_duration_ms: row.try_get("avg_duration_ms")?,
            timestamp_from: row.try_get("timestamp_from")?,
            timestamp_to: row.try_get("timestamp_to")?,
        })
    }
}

#[async_trait]
impl StatusStore for StatusRepo {
    #[instrument(skip(self), fields(repo = "status", operation = "fetch_raw_statuses"))]
    async fn fetch_raw_statuses(
        &self,
        from_ts: i64,
        to_ts: i64,
    ) -> anyhow::Result<Vec<RawStatus>> {
        let rows = sqlx::query(
            "SELECT id, service_id, result, interval_secs, duration_ms, inserted_at
             FROM raw_status WHERE inserted_at >= $1 AND inserted_at <= $2
             ORDER BY inserted_at ASC, id ASC",
        )
        .bind(from_ts)
        .bind(to_ts)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Self::parse_raw_row(&row)?);
        }
        Ok(out)
    }

    #[instrument(skip(self), fields(repo = "status", operation = "fetch_latest_aggregate"))]
    async fn fetch_latest_aggregate(
        &self,
        from_ts: i64,
        to_ts: i64,
        service_id: i64,
    ) -> anyhow::Result<Option<AggregatedStatus>> {
        let row = sqlx::query(
            "SELECT id, service_id, result, interval_secs, aggregated_count, avg_duration_ms, timestamp_from, timestamp_to
             FROM aggregated_status
             WHERE service_id = $1 AND timestamp_to >= $2 AND timestamp_to < $3
             ORDER BY timestamp_to DESC, id DESC LIMIT 1",
        )
        .bind(service_id)
        .bind(from_ts)
        .bind(to_ts)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_aggregated_row).transpose()
    }

    #[instrument(
        skip(self, agg),
        fields(repo = "status", operation = "save_aggregate", service_id = agg.service_id)
    )]
    async fn save_aggregate(&self, agg: &AggregatedStatus) -> anyhow::Result<()> {
        match agg.id {
            Some(id) => {
                let r = sqlx::query(
                    "UPDATE aggregated_status
                     SET result = $1, interval_secs = $2, aggregated_count = $3, avg_duration_ms = $4,
                         timestamp_from = $5, timestamp_to = $6
                     WHERE id = $7",
                )
                .bind(agg.result.as_str())
                .bind(agg.interval_secs)
                .bind(agg.aggregated_count)
                .bind(agg.avg_duration_ms)
                .bind(agg.timestamp_from)
                .bind(agg.timestamp_to)
                .bind(id)
                .execute(&self.pool)
                .await?;
                anyhow::ensure!(
                    r.rows_affected() == 1,
                    "aggregated_status row {} not found",
                    id
                );
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO aggregated_status
                    (service_id, result, interval_secs, aggregated_count, avg_duration_ms, timestamp_from, timestamp_to)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(agg.service_id)
                .bind(agg.result.as_str())
                .bind(agg.interval_secs)
                .bind(agg.aggregated_count)
                .bind(agg.avg_duration_ms)
                .bind(agg.timestamp_from)
                .bind(agg.timestamp_to)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    #[instrument(skip(self), fields(repo = "status", operation = "delete_raw_statuses"))]
    async fn delete_raw_statuses(&self, from_ts: i64, to_ts: i64) -> anyhow::Result<u64> {
        let r = sqlx::query("DELETE FROM raw_status WHERE inserted_at >= $1 AND inserted_at <= $2")
            .bind(from_ts)
            .bind(to_ts)
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected())
    }

    #[instrument(skip(self), fields(repo = "status", operation = "vacuum"))]
    async fn vacuum(&self) -> anyhow::Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }
}
