// Table and index definitions for raw and aggregated statuses.

use sqlx::SqlitePool;

/// Creates raw_status and its index if not present.
pub(super) async fn init_raw_table(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS raw_status (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            service_id INTEGER NOT NULL,
            result TEXT NOT NULL,
            interval_secs INTEGER NOT NULL,
            duration_ms INTEGER NOT NULL,
            inserted_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_raw_status_inserted_at ON raw_status(inserted_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Creates aggregated_status and its (service_id, timestamp_to) index if not present.
pub(super) async fn init_aggregated_table(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS aggregated_status (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            service_id INTEGER NOT NULL,
            result TEXT NOT NULL,
            interval_secs INTEGER NOT NULL,
            aggregated_count INTEGER NOT NULL CHECK (aggregated_count >= 1),
            avg_duration_ms REAL NOT NULL,
            timestamp_from INTEGER NOT NULL,
            timestamp_to INTEGER NOT NULL,
            CHECK (timestamp_from <= timestamp_to)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_aggregated_service_to ON aggregated_status(service_id, timestamp_to)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
