//! Database migrations for the instance store.

use nimbus_common::Result;
use sqlx::SqlitePool;
use tracing::info;

const SCHEMA_VERSION: i64 = 1;

pub async fn run(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current_version: Option<i64> =
        sqlx::query_scalar("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(pool)
            .await?;
    let current_version = current_version.unwrap_or(0);

    if current_version >= SCHEMA_VERSION {
        return Ok(());
    }

    info!(
        "migrating instance store from version {} to {}",
        current_version, SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_to_v1(pool).await?;
    }

    sqlx::query("DELETE FROM schema_version")
        .execute(pool)
        .await?;
    sqlx::query("INSERT INTO schema_version (version) VALUES (?1)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn migrate_to_v1(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS instances (
            id TEXT PRIMARY KEY,
            provider_instance_id TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            name TEXT NOT NULL,
            status TEXT NOT NULL,
            instance_class TEXT NOT NULL,
            location TEXT NOT NULL,
            storage_gib INTEGER NOT NULL,
            cpu_count INTEGER NOT NULL,
            memory_gib INTEGER NOT NULL,
            ipv6_enabled INTEGER NOT NULL DEFAULT 0,
            ssh_enabled INTEGER NOT NULL DEFAULT 0,
            username TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_instances_owner_created
         ON instances (owner_id, created_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS metric_samples (
            id TEXT PRIMARY KEY,
            instance_id TEXT NOT NULL REFERENCES instances (id),
            timestamp TEXT NOT NULL,
            cpu_usage_percent REAL NOT NULL,
            memory_usage_percent REAL NOT NULL,
            network_in_rate REAL NOT NULL,
            network_out_rate REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_metric_samples_instance_time
         ON metric_samples (instance_id, timestamp)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
