//! Durable record of instances and their metric history.
//!
//! The store is the single source of truth for simulated instances: every
//! status mutation goes through [`InstanceStore::update_status`], which
//! enforces the transition table with a conditional UPDATE. All instance
//! queries are scoped to the calling owner; there is no cross-owner
//! visibility.

use chrono::{DateTime, Utc};
use nimbus_common::{
    catalog, Instance, InstanceStatus, MetricSample, NimbusError, ParseStatusError, Result,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};
use uuid::Uuid;

pub mod migrations;

#[cfg(test)]
mod tests;

/// Launch-time configuration for a new instance record. Defaults are applied
/// by the caller before this reaches the store.
#[derive(Debug, Clone)]
pub struct NewInstance {
    pub name: String,
    pub instance_class: String,
    pub location: String,
    pub storage_gib: u32,
    pub ipv6_enabled: bool,
    pub ssh_enabled: bool,
    pub username: String,
}

#[derive(Clone)]
pub struct InstanceStore {
    pool: SqlitePool,
}

impl InstanceStore {
    /// Open (and migrate) a store backed by a database file.
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| NimbusError::Database(sqlx::Error::Io(e)))?;
            }
        }

        let options = SqliteConnectOptions::from_str(&db_path.to_string_lossy())?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        migrations::run(&store.pool).await?;
        info!("instance store ready at {}", db_path.display());
        Ok(store)
    }

    /// Open an in-memory store (used by tests and throwaway deployments).
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        migrations::run(&store.pool).await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ========================
    // Instance operations
    // ========================

    /// Insert a new instance with status `running` and
    /// `created_at == updated_at`.
    pub async fn create(&self, owner_id: &str, spec: &NewInstance) -> Result<Instance> {
        if spec.name.trim().is_empty() {
            return Err(NimbusError::Validation("instance name is required".into()));
        }
        if spec.instance_class.trim().is_empty() {
            return Err(NimbusError::Validation(
                "instance class is required".into(),
            ));
        }

        let profile = catalog::profile_for(&spec.instance_class);
        if !catalog::is_known(&spec.instance_class) {
            warn!(
                instance_class = %spec.instance_class,
                "unrecognized instance class, applying default profile"
            );
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let instance = Instance {
            id: id.clone(),
            provider_instance_id: id,
            owner_id: owner_id.to_string(),
            name: spec.name.trim().to_string(),
            status: InstanceStatus::Running,
            instance_class: spec.instance_class.trim().to_string(),
            location: spec.location.clone(),
            storage_gib: spec.storage_gib,
            cpu_count: profile.cpu_count,
            memory_gib: profile.memory_gib,
            ipv6_enabled: spec.ipv6_enabled,
            ssh_enabled: spec.ssh_enabled,
            username: spec.username.clone(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO instances (
                id, provider_instance_id, owner_id, name, status, instance_class,
                location, storage_gib, cpu_count, memory_gib,
                ipv6_enabled, ssh_enabled, username, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&instance.id)
        .bind(&instance.provider_instance_id)
        .bind(&instance.owner_id)
        .bind(&instance.name)
        .bind(instance.status.as_str())
        .bind(&instance.instance_class)
        .bind(&instance.location)
        .bind(instance.storage_gib)
        .bind(instance.cpu_count)
        .bind(instance.memory_gib)
        .bind(instance.ipv6_enabled)
        .bind(instance.ssh_enabled)
        .bind(&instance.username)
        .bind(instance.created_at)
        .bind(instance.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(instance)
    }

    /// All instances for the owner, newest first.
    pub async fn list(&self, owner_id: &str) -> Result<Vec<Instance>> {
        let rows = sqlx::query(
            "SELECT * FROM instances
             WHERE owner_id = ?
             ORDER BY created_at DESC, id DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(instance_from_row).collect()
    }

    pub async fn get(&self, owner_id: &str, id: &str) -> Result<Instance> {
        let row = sqlx::query("SELECT * FROM instances WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => instance_from_row(&row),
            None => Err(NimbusError::NotFound { id: id.to_string() }),
        }
    }

    /// Apply a status transition, bumping `updated_at`.
    ///
    /// The UPDATE is conditional on the current status being a legal source
    /// for `next`; zero affected rows resolves to either NotFound or
    /// InvalidTransition by re-reading the record.
    pub async fn update_status(
        &self,
        owner_id: &str,
        id: &str,
        next: InstanceStatus,
    ) -> Result<Instance> {
        let sources = InstanceStatus::sources_of(next);
        let placeholders = vec!["?"; sources.len()].join(", ");
        let sql = format!(
            "UPDATE instances
             SET status = ?, updated_at = ?
             WHERE id = ? AND owner_id = ? AND status IN ({placeholders})"
        );

        let mut query = sqlx::query(&sql)
            .bind(next.as_str())
            .bind(Utc::now())
            .bind(id)
            .bind(owner_id);
        for source in &sources {
            query = query.bind(source.as_str());
        }

        let res = query.execute(&self.pool).await?;
        if res.rows_affected() == 0 {
            let current: Option<String> =
                sqlx::query_scalar("SELECT status FROM instances WHERE id = ? AND owner_id = ?")
                    .bind(id)
                    .bind(owner_id)
                    .fetch_optional(&self.pool)
                    .await?;

            return match current {
                None => Err(NimbusError::NotFound { id: id.to_string() }),
                Some(raw) => {
                    let from = raw.parse().map_err(corrupt_status)?;
                    Err(NimbusError::InvalidTransition { from, to: next })
                }
            };
        }

        self.get(owner_id, id).await
    }

    // ========================
    // Metric operations
    // ========================

    /// Persist a sample, keeping per-instance timestamps strictly increasing.
    ///
    /// A sample dated at or before the stored maximum is nudged 1 ms past it
    /// so concurrent appends for the same instance stay well ordered. Returns
    /// the sample as stored.
    pub async fn append_metric(&self, sample: &MetricSample) -> Result<MetricSample> {
        let mut tx = self.pool.begin().await?;

        let last: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT MAX(timestamp) FROM metric_samples WHERE instance_id = ?")
                .bind(&sample.instance_id)
                .fetch_one(&mut *tx)
                .await?;

        let mut stored = sample.clone();
        if let Some(last) = last {
            if stored.timestamp <= last {
                stored.timestamp = last + chrono::Duration::milliseconds(1);
            }
        }

        sqlx::query(
            r#"
            INSERT INTO metric_samples (
                id, instance_id, timestamp,
                cpu_usage_percent, memory_usage_percent,
                network_in_rate, network_out_rate
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&stored.id)
        .bind(&stored.instance_id)
        .bind(stored.timestamp)
        .bind(stored.cpu_usage_percent)
        .bind(stored.memory_usage_percent)
        .bind(stored.network_in_rate)
        .bind(stored.network_out_rate)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(stored)
    }

    /// Most recent samples for an instance, newest first.
    pub async fn recent_metrics(&self, instance_id: &str, limit: u32) -> Result<Vec<MetricSample>> {
        let rows = sqlx::query(
            "SELECT * FROM metric_samples
             WHERE instance_id = ?
             ORDER BY timestamp DESC, id DESC
             LIMIT ?",
        )
        .bind(instance_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(sample_from_row).collect()
    }
}

fn instance_from_row(row: &SqliteRow) -> Result<Instance> {
    let status: String = row.try_get("status")?;
    Ok(Instance {
        id: row.try_get("id")?,
        provider_instance_id: row.try_get("provider_instance_id")?,
        owner_id: row.try_get("owner_id")?,
        name: row.try_get("name")?,
        status: status.parse().map_err(corrupt_status)?,
        instance_class: row.try_get("instance_class")?,
        location: row.try_get("location")?,
        storage_gib: row.try_get("storage_gib")?,
        cpu_count: row.try_get("cpu_count")?,
        memory_gib: row.try_get("memory_gib")?,
        ipv6_enabled: row.try_get("ipv6_enabled")?,
        ssh_enabled: row.try_get("ssh_enabled")?,
        username: row.try_get("username")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn sample_from_row(row: &SqliteRow) -> Result<MetricSample> {
    Ok(MetricSample {
        id: row.try_get("id")?,
        instance_id: row.try_get("instance_id")?,
        timestamp: row.try_get("timestamp")?,
        cpu_usage_percent: row.try_get("cpu_usage_percent")?,
        memory_usage_percent: row.try_get("memory_usage_percent")?,
        network_in_rate: row.try_get("network_in_rate")?,
        network_out_rate: row.try_get("network_out_rate")?,
    })
}

fn corrupt_status(err: ParseStatusError) -> NimbusError {
    NimbusError::Database(sqlx::Error::ColumnDecode {
        index: "status".into(),
        source: Box::new(err),
    })
}
