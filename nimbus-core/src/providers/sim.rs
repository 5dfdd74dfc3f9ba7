//! Locally simulated provider.
//!
//! Synthesizes instance state and utilization data out of the instance
//! store and the metric sampler. This variant is always constructible and
//! backs every dispatch when the real provider is unconfigured or failing.
//! Unlike real-provider failures, errors from here are genuine
//! data-integrity failures and are surfaced to the caller unchanged.

use crate::sampler::MetricSampler;
use crate::store::{InstanceStore, NewInstance};
use nimbus_common::{
    Instance, InstanceStatus, LaunchOutcome, LaunchRequest, MetricSample, Result,
};
use tracing::{info, warn};

/// Samples returned by an on-demand stats read.
pub const STATS_LIMIT: u32 = 10;
/// Historical samples synthesized on the first stats read of an instance.
pub const BACKFILL_COUNT: u32 = 24;
pub const BACKFILL_INTERVAL_MINUTES: i64 = 60;

pub const DEFAULT_STORAGE_GIB: u32 = 20;
pub const DEFAULT_USERNAME: &str = "admin";

pub struct SimulatedProvider {
    store: InstanceStore,
    sampler: MetricSampler,
    default_region: String,
}

impl SimulatedProvider {
    pub fn new(store: InstanceStore, sampler: MetricSampler, default_region: String) -> Self {
        Self {
            store,
            sampler,
            default_region,
        }
    }

    pub fn store(&self) -> &InstanceStore {
        &self.store
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    pub async fn list_instances(&self, owner_id: &str) -> Result<Vec<Instance>> {
        self.store.list(owner_id).await
    }

    pub async fn get_instance(&self, owner_id: &str, id: &str) -> Result<Instance> {
        self.store.get(owner_id, id).await
    }

    /// Create an instance record with launch defaults applied. Credential
    /// material is reduced to boolean flags and never persisted.
    pub async fn launch_instance(
        &self,
        owner_id: &str,
        req: &LaunchRequest,
    ) -> Result<LaunchOutcome> {
        let spec = NewInstance {
            name: req.name.clone(),
            instance_class: req.instance_class.clone(),
            location: req
                .location
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(&self.default_region)
                .to_string(),
            storage_gib: req.storage_gib.unwrap_or(DEFAULT_STORAGE_GIB),
            ipv6_enabled: req.ipv6_enabled,
            ssh_enabled: req.ssh_enabled,
            username: req
                .username
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_USERNAME)
                .to_string(),
        };

        let instance = self.store.create(owner_id, &spec).await?;
        info!(instance_id = %instance.id, name = %instance.name, "launched simulated instance");

        // Seed the chart with one live reading. An instance without its
        // first sample is tolerable; lazy backfill covers it on first read.
        let first_sample = self.sampler.sample(&instance.id);
        if let Err(e) = self.store.append_metric(&first_sample).await {
            warn!(instance_id = %instance.id, "failed to record initial metric: {}", e);
        }

        let has_key = req
            .ssh_public_key
            .as_deref()
            .map(str::trim)
            .is_some_and(|k| !k.is_empty());
        let has_password = req
            .password
            .as_deref()
            .is_some_and(|p| !p.is_empty());

        Ok(LaunchOutcome {
            ssh_key_configured: instance.ssh_enabled && has_key,
            password_set: has_password,
            instance,
        })
    }

    pub async fn terminate_instance(&self, owner_id: &str, id: &str) -> Result<Instance> {
        let instance = self
            .store
            .update_status(owner_id, id, InstanceStatus::Terminated)
            .await?;
        info!(instance_id = %id, "terminated simulated instance");
        Ok(instance)
    }

    pub async fn stop_instance(&self, owner_id: &str, id: &str) -> Result<Instance> {
        self.store
            .update_status(owner_id, id, InstanceStatus::Stopped)
            .await
    }

    pub async fn start_instance(&self, owner_id: &str, id: &str) -> Result<Instance> {
        self.store
            .update_status(owner_id, id, InstanceStatus::Running)
            .await
    }

    /// Recent samples, newest first. An instance with no recorded history
    /// gets a synthesized backfill on first read so the dashboard never
    /// renders an empty chart for a live instance.
    pub async fn instance_stats(&self, owner_id: &str, id: &str) -> Result<Vec<MetricSample>> {
        let instance = self.store.get(owner_id, id).await?;

        let recent = self.store.recent_metrics(&instance.id, STATS_LIMIT).await?;
        if !recent.is_empty() {
            return Ok(recent);
        }

        info!(instance_id = %instance.id, "no recorded samples, backfilling history");
        let history =
            self.sampler
                .sample_history(&instance.id, BACKFILL_COUNT, BACKFILL_INTERVAL_MINUTES);
        // Oldest first so the store's monotonic nudge never reorders them.
        for sample in history.iter().rev() {
            self.store.append_metric(sample).await?;
        }

        self.store.recent_metrics(&instance.id, STATS_LIMIT).await
    }
}
