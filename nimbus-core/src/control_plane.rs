//! Dispatch orchestration and the provider fallback protocol.
//!
//! Every action follows the same two-tier algorithm: when a real provider
//! was configured at startup, attempt it under a bounded timeout; any
//! failure is logged and the simulated provider serves the request instead.
//! Simulated-path failures are genuine data errors and propagate. The
//! decision is made fresh on every call; one failed dispatch does not
//! disable the real provider for the next.

use crate::config::ProviderSettings;
use crate::provider::{remote, CloudProvider};
use crate::providers::linode::LinodeProvider;
use crate::providers::sim::{self, SimulatedProvider};
use crate::sessions::SessionRegistry;
use chrono::Utc;
use nimbus_common::{
    catalog, CommandSession, Instance, InstanceStatus, LaunchOutcome, LaunchRequest,
    MetricSample, NimbusError, Result,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

/// The requesting principal. Every store query is scoped to this owner.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub owner_id: String,
}

impl AuthContext {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
        }
    }
}

pub struct ControlPlane {
    real: Option<Arc<dyn CloudProvider>>,
    sim: SimulatedProvider,
    sessions: SessionRegistry,
    call_timeout: Duration,
}

impl ControlPlane {
    /// Build the control plane from resolved settings. A missing or broken
    /// real provider is not an error: the simulated variant always exists
    /// as the safety net.
    pub fn new(settings: &ProviderSettings, sim: SimulatedProvider) -> Self {
        let real: Option<Arc<dyn CloudProvider>> = match &settings.api_token {
            Some(token) => match LinodeProvider::new(token.clone()) {
                Ok(provider) => {
                    info!("real provider configured, simulation kept as fallback");
                    Some(Arc::new(provider))
                }
                Err(e) => {
                    warn!("failed to initialize real provider, running simulated only: {e:#}");
                    None
                }
            },
            None => {
                info!("no provider credentials configured, running simulated only");
                None
            }
        };

        Self {
            real,
            sim,
            sessions: SessionRegistry::new(),
            call_timeout: settings.call_timeout,
        }
    }

    /// Construct with an explicit adapter. Tests inject failing stubs here
    /// to exercise the fallback deterministically.
    pub fn with_adapter(real: Option<Arc<dyn CloudProvider>>, sim: SimulatedProvider) -> Self {
        Self {
            real,
            sim,
            sessions: SessionRegistry::new(),
            call_timeout: Duration::from_secs(10),
        }
    }

    pub fn simulated(&self) -> &SimulatedProvider {
        &self.sim
    }

    /// Run one real-provider call under the configured timeout. `None`
    /// means "fall back"; the error has already been logged.
    async fn attempt<T>(
        &self,
        action: &'static str,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> Option<T> {
        match timeout(self.call_timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(action, "real provider call failed, falling back to simulation: {e:#}");
                None
            }
            Err(_) => {
                warn!(action, "real provider call timed out, falling back to simulation");
                None
            }
        }
    }

    pub async fn list_instances(&self, ctx: &AuthContext) -> Result<Vec<Instance>> {
        if let Some(real) = &self.real {
            if let Some(remotes) = self.attempt("list_instances", real.list_instances()).await {
                return Ok(remotes
                    .into_iter()
                    .map(|r| normalize_instance(ctx, r))
                    .collect());
            }
        }
        self.sim.list_instances(&ctx.owner_id).await
    }

    pub async fn launch_instance(
        &self,
        ctx: &AuthContext,
        req: &LaunchRequest,
    ) -> Result<LaunchOutcome> {
        // Validate up front so a malformed request never reaches the real
        // provider; these are caller errors, not provider errors.
        if req.name.trim().is_empty() {
            return Err(NimbusError::Validation("instance name is required".into()));
        }
        if req.instance_class.trim().is_empty() {
            return Err(NimbusError::Validation(
                "instance class is required".into(),
            ));
        }

        let has_key = req
            .ssh_public_key
            .as_deref()
            .map(str::trim)
            .is_some_and(|k| !k.is_empty());
        let has_password = req.password.as_deref().is_some_and(|p| !p.is_empty());

        if let Some(real) = &self.real {
            let spec = remote::RemoteLaunchSpec {
                name: req.name.trim().to_string(),
                instance_class: req.instance_class.trim().to_string(),
                region: req
                    .location
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(self.sim.default_region())
                    .to_string(),
                root_password: req.password.clone().filter(|p| !p.is_empty()),
                authorized_keys: if req.ssh_enabled && has_key {
                    req.ssh_public_key.iter().cloned().collect()
                } else {
                    Vec::new()
                },
            };
            if let Some(created) = self.attempt("launch_instance", real.launch_instance(&spec)).await
            {
                return Ok(LaunchOutcome {
                    ssh_key_configured: req.ssh_enabled && has_key,
                    password_set: has_password,
                    instance: normalize_instance(ctx, created),
                });
            }
        }

        self.sim.launch_instance(&ctx.owner_id, req).await
    }

    /// Detail read. Prefers the live provider view when one is configured,
    /// then the local record.
    pub async fn get_instance(&self, ctx: &AuthContext, id: &str) -> Result<Instance> {
        if let Some(real) = &self.real {
            if let Some(remotes) = self.attempt("list_instances", real.list_instances()).await {
                if let Some(found) = remotes.into_iter().find(|r| r.provider_id == id) {
                    return Ok(normalize_instance(ctx, found));
                }
            }
        }
        self.sim.get_instance(&ctx.owner_id, id).await
    }

    /// Terminate an instance. Idempotent at this boundary: a terminate on an
    /// already-terminated instance reports success so duplicate caller
    /// retries never surface as errors, even though the store's transition
    /// table rejects terminated -> terminated.
    pub async fn terminate_instance(&self, ctx: &AuthContext, id: &str) -> Result<()> {
        if let Some(real) = &self.real {
            if self
                .attempt("terminate_instance", real.terminate_instance(id))
                .await
                .is_some()
            {
                return Ok(());
            }
        }

        match self.sim.terminate_instance(&ctx.owner_id, id).await {
            Ok(_) => Ok(()),
            Err(NimbusError::InvalidTransition {
                from: InstanceStatus::Terminated,
                to: InstanceStatus::Terminated,
            }) => {
                info!(instance_id = %id, "terminate on terminated instance, treating as success");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Power off a locally tracked instance. Power toggles are served by the
    /// simulated path only.
    pub async fn stop_instance(&self, ctx: &AuthContext, id: &str) -> Result<Instance> {
        self.sim.stop_instance(&ctx.owner_id, id).await
    }

    pub async fn start_instance(&self, ctx: &AuthContext, id: &str) -> Result<Instance> {
        self.sim.start_instance(&ctx.owner_id, id).await
    }

    pub async fn instance_stats(&self, ctx: &AuthContext, id: &str) -> Result<Vec<MetricSample>> {
        if let Some(real) = &self.real {
            if let Some(metrics) = self.attempt("fetch_metrics", real.fetch_metrics(id)).await {
                return Ok(normalize_metrics(id, metrics));
            }
        }
        self.sim.instance_stats(&ctx.owner_id, id).await
    }

    /// Open a command session against an instance. The transport is always
    /// local; a real remote-execution channel is not wired up.
    pub async fn connect(&self, ctx: &AuthContext, instance_id: &str) -> Result<CommandSession> {
        let instance = self.sim.get_instance(&ctx.owner_id, instance_id).await?;
        Ok(self.sessions.connect(&instance.id).await)
    }

    pub async fn exec(&self, session_id: &str, command: &str) -> Result<String> {
        self.sessions.exec(session_id, command).await
    }

    /// Discard a session; unknown ids are a no-op.
    pub async fn disconnect(&self, session_id: &str) -> bool {
        self.sessions.disconnect(session_id).await
    }
}

/// Map a provider-shaped descriptor into the uniform instance shape,
/// default-filling fields the provider does not expose.
fn normalize_instance(ctx: &AuthContext, r: remote::RemoteInstance) -> Instance {
    let profile = catalog::profile_for(&r.instance_class);
    let status = match r.status.as_str() {
        "running" => InstanceStatus::Running,
        "stopped" | "offline" => InstanceStatus::Stopped,
        "deleting" | "deleted" | "terminated" => InstanceStatus::Terminated,
        // Transitional provider states read as running so a freshly booted
        // instance shows up immediately.
        _ => InstanceStatus::Running,
    };
    let created_at = r.created_at.unwrap_or_else(Utc::now);

    Instance {
        id: r.provider_id.clone(),
        provider_instance_id: r.provider_id,
        owner_id: ctx.owner_id.clone(),
        name: r.name,
        status,
        instance_class: r.instance_class,
        location: r.region,
        storage_gib: sim::DEFAULT_STORAGE_GIB,
        cpu_count: r.cpu_count.unwrap_or(profile.cpu_count),
        memory_gib: r
            .memory_mib
            .map(|mib| (mib / 1024).max(1) as u32)
            .unwrap_or(profile.memory_gib),
        ipv6_enabled: r.ipv6_enabled,
        ssh_enabled: false,
        username: sim::DEFAULT_USERNAME.to_string(),
        created_at,
        updated_at: created_at,
    }
}

fn normalize_metrics(instance_id: &str, mut readings: Vec<remote::RemoteMetric>) -> Vec<MetricSample> {
    readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    readings.truncate(sim::STATS_LIMIT as usize);
    readings
        .into_iter()
        .map(|m| MetricSample {
            id: Uuid::new_v4().to_string(),
            instance_id: instance_id.to_string(),
            timestamp: m.timestamp,
            cpu_usage_percent: m.cpu_percent.clamp(0.0, 100.0),
            memory_usage_percent: m.memory_percent.unwrap_or(0.0).clamp(0.0, 100.0),
            network_in_rate: m.network_in_rate.max(0.0),
            network_out_rate: m.network_out_rate.max(0.0),
        })
        .collect()
}
