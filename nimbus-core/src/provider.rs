//! Provider abstraction for the real cloud backend.
//!
//! The control plane talks to whichever backend is active through this
//! trait; the simulated variant has its own typed surface because its
//! failures are surfaced to callers while real-provider failures are not.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CloudProvider: Send + Sync {
    async fn list_instances(&self) -> Result<Vec<remote::RemoteInstance>>;

    async fn launch_instance(&self, spec: &remote::RemoteLaunchSpec)
        -> Result<remote::RemoteInstance>;

    async fn terminate_instance(&self, provider_instance_id: &str) -> Result<()>;

    /// Recent utilization readings for one instance. Providers that expose
    /// no memory series leave `memory_percent` unset; the control plane
    /// default-fills it during normalization.
    async fn fetch_metrics(&self, provider_instance_id: &str)
        -> Result<Vec<remote::RemoteMetric>>;
}

pub mod remote {
    use chrono::{DateTime, Utc};

    /// Provider-shaped instance descriptor, before normalization.
    #[derive(Clone, Debug)]
    pub struct RemoteInstance {
        pub provider_id: String,
        pub name: String,
        pub status: String,
        pub instance_class: String,
        pub region: String,
        pub cpu_count: Option<u32>,
        pub memory_mib: Option<u64>,
        pub ipv6_enabled: bool,
        pub created_at: Option<DateTime<Utc>>,
    }

    #[derive(Clone, Debug)]
    pub struct RemoteLaunchSpec {
        pub name: String,
        pub instance_class: String,
        pub region: String,
        pub root_password: Option<String>,
        pub authorized_keys: Vec<String>,
    }

    #[derive(Clone, Debug)]
    pub struct RemoteMetric {
        pub timestamp: DateTime<Utc>,
        pub cpu_percent: f64,
        pub memory_percent: Option<f64>,
        pub network_in_rate: f64,
        pub network_out_rate: f64,
    }
}
