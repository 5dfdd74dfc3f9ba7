use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod error;

pub use error::{NimbusError, ParseStatusError, Result};

// --- Enums ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Running,
    Stopped,
    Terminated,
}

impl InstanceStatus {
    /// Legal status transitions. Terminated is terminal: it appears only as
    /// a target, never as a source.
    pub const TRANSITIONS: &'static [(InstanceStatus, InstanceStatus)] = &[
        (InstanceStatus::Running, InstanceStatus::Stopped),
        (InstanceStatus::Running, InstanceStatus::Terminated),
        (InstanceStatus::Stopped, InstanceStatus::Running),
        (InstanceStatus::Stopped, InstanceStatus::Terminated),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Running => "running",
            InstanceStatus::Stopped => "stopped",
            InstanceStatus::Terminated => "terminated",
        }
    }

    pub fn can_transition_to(self, next: InstanceStatus) -> bool {
        Self::TRANSITIONS.contains(&(self, next))
    }

    /// Statuses from which `next` is reachable.
    pub fn sources_of(next: InstanceStatus) -> Vec<InstanceStatus> {
        Self::TRANSITIONS
            .iter()
            .filter(|(_, to)| *to == next)
            .map(|(from, _)| *from)
            .collect()
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InstanceStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "running" => Ok(InstanceStatus::Running),
            "stopped" => Ok(InstanceStatus::Stopped),
            "terminated" => Ok(InstanceStatus::Terminated),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

// --- Entities ---

/// Normalized instance shape returned to callers regardless of which
/// provider (real or simulated) served the request.
#[derive(Debug, Serialize, Deserialize, Clone, utoipa::ToSchema)]
pub struct Instance {
    pub id: String,
    /// Provider-side identifier; equals `id` for simulated instances.
    pub provider_instance_id: String,
    pub owner_id: String,
    pub name: String,
    pub status: InstanceStatus,
    pub instance_class: String,
    pub location: String,
    pub storage_gib: u32,
    pub cpu_count: u32,
    pub memory_gib: u32,
    pub ipv6_enabled: bool,
    pub ssh_enabled: bool,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One timestamped utilization reading for an instance.
#[derive(Debug, Serialize, Deserialize, Clone, utoipa::ToSchema)]
pub struct MetricSample {
    pub id: String,
    pub instance_id: String,
    pub timestamp: DateTime<Utc>,
    /// Percentage in [0, 100].
    pub cpu_usage_percent: f64,
    /// Percentage in [0, 100].
    pub memory_usage_percent: f64,
    /// Bytes per second, non-negative.
    pub network_in_rate: f64,
    /// Bytes per second, non-negative.
    pub network_out_rate: f64,
}

/// Ephemeral remote-command channel handle. Lives only in process memory;
/// intentionally not tied to the instance lifecycle.
#[derive(Debug, Serialize, Clone, utoipa::ToSchema)]
pub struct CommandSession {
    pub session_id: String,
    pub instance_id: String,
    pub opened_at: DateTime<Utc>,
    pub commands_run: u32,
}

// --- Requests / outcomes ---

#[derive(Debug, Deserialize, Clone, utoipa::ToSchema)]
pub struct LaunchRequest {
    pub name: String,
    pub instance_class: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub storage_gib: Option<u32>,
    #[serde(default)]
    pub ipv6_enabled: bool,
    #[serde(default)]
    pub ssh_enabled: bool,
    #[serde(default)]
    pub username: Option<String>,
    /// Key material is reduced to a boolean in the outcome and never stored.
    #[serde(default)]
    pub ssh_public_key: Option<String>,
    /// Password is reduced to a boolean in the outcome and never stored.
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Clone, utoipa::ToSchema)]
pub struct LaunchOutcome {
    pub instance: Instance,
    pub ssh_key_configured: bool,
    pub password_set: bool,
}
