//! Provider configuration, resolved once at process start.
//!
//! Credential presence is a deployment-time capability switch: it decides
//! whether the control plane constructs a real provider at all. It is never
//! re-evaluated at runtime.

use std::env;
use std::fs;
use std::time::Duration;

pub const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Real-provider API token. Absent means every dispatch runs simulated.
    pub api_token: Option<String>,
    pub default_region: String,
    /// Upper bound on any single real-provider call.
    pub call_timeout: Duration,
}

impl ProviderSettings {
    pub fn from_env() -> Self {
        let default_region = env::var("NIMBUS_DEFAULT_REGION")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let call_timeout = env::var("NIMBUS_PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS));

        Self {
            api_token: resolve_api_token(),
            default_region,
            call_timeout,
        }
    }

    /// Settings with no credentials; forces every dispatch down the
    /// simulated path (used by tests and credential-less deployments).
    pub fn simulated_only(default_region: &str) -> Self {
        Self {
            api_token: None,
            default_region: default_region.to_string(),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api_token.is_some()
    }
}

/// Prefer a *_FILE secret (Docker/K8s friendly), fall back to the plain
/// env var.
fn resolve_api_token() -> Option<String> {
    let token_file = env::var("NIMBUS_API_TOKEN_FILE")
        .unwrap_or_else(|_| "/run/secrets/nimbus_api_token".to_string());
    fs::read_to_string(&token_file)
        .ok()
        .or_else(|| env::var("NIMBUS_API_TOKEN").ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
