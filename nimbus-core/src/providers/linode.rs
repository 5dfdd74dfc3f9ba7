//! Linode-backed real provider.
//!
//! Thin JSON client over the public v4 API. Every call runs under explicit
//! connect and overall timeouts so a stalled provider can never hang a
//! dispatch; the control plane treats any error from here as a signal to
//! fall back to the simulated path.

use crate::provider::{remote, CloudProvider};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const API_BASE: &str = "https://api.linode.com/v4";

pub struct LinodeProvider {
    client: Client,
    token: String,
}

impl LinodeProvider {
    pub fn new(token: String) -> Result<Self> {
        // Default reqwest client has no overall timeout; a stalled API call
        // would otherwise block a dispatch indefinitely.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .context("failed to build provider HTTP client")?;
        Ok(Self {
            client,
            token: token.trim().to_string(),
        })
    }

    fn headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Ok(value) =
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", self.token))
        {
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        headers
    }
}

#[async_trait]
impl CloudProvider for LinodeProvider {
    async fn list_instances(&self) -> Result<Vec<remote::RemoteInstance>> {
        let url = format!("{API_BASE}/linode/instances");
        let resp = self
            .client
            .get(&url)
            .headers(self.headers())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "linode list_instances failed: status={} body={}",
                status.as_u16(),
                body
            ));
        }

        let page: InstancePage = resp.json().await?;
        Ok(page.data.into_iter().map(ApiInstance::into_remote).collect())
    }

    async fn launch_instance(
        &self,
        spec: &remote::RemoteLaunchSpec,
    ) -> Result<remote::RemoteInstance> {
        let url = format!("{API_BASE}/linode/instances");
        let mut body = json!({
            "label": spec.name,
            "type": spec.instance_class,
            "region": spec.region,
            "booted": true,
        });
        if let Some(pass) = &spec.root_password {
            body["root_pass"] = json!(pass);
        }
        if !spec.authorized_keys.is_empty() {
            body["authorized_keys"] = json!(spec.authorized_keys);
        }

        let resp = self
            .client
            .post(&url)
            .headers(self.headers())
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "linode launch_instance failed: status={} body={}",
                status.as_u16(),
                body
            ));
        }

        let created: ApiInstance = resp.json().await?;
        Ok(created.into_remote())
    }

    async fn terminate_instance(&self, provider_instance_id: &str) -> Result<()> {
        let url = format!("{API_BASE}/linode/instances/{provider_instance_id}");
        let resp = self
            .client
            .delete(&url)
            .headers(self.headers())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "linode terminate_instance failed: status={} body={}",
                status.as_u16(),
                body
            ));
        }
        Ok(())
    }

    async fn fetch_metrics(
        &self,
        provider_instance_id: &str,
    ) -> Result<Vec<remote::RemoteMetric>> {
        let url = format!("{API_BASE}/linode/instances/{provider_instance_id}/stats");
        let resp = self
            .client
            .get(&url)
            .headers(self.headers())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "linode fetch_metrics failed: status={} body={}",
                status.as_u16(),
                body
            ));
        }

        let stats: StatsResponse = resp.json().await?;
        let mut metrics = Vec::with_capacity(stats.data.cpu.len());
        for (index, point) in stats.data.cpu.iter().enumerate() {
            let Some(timestamp) = chrono::DateTime::from_timestamp_millis(point.0 as i64) else {
                continue;
            };
            metrics.push(remote::RemoteMetric {
                timestamp,
                cpu_percent: point.1.clamp(0.0, 100.0),
                // The stats endpoint has no memory series.
                memory_percent: None,
                network_in_rate: series_value(&stats.data.netv4.r#in, index),
                network_out_rate: series_value(&stats.data.netv4.out, index),
            });
        }
        Ok(metrics)
    }
}

fn series_value(series: &[(f64, f64)], index: usize) -> f64 {
    series.get(index).map(|point| point.1.max(0.0)).unwrap_or(0.0)
}

// --- API payload shapes ---

#[derive(Deserialize)]
struct InstancePage {
    data: Vec<ApiInstance>,
}

#[derive(Deserialize)]
struct ApiInstance {
    id: i64,
    label: String,
    status: String,
    #[serde(rename = "type")]
    instance_type: Option<String>,
    region: String,
    created: Option<String>,
    specs: Option<ApiSpecs>,
    ipv6: Option<String>,
}

#[derive(Deserialize)]
struct ApiSpecs {
    vcpus: Option<u32>,
    memory: Option<u64>,
}

#[derive(Deserialize)]
struct StatsResponse {
    data: ApiStats,
}

#[derive(Deserialize)]
struct ApiStats {
    #[serde(default)]
    cpu: Vec<(f64, f64)>,
    #[serde(default)]
    netv4: ApiNetSeries,
}

#[derive(Deserialize, Default)]
struct ApiNetSeries {
    #[serde(default)]
    r#in: Vec<(f64, f64)>,
    #[serde(default)]
    out: Vec<(f64, f64)>,
}

impl ApiInstance {
    fn into_remote(self) -> remote::RemoteInstance {
        // Timestamps come back without an offset, e.g. "2024-03-08T11:32:09".
        let created_at = self.created.as_deref().and_then(|raw| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        });
        let specs = self.specs.unwrap_or(ApiSpecs {
            vcpus: None,
            memory: None,
        });
        remote::RemoteInstance {
            provider_id: self.id.to_string(),
            name: self.label,
            status: self.status,
            instance_class: self.instance_type.unwrap_or_default(),
            region: self.region,
            cpu_count: specs.vcpus,
            memory_mib: specs.memory,
            ipv6_enabled: self.ipv6.map(|v| !v.is_empty()).unwrap_or(false),
            created_at,
        }
    }
}
