//! Process settings, resolved once at startup from the environment.

use anyhow::Context;
use nimbus_core::ProviderSettings;
use std::env;
use std::net::SocketAddr;

pub struct Settings {
    pub bind_addr: SocketAddr,
    pub database_path: String,
    /// Owner applied to requests without an `x-owner-id` header.
    pub default_owner: String,
    pub provider: ProviderSettings,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = env::var("NIMBUS_BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("invalid NIMBUS_BIND_ADDR")?;

        let database_path =
            env::var("NIMBUS_DB_PATH").unwrap_or_else(|_| "data/nimbus.db".to_string());

        let default_owner =
            env::var("NIMBUS_DEFAULT_OWNER").unwrap_or_else(|_| "owner-dev".to_string());

        Ok(Self {
            bind_addr,
            database_path,
            default_owner,
            provider: ProviderSettings::from_env(),
        })
    }
}
