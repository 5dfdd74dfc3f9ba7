use axum::http::HeaderMap;
use nimbus_core::{AuthContext, ControlPlane};
use std::sync::Arc;

pub struct AppState {
    pub control: ControlPlane,
    /// Owner applied when the caller sends no `x-owner-id` header. Real
    /// authentication lives in the surrounding deployment, not here.
    pub default_owner: String,
}

impl AppState {
    pub fn new(control: ControlPlane, default_owner: String) -> Arc<Self> {
        Arc::new(Self {
            control,
            default_owner,
        })
    }

    /// Resolve the requesting principal from headers.
    pub fn auth_context(&self, headers: &HeaderMap) -> AuthContext {
        let owner = headers
            .get("x-owner-id")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.default_owner);
        AuthContext::new(owner)
    }
}
