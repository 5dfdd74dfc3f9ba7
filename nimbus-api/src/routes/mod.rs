use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::api_docs::ApiDoc;
use crate::app::{create_cors, AppState};
use crate::handlers::{instances, metrics, sessions};

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/api-docs/openapi.json", get(openapi))
        // Instances
        .route(
            "/instances",
            get(instances::list_instances).post(instances::launch_instance),
        )
        .route(
            "/instances/{id}",
            get(instances::get_instance).delete(instances::terminate_instance),
        )
        .route("/instances/{id}/stop", post(instances::stop_instance))
        .route("/instances/{id}/start", post(instances::start_instance))
        .route("/instances/{id}/stats", get(metrics::instance_stats))
        // Sessions
        .route("/instances/{id}/connect", post(sessions::connect))
        .route("/sessions/{session_id}/exec", post(sessions::exec))
        .route("/sessions/{session_id}", delete(sessions::disconnect))
        .layer(create_cors())
        .with_state(state)
}

async fn root() -> &'static str {
    "Nimbus Control Plane API"
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
