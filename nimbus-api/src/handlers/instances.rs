use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use nimbus_common::{Instance, LaunchOutcome, LaunchRequest};
use serde_json::json;
use std::sync::Arc;

use crate::app::state::AppState;
use crate::handlers::error_response;

#[utoipa::path(
    get,
    path = "/instances",
    responses(
        (status = 200, description = "All instances for the caller, newest first", body = Vec<Instance>)
    )
)]
pub async fn list_instances(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let ctx = state.auth_context(&headers);
    match state.control.list_instances(&ctx).await {
        Ok(instances) => Json(instances).into_response(),
        Err(e) => error_response(e),
    }
}

// COMMAND : LAUNCH INSTANCE
#[utoipa::path(
    post,
    path = "/instances",
    request_body = LaunchRequest,
    responses(
        (status = 201, description = "Instance launched", body = LaunchOutcome),
        (status = 400, description = "Missing or invalid launch parameters")
    )
)]
pub async fn launch_instance(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LaunchRequest>,
) -> impl IntoResponse {
    let ctx = state.auth_context(&headers);
    match state.control.launch_instance(&ctx, &req).await {
        Ok(outcome) => (StatusCode::CREATED, Json(outcome)).into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    get,
    path = "/instances/{id}",
    params(("id" = String, Path, description = "Instance id")),
    responses(
        (status = 200, description = "Instance details", body = Instance),
        (status = 404, description = "Instance not found")
    )
)]
pub async fn get_instance(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let ctx = state.auth_context(&headers);
    match state.control.get_instance(&ctx, &id).await {
        Ok(instance) => Json(instance).into_response(),
        Err(e) => error_response(e),
    }
}

// COMMAND : TERMINATE INSTANCE (idempotent)
#[utoipa::path(
    delete,
    path = "/instances/{id}",
    params(("id" = String, Path, description = "Instance id")),
    responses(
        (status = 200, description = "Instance terminated (repeat terminates also succeed)"),
        (status = 404, description = "Instance not found")
    )
)]
pub async fn terminate_instance(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let ctx = state.auth_context(&headers);
    match state.control.terminate_instance(&ctx, &id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "id": id, "status": "terminated" })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    post,
    path = "/instances/{id}/stop",
    params(("id" = String, Path, description = "Instance id")),
    responses(
        (status = 200, description = "Instance stopped", body = Instance),
        (status = 409, description = "Not stoppable from its current status")
    )
)]
pub async fn stop_instance(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let ctx = state.auth_context(&headers);
    match state.control.stop_instance(&ctx, &id).await {
        Ok(instance) => Json(instance).into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    post,
    path = "/instances/{id}/start",
    params(("id" = String, Path, description = "Instance id")),
    responses(
        (status = 200, description = "Instance started", body = Instance),
        (status = 409, description = "Not startable from its current status")
    )
)]
pub async fn start_instance(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let ctx = state.auth_context(&headers);
    match state.control.start_instance(&ctx, &id).await {
        Ok(instance) => Json(instance).into_response(),
        Err(e) => error_response(e),
    }
}
