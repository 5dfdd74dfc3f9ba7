// Remote-command session handlers (simulated terminal transport)
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::app::state::AppState;
use crate::handlers::error_response;

#[derive(Serialize, utoipa::ToSchema)]
pub struct ConnectResponse {
    pub session_id: String,
    pub instance_id: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ExecRequest {
    pub command: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ExecResponse {
    pub output: String,
}

#[utoipa::path(
    post,
    path = "/instances/{id}/connect",
    params(("id" = String, Path, description = "Instance id")),
    responses(
        (status = 200, description = "Session opened", body = ConnectResponse),
        (status = 404, description = "Instance not found")
    )
)]
pub async fn connect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let ctx = state.auth_context(&headers);
    match state.control.connect(&ctx, &id).await {
        Ok(session) => Json(ConnectResponse {
            session_id: session.session_id,
            instance_id: session.instance_id,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    post,
    path = "/sessions/{session_id}/exec",
    params(("session_id" = String, Path, description = "Session id")),
    request_body = ExecRequest,
    responses(
        (status = 200, description = "Command output", body = ExecResponse),
        (status = 404, description = "Session not found")
    )
)]
pub async fn exec(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<ExecRequest>,
) -> impl IntoResponse {
    match state.control.exec(&session_id, &req.command).await {
        Ok(output) => Json(ExecResponse { output }).into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    delete,
    path = "/sessions/{session_id}",
    params(("session_id" = String, Path, description = "Session id")),
    responses((status = 204, description = "Session discarded"))
)]
pub async fn disconnect(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    // Discard is a no-op for unknown ids; duplicate disconnects are fine.
    state.control.disconnect(&session_id).await;
    StatusCode::NO_CONTENT
}
