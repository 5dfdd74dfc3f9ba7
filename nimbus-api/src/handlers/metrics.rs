// Utilization stats handlers (per-instance time series for the dashboard)
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use nimbus_common::MetricSample;
use serde::Serialize;
use std::sync::Arc;

use crate::app::state::AppState;
use crate::handlers::error_response;

#[derive(Serialize, utoipa::ToSchema)]
pub struct StatsResponse {
    pub instance_id: String,
    pub generated_at: String,
    /// Newest first.
    pub samples: Vec<MetricSample>,
}

#[utoipa::path(
    get,
    path = "/instances/{id}/stats",
    params(("id" = String, Path, description = "Instance id")),
    responses(
        (status = 200, description = "Recent utilization samples, newest first", body = StatsResponse),
        (status = 404, description = "Instance not found")
    )
)]
pub async fn instance_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let ctx = state.auth_context(&headers);
    match state.control.instance_stats(&ctx, &id).await {
        Ok(samples) => Json(StatsResponse {
            instance_id: id,
            generated_at: chrono::Utc::now().to_rfc3339(),
            samples,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}
