pub mod instances;
pub mod metrics;
pub mod sessions;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nimbus_common::NimbusError;
use serde_json::json;
use tracing::error;

/// Map a surfaced control-plane error onto an HTTP response.
pub(crate) fn error_response(err: NimbusError) -> Response {
    let (status, message) = match &err {
        NimbusError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        NimbusError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        NimbusError::InvalidTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
        NimbusError::SessionNotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        NimbusError::Database(e) => {
            error!("database error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal storage error".to_string(),
            )
        }
    };
    (status, Json(json!({ "error": message }))).into_response()
}
