//! API route handlers for the gateway.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use remindr_core::error::RemindError;
use remindr_core::types::DispatchRequest;

use super::server::AppState;

/// Error body returned by the notify endpoint.
#[derive(Debug)]
pub enum ApiError {
    /// The request body could not be decoded.
    BadRequest(String),
    Run(RemindError),
}

impl From<RemindError> for ApiError {
    fn from(e: RemindError) -> Self {
        ApiError::Run(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Run(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Run(e @ RemindError::NoUpcomingSessions { .. }) => (StatusCode::NOT_FOUND, e.to_string()),
            ApiError::Run(e) => {
                tracing::error!("❌ Dispatch run failed: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "remindr-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "timezone": state.service.timezone().map(|tz| tz.name().to_string()),
    }))
}

/// Run one dispatch. 200 with an empty body on success.
pub async fn notify(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DispatchRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    tracing::info!(job = %request.job_name, period = %request.job_args.period, dry_run = request.job_args.dry_run, "📨 Notify request");

    let report = state.service.run(&request, &state.shutdown).await?;
    tracing::info!(run_id = %report.run_id, sent = report.sent, dry_run = report.dry_run, "✅ Notify complete");
    Ok(StatusCode::OK)
}
