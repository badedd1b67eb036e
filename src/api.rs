use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use crate::models::TaskRequest;
use crate::pipeline::TaskRunner;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub runner: Arc<TaskRunner>,
    pub shared_secret: String,
}

pub type SharedState = Arc<AppState>;

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    /// Wrong shared secret. Reported in the body only; the status stays 200.
    Denied,
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Denied => {
                (StatusCode::OK, Json(json!({"message": "permission Denied"}))).into_response()
            }
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({"error": msg}))).into_response()
            }
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api-endpoint", post(submit_task))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn root() -> impl IntoResponse {
    Json(json!({"message": "API is running"}))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Authenticate, validate, then hand the round to a background task.
async fn submit_task(
    State(state): State<SharedState>,
    Json(request): Json<TaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.secret != state.shared_secret {
        tracing::warn!(
            task = %request.task,
            nonce = %request.nonce,
            "Rejected request with wrong secret"
        );
        return Err(ApiError::Denied);
    }
    request
        .validate()
        .map_err(|msg| ApiError::BadRequest(msg.to_string()))?;

    tracing::info!(
        task = %request.task,
        nonce = %request.nonce,
        round = request.round,
        "Accepted task"
    );
    // Detached: the round outlives the response.
    let _ = state.runner.spawn(request);

    Ok(Json(json!({"message": "Accepted"})))
}
