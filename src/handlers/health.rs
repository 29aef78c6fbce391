// src/handlers/health.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::{config::Config, models::response::ApiResponse};

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub environment: String,
}

/// Liveness probe.
pub async fn health(State(config): State<Config>) -> impl IntoResponse {
    Json(ApiResponse::success(
        HealthStatus {
            status: "healthy",
            environment: config.environment,
        },
        "Server is running",
    ))
}

/// Fallback for unknown routes.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::failure("Route not found", None)),
    )
}
