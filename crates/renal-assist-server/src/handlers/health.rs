use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::config::GeneratorConfig;
use crate::utils::error::ApiError;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    status: String,
    generator: String,
}

/// Always 200: the stores are in-process and the local responder covers a
/// missing generator. `generator` says which of the two will answer.
pub async fn readiness_check(
    State(generator): State<Arc<GeneratorConfig>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let mode = if generator.is_configured() {
        "configured"
    } else {
        "local-only"
    };

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready".to_string(),
            generator: mode.to_string(),
        }),
    )
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
