use crate::config::GeneratorConfig;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfigResponse {
    pub success: bool,
    pub api_available: bool,
    pub model: String,
    pub message: String,
}

/// Whether answers can come from the generator or only from the local responder
pub async fn check_ai_config_handler(
    State(generator): State<Arc<GeneratorConfig>>,
) -> Json<AiConfigResponse> {
    let api_available = generator.is_configured();
    let message = if api_available {
        format!("Gemini API is configured ({})", generator.model)
    } else {
        "Using local responder (Gemini API not configured)".to_string()
    };

    Json(AiConfigResponse {
        success: true,
        api_available,
        model: generator.model.clone(),
        message,
    })
}
