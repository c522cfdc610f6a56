use crate::models::chat::{ChatRequest, ChatResponse};
use crate::services::{AiResponseOrchestrator, TurnRequest};
use crate::utils::error::ApiError;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;
use tracing::info;

pub async fn chat_handler(
    State(orchestrator): State<Arc<AiResponseOrchestrator>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    info!(
        "Chat request: session={}, user={:?}, message_len={}, has_context={}",
        session_id,
        request.user_id,
        request.message.len(),
        request.patient_context.is_some()
    );

    let reply = orchestrator
        .respond(TurnRequest {
            session_id,
            user_id: request.user_id,
            message: request.message,
            patient_context: request.patient_context,
        })
        .await?;

    Ok(Json(ChatResponse {
        success: true,
        reply: reply.reply,
        session_id: reply.session_id,
        conversation_length: reply.conversation_length,
        source: reply.source,
    }))
}
