use crate::models::chat::{ClearResponse, ConversationResponse};
use crate::services::conversation::SessionStore;
use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

/// Transcript of a session; unknown or expired sessions yield an empty list
pub async fn get_conversation_handler(
    State(sessions): State<SessionStore>,
    Path(session_id): Path<String>,
) -> Json<ConversationResponse> {
    let messages = sessions.get(&session_id);

    Json(ConversationResponse {
        success: true,
        message_count: messages.len(),
        session_id,
        messages,
    })
}

pub async fn clear_conversation_handler(
    State(sessions): State<SessionStore>,
    Path(session_id): Path<String>,
) -> Json<ClearResponse> {
    let removed = sessions.clear(&session_id);
    info!("Clear session {} (existed={})", session_id, removed);

    Json(ClearResponse {
        success: true,
        message: "Conversation cleared".to_string(),
    })
}
