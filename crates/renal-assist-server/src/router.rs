use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    let api_routes = Router::new()
        .route("/api/chat", post(handlers::chat::chat_handler))
        .route(
            "/api/conversation/{session_id}",
            get(handlers::conversation::get_conversation_handler),
        )
        .route(
            "/api/conversation/{session_id}/clear",
            post(handlers::conversation::clear_conversation_handler),
        )
        .route("/api/stats", get(handlers::stats::stats_handler))
        .route("/api/cache/clear", post(handlers::stats::clear_cache_handler))
        .route(
            "/api/check-ai-config",
            get(handlers::ai_config::check_ai_config_handler),
        );

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .fallback(handlers::health::not_found)
        .with_state(state)
        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // Tracing
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}
