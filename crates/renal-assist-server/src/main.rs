use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use renal_assist_server::build_router;
use renal_assist_server::config::Settings;
use renal_assist_server::services::conversation::{spawn_sweeper, SessionStore};
use renal_assist_server::services::response_cache::ResponseCache;
use renal_assist_server::services::{AiResponseOrchestrator, GeminiService, LocalResponder};
use renal_assist_server::state::AppState;
use renal_assist_server::telemetry;
use renal_assist_server::utils::{Clock, SystemClock};

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = telemetry::init_tracing()?;

    info!("🚀 Starting renal assist server...");

    // Load configuration
    let settings = Settings::load()?;
    info!("✅ Configuration loaded");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Initialize stores
    let sessions = SessionStore::new(
        settings.session.ttl(),
        settings.session.max_history,
        clock.clone(),
    );
    let cache = Arc::new(ResponseCache::new(
        settings.cache.max_size,
        settings.cache.ttl(),
        settings.cache.fallback_ttl(),
        clock,
    ));

    let _sweeper = spawn_sweeper(sessions.clone(), settings.session.sweep_interval());
    info!(
        "✅ Session sweeper started (every {}s)",
        settings.session.sweep_interval_seconds
    );

    // Initialize services
    if !settings.generator.is_configured() {
        warn!("No generator API key configured; every answer will come from the local responder");
    }
    let timeout = settings.generator.timeout();
    let generator = Arc::new(GeminiService::new(settings.generator.clone()));

    let orchestrator = Arc::new(AiResponseOrchestrator::new(
        sessions,
        cache,
        generator,
        Arc::new(LocalResponder),
        timeout,
    ));

    let app = build_router(AppState::new(orchestrator, settings.generator.clone()));

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
