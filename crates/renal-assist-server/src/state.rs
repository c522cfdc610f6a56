use axum::extract::FromRef;
use std::sync::Arc;

use crate::config::GeneratorConfig;
use crate::services::conversation::SessionStore;
use crate::services::response_cache::ResponseCache;
use crate::services::{AiResponseOrchestrator, StatsCollector};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AiResponseOrchestrator>,
    pub sessions: SessionStore,
    pub cache: Arc<ResponseCache>,
    pub stats: StatsCollector,
    pub generator: Arc<GeneratorConfig>,
}

impl AppState {
    pub fn new(orchestrator: Arc<AiResponseOrchestrator>, generator: GeneratorConfig) -> Self {
        let sessions = orchestrator.sessions().clone();
        let cache = orchestrator.cache().clone();
        let stats = StatsCollector::new(cache.clone(), sessions.clone());
        Self {
            orchestrator,
            sessions,
            cache,
            stats,
            generator: Arc::new(generator),
        }
    }
}

impl FromRef<AppState> for Arc<AiResponseOrchestrator> {
    fn from_ref(state: &AppState) -> Self {
        state.orchestrator.clone()
    }
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Arc<ResponseCache> {
    fn from_ref(state: &AppState) -> Self {
        state.cache.clone()
    }
}

impl FromRef<AppState> for StatsCollector {
    fn from_ref(state: &AppState) -> Self {
        state.stats.clone()
    }
}

impl FromRef<AppState> for Arc<GeneratorConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.generator.clone()
    }
}
