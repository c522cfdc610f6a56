use crate::services::response_cache::ResponseCache;
use crate::services::{CombinedStats, StatsCollector};
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

pub async fn stats_handler(State(stats): State<StatsCollector>) -> Json<CombinedStats> {
    Json(stats.snapshot())
}

#[derive(Debug, Serialize)]
pub struct CacheClearResponse {
    pub success: bool,
    pub removed: usize,
}

/// Drop every cached answer; hit/miss counters are kept
pub async fn clear_cache_handler(
    State(cache): State<Arc<ResponseCache>>,
) -> Json<CacheClearResponse> {
    let removed = cache.clear();
    Json(CacheClearResponse {
        success: true,
        removed,
    })
}
