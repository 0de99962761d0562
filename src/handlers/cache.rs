use axum::{extract::State, Json};

use crate::{
    models::search::CacheClearResponse,
    services::search_cache::CacheStats,
    AppState,
};

/// Handler for GET /api/cache/stats
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.search.cache().stats())
}

/// Handler for DELETE /api/cache
pub async fn clear_cache(State(state): State<AppState>) -> Json<CacheClearResponse> {
    let cleared = state.search.cache().clear();
    tracing::info!("Search cache cleared ({} entries)", cleared);
    Json(CacheClearResponse { cleared })
}
