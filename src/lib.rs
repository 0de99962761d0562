// src/lib.rs

use axum::{
    routing::{delete, get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use services::{
    batch_guard::BatchGuard, cache_warmup::CacheWarmup, price_refresh::PriceRefreshEngine,
    product_search::ProductSearchService,
};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub search: ProductSearchService,
    pub guard: BatchGuard,
    pub refresh: Arc<PriceRefreshEngine>,
    pub warmup: Arc<CacheWarmup>,
    pub scheduler_enabled: bool,
}

pub mod entities {
    pub mod prelude;
    pub mod alerts;
    pub mod notifications;
    pub mod price_histories;
    pub mod products;
    pub mod sync_status;
    pub mod users;
    pub mod watchlists;
}

pub mod services {
    pub mod batch_guard;
    pub mod cache_warmup;
    pub mod dispatcher;
    pub mod notification_gate;
    pub mod notification_templates;
    pub mod price_refresh;
    pub mod price_store;
    pub mod product_search;
    pub mod product_source;
    pub mod recommendation;
    pub mod search_cache;
    pub mod sync_status;
}

pub mod config;
pub mod handlers;
pub mod jobs;
pub mod models;

#[cfg(test)]
mod test_support;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/products/external-search",
            get(handlers::search::external_search),
        )
        .route("/api/cache/stats", get(handlers::cache::cache_stats))
        .route("/api/cache", delete(handlers::cache::clear_cache))
        .route(
            "/api/batch/price-refresh",
            post(handlers::batch::trigger_price_refresh),
        )
        .route(
            "/api/batch/cache-warmup",
            post(handlers::batch::trigger_cache_warmup),
        )
        .route("/api/batch/status", get(handlers::batch::batch_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
