use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    handlers::{api_error, ApiError},
    models::search::{ExternalSearchQuery, ExternalSearchResponse},
    AppState,
};

/// Handler for GET /api/products/external-search
/// Searches the marketplace through the result cache
pub async fn external_search(
    State(state): State<AppState>,
    Query(query): Query<ExternalSearchQuery>,
) -> Result<Json<ExternalSearchResponse>, ApiError> {
    if let Err(e) = query.validate() {
        return Err(api_error(StatusCode::BAD_REQUEST, e, Some("invalid_query")));
    }

    let keyword = query.keyword.trim();
    tracing::info!(
        "External search: keyword={} page={} limit={}",
        keyword,
        query.page,
        query.limit
    );

    let found = state
        .search
        .search(keyword, query.page, query.limit)
        .await
        .map_err(|e| {
            tracing::error!("External search failed for '{}': {}", keyword, e);
            api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Product search unavailable: {}", e),
                Some("source_unavailable"),
            )
        })?;

    if found.page.products.is_empty() {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("No products found for '{}'", keyword),
            Some("not_found"),
        ));
    }

    Ok(Json(ExternalSearchResponse {
        status: "success".to_string(),
        products: found.page.products,
        total: found.page.total,
        page: query.page,
        limit: query.limit,
        cached: found.cached,
    }))
}
