//! Cache-through product search used by the API and the warmup job

use std::sync::Arc;
use tracing::info;

use crate::models::search::SearchPage;
use crate::services::product_source::{ProductSource, SourceError};
use crate::services::search_cache::SearchResultCache;

pub type SearchCache = SearchResultCache<SearchPage>;

/// A page plus whether it came from the cache
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSearch {
    pub page: SearchPage,
    pub cached: bool,
}

#[derive(Clone)]
pub struct ProductSearchService {
    source: Arc<dyn ProductSource>,
    cache: Arc<SearchCache>,
}

impl ProductSearchService {
    pub fn new(source: Arc<dyn ProductSource>, cache: Arc<SearchCache>) -> Self {
        Self { source, cache }
    }

    /// Keyword is trimmed before formatting; the cache lowercases the rest
    pub fn cache_key(keyword: &str, page: u32, limit: u32) -> String {
        format!("{}:p{}:l{}", keyword.trim(), page, limit)
    }

    pub fn cache(&self) -> &Arc<SearchCache> {
        &self.cache
    }

    pub async fn search(
        &self,
        keyword: &str,
        page: u32,
        limit: u32,
    ) -> Result<CachedSearch, SourceError> {
        let keyword = keyword.trim();
        let key = Self::cache_key(keyword, page, limit);

        if let Some(hit) = self.cache.get(&key) {
            return Ok(CachedSearch {
                page: hit,
                cached: true,
            });
        }

        let result = self.source.search(keyword, page, limit).await?;
        let fetched = SearchPage {
            products: result.items,
            total: result.total_count,
        };

        // Empty pages are not cached so a later retry can find results
        if !fetched.products.is_empty() {
            self.cache.set(&key, fetched.clone());
            info!(keyword = %keyword, page, limit, count = fetched.products.len(), "Cached search result");
        }

        Ok(CachedSearch {
            page: fetched,
            cached: false,
        })
    }
}
