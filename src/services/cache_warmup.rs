//! Cache warmup
//!
//! Pre-loads the search cache with popular keywords so the first users after
//! a TTL rollover do not each pay for a marketplace call.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::models::batch::{WarmupResult, WarmupStatus, WarmupSummary};
use crate::models::search::SearchPage;
use crate::models::watch::round2;
use crate::services::product_search::{ProductSearchService, SearchCache};
use crate::services::product_source::ProductSource;

pub const WARMUP_PAGE: u32 = 1;
pub const WARMUP_LIMIT: u32 = 20;

pub struct CacheWarmup {
    source: Arc<dyn ProductSource>,
    cache: Arc<SearchCache>,
    keywords: Vec<String>,
    /// Pause between marketplace calls
    pacing: Duration,
}

impl CacheWarmup {
    pub fn new(
        source: Arc<dyn ProductSource>,
        cache: Arc<SearchCache>,
        keywords: Vec<String>,
        pacing: Duration,
    ) -> Self {
        Self {
            source,
            cache,
            keywords,
            pacing,
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub async fn run(&self) -> WarmupSummary {
        let clock = Instant::now();
        let mut results = Vec::with_capacity(self.keywords.len());
        let mut called_source = false;

        info!(keywords = self.keywords.len(), "Starting cache warmup");

        for keyword in &self.keywords {
            let keyword = &keyword.trim().to_string();
            let key = ProductSearchService::cache_key(keyword, WARMUP_PAGE, WARMUP_LIMIT);

            if self.cache.contains(&key) {
                results.push(WarmupResult {
                    keyword: keyword.clone(),
                    status: WarmupStatus::Skipped,
                    count: 0,
                    reason: Some("already_cached".to_string()),
                });
                continue;
            }

            if called_source && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
            called_source = true;

            let result = match self.source.search(keyword, WARMUP_PAGE, WARMUP_LIMIT).await {
                Ok(found) if found.items.is_empty() => WarmupResult {
                    keyword: keyword.clone(),
                    status: WarmupStatus::Empty,
                    count: 0,
                    reason: Some("no_results".to_string()),
                },
                Ok(found) => {
                    let count = found.items.len();
                    self.cache.set(
                        &key,
                        SearchPage {
                            products: found.items,
                            total: found.total_count,
                        },
                    );
                    WarmupResult {
                        keyword: keyword.clone(),
                        status: WarmupStatus::Success,
                        count,
                        reason: None,
                    }
                }
                Err(e) => {
                    warn!(keyword = %keyword, error = %e, "Warmup search failed");
                    WarmupResult {
                        keyword: keyword.clone(),
                        status: WarmupStatus::Error,
                        count: 0,
                        reason: Some(e.to_string()),
                    }
                }
            };
            results.push(result);
        }

        let count = |status: WarmupStatus| results.iter().filter(|r| r.status == status).count();
        let summary = WarmupSummary {
            success: count(WarmupStatus::Success),
            skipped: count(WarmupStatus::Skipped),
            empty: count(WarmupStatus::Empty),
            errors: count(WarmupStatus::Error),
            total_products: results.iter().map(|r| r.count).sum(),
            duration_seconds: round2(clock.elapsed().as_secs_f64()),
            results,
        };

        info!(
            success = summary.success,
            skipped = summary.skipped,
            empty = summary.empty,
            errors = summary.errors,
            total_products = summary.total_products,
            duration_seconds = summary.duration_seconds,
            "Cache warmup complete"
        );

        summary
    }
}
