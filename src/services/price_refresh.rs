//! Price Refresh Engine
//!
//! One cycle re-queries every watched product, appends a history row for
//! each successful fetch, applies price changes, hands drops to the
//! notification gate and commits everything at the end in one transaction.
//! Products are processed sequentially with a fixed delay between them so the
//! cycle stays inside the marketplace rate limit.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::models::batch::{CycleSummary, ItemFailure, PriceChange};
use crate::models::watch::{discount_rate, round2, PriceObservation, ProductPriceUpdate, WatchedProduct};
use crate::services::notification_gate::NotificationGate;
use crate::services::notification_templates::truncate_chars;
use crate::services::price_store::{PriceStore, StoreError, UnitOfWork};
use crate::services::product_source::{ProductSource, SourceError};

/// Longest product name sent as a search keyword
const MAX_KEYWORD_CHARS: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("failed to load watched products: {0}")]
    Load(#[source] StoreError),
    #[error("failed to commit cycle: {0}")]
    Commit(#[source] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per product, at least 1
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            base_delay,
        }
    }

    /// Wait after the given failed attempt (1-based): base, 2x base, 4x base...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(i64),
    /// The marketplace answered but has no matching item
    NotFound,
    Failed { attempts: u32, error: SourceError },
}

pub struct PriceRefreshEngine {
    store: Arc<dyn PriceStore>,
    source: Arc<dyn ProductSource>,
    gate: NotificationGate,
    retry: RetryPolicy,
    request_delay: Duration,
}

impl PriceRefreshEngine {
    pub fn new(
        store: Arc<dyn PriceStore>,
        source: Arc<dyn ProductSource>,
        gate: NotificationGate,
        retry: RetryPolicy,
        request_delay: Duration,
    ) -> Self {
        Self {
            store,
            source,
            gate,
            retry,
            request_delay,
        }
    }

    pub async fn fetch_latest_price(&self, product: &WatchedProduct) -> FetchOutcome {
        let keyword = truncate_chars(&product.name, MAX_KEYWORD_CHARS);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match self.source.search(&keyword, 1, 1).await {
                Ok(result) => {
                    return match result.items.first() {
                        Some(item) => FetchOutcome::Found(item.price),
                        None => FetchOutcome::NotFound,
                    };
                }
                Err(e) => e,
            };

            if !error.is_retryable() || attempt >= self.retry.max_retries {
                warn!(
                    product_id = %product.id,
                    attempts = attempt,
                    error = %error,
                    "Price fetch failed"
                );
                return FetchOutcome::Failed {
                    attempts: attempt,
                    error,
                };
            }

            let delay = self.retry.delay_after(attempt);
            warn!(
                product_id = %product.id,
                attempt,
                max_attempts = self.retry.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Price fetch failed, retrying..."
            );
            tokio::time::sleep(delay).await;
        }
    }

    pub async fn run_cycle(&self) -> Result<CycleSummary, RefreshError> {
        let started_at = Utc::now();
        let clock = tokio::time::Instant::now();

        let products = self.store.watched_products().await.map_err(RefreshError::Load)?;
        info!(total = products.len(), "Starting price refresh cycle");

        let mut unit = UnitOfWork::default();
        let mut summary = CycleSummary {
            status: "success".to_string(),
            started_at,
            finished_at: started_at,
            duration_seconds: 0.0,
            total: products.len(),
            updated: 0,
            skipped: 0,
            errors: 0,
            price_drops: 0,
            price_increases: 0,
            changes: Vec::new(),
            failures: Vec::new(),
            notifications: Vec::new(),
        };

        for (index, product) in products.iter().enumerate() {
            if index > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            match self.fetch_latest_price(product).await {
                FetchOutcome::Found(new_price) => {
                    self.apply_price(product, new_price, &mut unit, &mut summary).await;
                }
                FetchOutcome::NotFound => {
                    info!(product_id = %product.id, name = %product.name, "Product not found on marketplace, skipping");
                    summary.skipped += 1;
                }
                FetchOutcome::Failed { attempts, error } => {
                    summary.errors += 1;
                    summary.failures.push(ItemFailure {
                        product_id: product.id,
                        product_name: product.name.clone(),
                        attempts,
                        error: error.to_string(),
                    });
                }
            }
        }

        if !unit.is_empty() {
            if let Err(e) = self.store.commit(unit).await {
                error!(error = %e, "Price refresh commit failed, cycle rolled back");
                return Err(RefreshError::Commit(e));
            }
        }

        summary.finished_at = Utc::now();
        summary.duration_seconds = round2(clock.elapsed().as_secs_f64());

        info!(
            total = summary.total,
            updated = summary.updated,
            skipped = summary.skipped,
            errors = summary.errors,
            price_drops = summary.price_drops,
            price_increases = summary.price_increases,
            notifications = summary.notifications.len(),
            duration_seconds = summary.duration_seconds,
            "Price refresh cycle complete"
        );

        Ok(summary)
    }

    async fn apply_price(
        &self,
        product: &WatchedProduct,
        new_price: i64,
        unit: &mut UnitOfWork,
        summary: &mut CycleSummary,
    ) {
        let now = Utc::now();
        let old_price = product.current_price;
        let diff = new_price - old_price;

        unit.observations.push(PriceObservation::new(product, new_price, now));
        summary.updated += 1;

        if diff == 0 {
            return;
        }

        let lowest_price = match product.lowest_price {
            Some(lowest) if lowest <= new_price => Some(lowest),
            _ => Some(new_price),
        };

        unit.product_updates.push(ProductPriceUpdate {
            product_id: product.id,
            current_price: new_price,
            lowest_price,
            discount_rate: discount_rate(product.original_price, new_price),
            checked_at: now,
        });

        let change_percent = if old_price == 0 {
            0.0
        } else {
            round2(diff as f64 / old_price as f64 * 100.0)
        };

        summary.changes.push(PriceChange {
            product_id: product.id,
            product_name: product.name.clone(),
            old_price,
            new_price,
            price_diff: diff,
            is_price_drop: diff < 0,
            change_percent,
        });

        info!(
            product_id = %product.id,
            old_price,
            new_price,
            change_percent,
            "Price changed"
        );

        if diff > 0 {
            summary.price_increases += 1;
            return;
        }

        summary.price_drops += 1;

        let refreshed = WatchedProduct {
            current_price: new_price,
            lowest_price,
            checked_at: now,
            ..product.clone()
        };
        let results = self.gate.evaluate_drop(&refreshed, old_price, new_price, unit).await;
        summary.notifications.extend(results);
    }
}
