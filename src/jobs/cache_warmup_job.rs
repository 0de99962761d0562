use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::jobs::JobRun;
use crate::models::batch::WarmupSummary;
use crate::services::batch_guard::BatchGuard;
use crate::services::cache_warmup::CacheWarmup;
use crate::services::sync_status::{self, jobs};

pub async fn run_cache_warmup(
    db: &DatabaseConnection,
    guard: &BatchGuard,
    warmup: &CacheWarmup,
) -> JobRun<WarmupSummary> {
    let Some(summary) = guard.run(jobs::CACHE_WARMUP, warmup.run()).await else {
        if let Err(e) = sync_status::record_skipped(db, jobs::CACHE_WARMUP).await {
            warn!("Failed to record skipped cache warmup: {}", e);
        }
        return JobRun::Busy;
    };

    match serde_json::to_value(&summary) {
        Ok(value) => {
            if let Err(e) = sync_status::record_success(db, jobs::CACHE_WARMUP, value).await {
                warn!("Failed to record cache warmup success: {}", e);
            }
        }
        Err(e) => warn!("Failed to serialize cache warmup summary: {}", e),
    }

    JobRun::Completed(summary)
}

pub async fn start_cache_warmup_job(
    db: DatabaseConnection,
    guard: BatchGuard,
    warmup: Arc<CacheWarmup>,
    period: Duration,
) {
    let period = period.max(Duration::from_secs(1));

    tokio::spawn(async move {
        // Run immediately on startup
        info!("Running initial cache warmup");
        run_cache_warmup(&db, &guard, &warmup).await;

        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, stopping cache warmup job");
                    break;
                }
                _ = interval.tick() => {
                    info!("Starting scheduled cache warmup");
                    run_cache_warmup(&db, &guard, &warmup).await;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::product_search::SearchCache;
    use crate::test_support::{offline_db, summary, FakeSource};

    #[tokio::test]
    async fn test_busy_guard_skips_warmup() {
        let source = Arc::new(FakeSource::new());
        source.push_ok(vec![summary("a", "Toner", 1980)]);
        let cache = Arc::new(SearchCache::new(Duration::from_secs(60), 10));
        let warmup = CacheWarmup::new(source.clone(), cache.clone(), vec!["toner".to_string()], Duration::ZERO);
        let guard = BatchGuard::new();
        let db = offline_db();

        let nested = guard
            .run("price_refresh", run_cache_warmup(&db, &guard, &warmup))
            .await;
        assert!(nested.is_some_and(|run| run.is_busy()));
        assert_eq!(source.call_count(), 0);

        let run = run_cache_warmup(&db, &guard, &warmup).await;
        assert!(matches!(run, JobRun::Completed(ref s) if s.success == 1));
        assert!(cache.contains("toner:p1:l20"));
    }
}
