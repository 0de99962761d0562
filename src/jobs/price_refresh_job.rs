//! Scheduled price refresh
//!
//! Runs one refresh cycle per tick behind the batch guard and records the
//! outcome in `sync_status`. The first tick fires after the configured offset
//! so refresh and warmup do not start together.

use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::jobs::JobRun;
use crate::models::batch::CycleSummary;
use crate::services::batch_guard::BatchGuard;
use crate::services::price_refresh::PriceRefreshEngine;
use crate::services::sync_status::{self, jobs};

/// One guarded refresh cycle, shared by the scheduler and the admin endpoint
pub async fn run_price_refresh(
    db: &DatabaseConnection,
    guard: &BatchGuard,
    engine: &PriceRefreshEngine,
) -> JobRun<CycleSummary> {
    let Some(outcome) = guard.run(jobs::PRICE_REFRESH, engine.run_cycle()).await else {
        if let Err(e) = sync_status::record_skipped(db, jobs::PRICE_REFRESH).await {
            warn!("Failed to record skipped price refresh: {}", e);
        }
        return JobRun::Busy;
    };

    match outcome {
        Ok(summary) => {
            match serde_json::to_value(&summary) {
                Ok(value) => {
                    if let Err(e) = sync_status::record_success(db, jobs::PRICE_REFRESH, value).await {
                        warn!("Failed to record price refresh success: {}", e);
                    }
                }
                Err(e) => warn!("Failed to serialize price refresh summary: {}", e),
            }
            JobRun::Completed(summary)
        }
        Err(e) => {
            error!("Price refresh cycle failed: {}", e);
            let message = e.to_string();
            if let Err(e) = sync_status::record_failure(db, jobs::PRICE_REFRESH, &message).await {
                warn!("Failed to record price refresh failure: {}", e);
            }
            JobRun::Failed(message)
        }
    }
}

pub async fn start_price_refresh_job(
    db: DatabaseConnection,
    guard: BatchGuard,
    engine: Arc<PriceRefreshEngine>,
    period: Duration,
    offset: Duration,
) {
    let period = period.max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + offset, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Price refresh job started (every {}s, first run in {}s)",
            period.as_secs(),
            offset.as_secs()
        );

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received, stopping price refresh job");
                    break;
                }
                _ = interval.tick() => {
                    info!("Starting scheduled price refresh");
                    if let JobRun::Completed(summary) = run_price_refresh(&db, &guard, &engine).await {
                        info!(
                            "Scheduled price refresh done: {} updated, {} drops, {} errors",
                            summary.updated, summary.price_drops, summary.errors
                        );
                    }
                }
            }
        }
    });
}
