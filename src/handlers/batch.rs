use axum::{extract::State, http::StatusCode, Json};

use crate::{
    handlers::{api_error, ApiError},
    jobs::{cache_warmup_job::run_cache_warmup, price_refresh_job::run_price_refresh, JobRun},
    models::batch::{BatchStatusResponse, CycleSummary, WarmupSummary},
    services::sync_status,
    AppState,
};

fn job_result<T>(job: &str, run: JobRun<T>) -> Result<Json<T>, ApiError> {
    match run {
        JobRun::Completed(summary) => Ok(Json(summary)),
        JobRun::Busy => Err(api_error(
            StatusCode::CONFLICT,
            format!("Another batch job is running, {} not started", job),
            Some("batch_busy"),
        )),
        JobRun::Failed(e) => Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{} failed: {}", job, e),
            Some("batch_failed"),
        )),
    }
}

/// Handler for POST /api/batch/price-refresh
/// Runs one refresh cycle synchronously
pub async fn trigger_price_refresh(
    State(state): State<AppState>,
) -> Result<Json<CycleSummary>, ApiError> {
    tracing::info!("Manual price refresh requested");
    let run = run_price_refresh(&state.db, &state.guard, &state.refresh).await;
    job_result("price_refresh", run)
}

/// Handler for POST /api/batch/cache-warmup
pub async fn trigger_cache_warmup(
    State(state): State<AppState>,
) -> Result<Json<WarmupSummary>, ApiError> {
    tracing::info!("Manual cache warmup requested");
    let run = run_cache_warmup(&state.db, &state.guard, &state.warmup).await;
    job_result("cache_warmup", run)
}

/// Handler for GET /api/batch/status
pub async fn batch_status(
    State(state): State<AppState>,
) -> Result<Json<BatchStatusResponse>, ApiError> {
    let jobs = sync_status::list(&state.db).await.map_err(|e| {
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Database error: {}", e),
            None,
        )
    })?;

    Ok(Json(BatchStatusResponse {
        running_job: state.guard.running_job(),
        scheduler_enabled: state.scheduler_enabled,
        jobs,
    }))
}
