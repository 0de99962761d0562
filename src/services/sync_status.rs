//! Sync status service for tracking batch job runs
//!
//! One row per job: last attempt, last success, last error, run counters and
//! the summary of the last successful run.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::sync_status::{self, Entity as SyncStatus};
use crate::models::batch::JobStatusEntry;

/// Job names for tracking sync status
pub mod jobs {
    pub const PRICE_REFRESH: &str = "price_refresh";
    pub const CACHE_WARMUP: &str = "cache_warmup";
}

enum Outcome {
    Success(serde_json::Value),
    Failure(String),
    Skipped,
}

async fn record(
    db: &DatabaseConnection,
    job_name: &str,
    outcome: Outcome,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let now = Utc::now();

    let existing = SyncStatus::find()
        .filter(sync_status::Column::JobName.eq(job_name))
        .one(db)
        .await?;

    let current = match existing {
        Some(record) => record,
        None => {
            sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_success_at: Set(None),
                last_attempt_at: Set(None),
                last_error: Set(None),
                last_summary: Set(None),
                success_count: Set(0),
                error_count: Set(0),
                skipped_count: Set(0),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    let mut active: sync_status::ActiveModel = current.clone().into();
    match outcome {
        Outcome::Success(summary) => {
            active.last_success_at = Set(Some(now));
            active.last_attempt_at = Set(Some(now));
            active.last_error = Set(None);
            active.last_summary = Set(Some(summary));
            active.success_count = Set(current.success_count + 1);
        }
        Outcome::Failure(error) => {
            active.last_attempt_at = Set(Some(now));
            active.last_error = Set(Some(error));
            active.error_count = Set(current.error_count + 1);
        }
        Outcome::Skipped => {
            active.skipped_count = Set(current.skipped_count + 1);
        }
    }

    active.update(db).await?;
    Ok(())
}

/// Record a successful run with its summary
pub async fn record_success(
    db: &DatabaseConnection,
    job_name: &str,
    summary: serde_json::Value,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    record(db, job_name, Outcome::Success(summary)).await?;
    tracing::debug!("[{}] Recorded successful run", job_name);
    Ok(())
}

/// Record a failed run
pub async fn record_failure(
    db: &DatabaseConnection,
    job_name: &str,
    error: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    record(db, job_name, Outcome::Failure(error.to_string())).await?;
    tracing::debug!("[{}] Recorded failed run: {}", job_name, error);
    Ok(())
}

/// Record a tick skipped because the batch guard was held
pub async fn record_skipped(
    db: &DatabaseConnection,
    job_name: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    record(db, job_name, Outcome::Skipped).await?;
    tracing::debug!("[{}] Recorded skipped tick", job_name);
    Ok(())
}

pub async fn list(
    db: &DatabaseConnection,
) -> Result<Vec<JobStatusEntry>, Box<dyn std::error::Error + Send + Sync>> {
    let rows = SyncStatus::find()
        .order_by_asc(sync_status::Column::JobName)
        .all(db)
        .await?;

    Ok(rows.into_iter().map(JobStatusEntry::from).collect())
}

impl From<sync_status::Model> for JobStatusEntry {
    fn from(model: sync_status::Model) -> Self {
        Self {
            job_name: model.job_name,
            last_success_at: model.last_success_at,
            last_attempt_at: model.last_attempt_at,
            last_error: model.last_error,
            success_count: model.success_count,
            error_count: model.error_count,
            skipped_count: model.skipped_count,
        }
    }
}
