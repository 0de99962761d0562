//! Batch job summaries and admin responses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::notification::DispatchResult;

/// Price movement detected for one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    pub product_id: Uuid,
    pub product_name: String,
    pub old_price: i64,
    pub new_price: i64,
    pub price_diff: i64,
    pub is_price_drop: bool,
    /// Rounded to 2 decimals; 0 when the old price was 0
    pub change_percent: f64,
}

/// A product whose refresh failed this cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub product_id: Uuid,
    pub product_name: String,
    pub attempts: u32,
    pub error: String,
}

/// Outcome of one price refresh cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub total: usize,
    /// Products with a successful fetch, changed or not
    pub updated: usize,
    /// Products the marketplace no longer returns
    pub skipped: usize,
    pub errors: usize,
    pub price_drops: usize,
    pub price_increases: usize,
    pub changes: Vec<PriceChange>,
    pub failures: Vec<ItemFailure>,
    pub notifications: Vec<DispatchResult>,
}

/// Outcome for one warmup keyword
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmupResult {
    pub keyword: String,
    pub status: WarmupStatus,
    pub count: usize,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmupStatus {
    Success,
    Skipped,
    Empty,
    Error,
}

/// Outcome of one cache warmup run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmupSummary {
    pub success: usize,
    pub skipped: usize,
    pub empty: usize,
    pub errors: usize,
    pub total_products: usize,
    pub duration_seconds: f64,
    pub results: Vec<WarmupResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Row of the job status listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusEntry {
    pub job_name: String,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub success_count: i64,
    pub error_count: i64,
    pub skipped_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStatusResponse {
    /// Job currently holding the batch guard
    pub running_job: Option<String>,
    pub scheduler_enabled: bool,
    pub jobs: Vec<JobStatusEntry>,
}
