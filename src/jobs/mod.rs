pub mod cache_warmup_job;
pub mod price_refresh_job;

/// Result of one attempt to run a guarded batch job
#[derive(Debug, Clone, PartialEq)]
pub enum JobRun<T> {
    Completed(T),
    /// Another job held the batch guard
    Busy,
    Failed(String),
}

impl<T> JobRun<T> {
    pub fn is_busy(&self) -> bool {
        matches!(self, JobRun::Busy)
    }
}
