//! Batch Scheduler Guard
//!
//! Single non-blocking lock shared by every job that spends the marketplace
//! call budget. A tick that finds the lock taken is skipped, not queued.

use parking_lot::Mutex as SyncMutex;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Clone, Default)]
pub struct BatchGuard {
    lock: Arc<Mutex<()>>,
    running: Arc<SyncMutex<Option<String>>>,
}

/// Clears the running job name when the job finishes, fails or is dropped
struct RunningJob<'a> {
    running: &'a SyncMutex<Option<String>>,
}

impl Drop for RunningJob<'_> {
    fn drop(&mut self) {
        *self.running.lock() = None;
    }
}

impl BatchGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the job currently holding the guard
    pub fn running_job(&self) -> Option<String> {
        self.running.lock().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// Runs `job` if the guard is free, otherwise returns None immediately
    pub async fn run<F, T>(&self, job_name: &str, job: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let Ok(_permit) = self.lock.try_lock() else {
            warn!(
                job = job_name,
                running = ?self.running_job(),
                "Another batch job is running, skipping this tick"
            );
            return None;
        };

        *self.running.lock() = Some(job_name.to_string());
        let _running = RunningJob {
            running: &self.running,
        };

        info!(job = job_name, "Batch job started");
        let output = job.await;
        info!(job = job_name, "Batch job finished");

        Some(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_runs_when_free() {
        let guard = BatchGuard::new();
        assert_eq!(guard.run("job", async { 42 }).await, Some(42));
        assert!(!guard.is_busy());
        assert_eq!(guard.running_job(), None);
    }

    #[tokio::test]
    async fn test_second_job_skipped_while_first_runs() {
        let guard = BatchGuard::new();
        let (started_tx, started_rx) = oneshot::channel();
        let (finish_tx, finish_rx) = oneshot::channel::<()>();

        let a = {
            let guard = guard.clone();
            tokio::spawn(async move {
                guard
                    .run("price_refresh", async move {
                        let _ = started_tx.send(());
                        let _ = finish_rx.await;
                        "a done"
                    })
                    .await
            })
        };

        started_rx.await.unwrap();
        assert!(guard.is_busy());
        assert_eq!(guard.running_job().as_deref(), Some("price_refresh"));

        let mut touched = false;
        let b = guard
            .run("cache_warmup", async {
                touched = true;
            })
            .await;
        assert_eq!(b, None);
        assert!(!touched);
        // Still held by A
        assert!(guard.is_busy());

        finish_tx.send(()).unwrap();
        assert_eq!(a.await.unwrap(), Some("a done"));
        assert!(!guard.is_busy());
        assert_eq!(guard.run("cache_warmup", async { 1 }).await, Some(1));
    }

    #[tokio::test]
    async fn test_released_after_panic() {
        let guard = BatchGuard::new();
        let handle = {
            let guard = guard.clone();
            tokio::spawn(async move {
                guard
                    .run("exploding", async {
                        let fail = true;
                        if fail {
                            panic!("job failed");
                        }
                    })
                    .await
            })
        };

        assert!(handle.await.is_err());
        assert!(!guard.is_busy());
        assert_eq!(guard.running_job(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_released_when_job_cancelled() {
        let guard = BatchGuard::new();
        let slow = guard.run("slow", tokio::time::sleep(Duration::from_secs(60)));
        let timed_out = tokio::time::timeout(Duration::from_secs(1), slow).await;

        assert!(timed_out.is_err());
        assert!(!guard.is_busy());
        assert_eq!(guard.running_job(), None);
    }
}
