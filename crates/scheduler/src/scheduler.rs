use anyhow::Result;
use tokio_cron_scheduler::{JobScheduler, Job};
use tracing::{info, error, warn};
use time::OffsetDateTime;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lets at most one run hold the slot; the slot frees itself when the permit drops.
#[derive(Clone, Default)]
pub struct RunGuard {
    busy: Arc<AtomicBool>,
}

pub struct RunPermit {
    busy: Arc<AtomicBool>,
}

impl RunGuard {
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit { busy: self.busy.clone() })
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

pub struct PollScheduler {
    scheduler: JobScheduler,
}

impl PollScheduler {
    pub async fn new() -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        
        Ok(Self {
            scheduler,
        })
    }

    /// Registers `job_fn` on a six-field cron expression; ticks that land on a live run are skipped.
    pub async fn add_job<F, Fut>(&mut self, cron_expression: &str, job_fn: F) -> Result<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        info!("Scheduling job with cron: {}", cron_expression);

        let job_fn = Arc::new(job_fn);
        let guard = RunGuard::default();
        let job = Job::new_async(cron_expression, move |_uuid, _l| {
            let job_fn = job_fn.clone();
            let guard = guard.clone();
            Box::pin(async move {
                let Some(_permit) = guard.try_acquire() else {
                    warn!("Previous run still in progress; skipping tick");
                    return;
                };
                info!("Executing scheduled job at {}", OffsetDateTime::now_utc());
                match job_fn().await {
                    Ok(()) => info!("Scheduled job completed successfully"),
                    Err(e) => error!("Scheduled job failed: {}", e),
                }
            })
        })?;

        self.scheduler.add(job).await?;
        Ok(())
    }

    pub async fn start(&self) -> Result<()> {
        info!("Starting scheduler...");
        self.scheduler.start().await?;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down scheduler...");
        self.scheduler.shutdown().await?;
        Ok(())
    }

    pub async fn run_forever(&self) -> Result<()> {
        self.start().await?;
        
        // Keep the scheduler running
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(60)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_blocks_overlap() {
        let guard = RunGuard::default();
        let permit = guard.try_acquire();
        assert!(permit.is_some());
        assert!(guard.clone().try_acquire().is_none());
        drop(permit);
        assert!(guard.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_add_job_accepts_default_cron() {
        let mut scheduler = PollScheduler::new().await.unwrap();
        scheduler
            .add_job(common::config::DEFAULT_CRON, || async { Ok(()) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_add_job_rejects_bad_cron() {
        let mut scheduler = PollScheduler::new().await.unwrap();
        let result = scheduler.add_job("every five minutes", || async { Ok(()) }).await;
        assert!(result.is_err());
    }
}
