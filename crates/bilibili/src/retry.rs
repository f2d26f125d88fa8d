use std::future::Future;
use std::time::Duration;

use common::{BilibiliConfig, MonitorResult};
use rand::Rng;
use tracing::warn;

/// Bounded retry for rate-limit and timeout failures, with a random pause between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            jitter_min: Duration::from_secs(1),
            jitter_max: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &BilibiliConfig) -> Self {
        Self {
            max_retries: 1,
            jitter_min: config.retry_jitter_min,
            jitter_max: config.retry_jitter_max,
        }
    }

    /// Same budget, no waiting. Meant for tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
        }
    }

    fn jitter(&self) -> Duration {
        let min = self.jitter_min.as_millis() as u64;
        let max = (self.jitter_max.as_millis() as u64).max(min);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> MonitorResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = MonitorResult<T>>,
    {
        let mut retries = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && retries < self.max_retries => {
                    retries += 1;
                    let delay = self.jitter();
                    warn!(
                        "{} failed ({}); retry {}/{} in {:?}",
                        what, e, retries, self.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
