use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Upstream request failed: {0}")]
    UpstreamError(String),

    #[error("No published items for account {0}")]
    NoItems(String),

    #[error("Rate limited by upstream: {0}")]
    RateLimited(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Failed to persist cursor: {0}")]
    PersistError(String),

    #[error("Webhook delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Configuration missing: {0}")]
    ConfigMissing(String),
}

impl MonitorError {
    /// Failures worth one more attempt under the retry policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MonitorError::RateLimited(_) | MonitorError::Timeout(_))
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            MonitorError::Timeout(e.to_string())
        } else {
            MonitorError::UpstreamError(e.to_string())
        }
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(MonitorError::RateLimited("-412".into()).is_retryable());
        assert!(MonitorError::Timeout("10s".into()).is_retryable());
        assert!(!MonitorError::UpstreamError("boom".into()).is_retryable());
        assert!(!MonitorError::NoItems("42".into()).is_retryable());
    }
}
