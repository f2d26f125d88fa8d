use async_trait::async_trait;
use crate::error::MonitorResult;

/// One scheduled unit of work: poll, detect, notify.
#[async_trait]
pub trait Monitor: Send + Sync {
    async fn run(&self) -> MonitorResult<()>;
    fn name(&self) -> &'static str;
}
