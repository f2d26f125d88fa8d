pub mod api;
pub mod models;
pub mod retry;

pub use api::BilibiliApi;
pub use models::{Comment, Item};
pub use retry::RetryPolicy;

use async_trait::async_trait;
use common::{HttpTransport, MonitorResult};

/// Where the pipeline gets its video and comments from.
#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn fetch_latest_item(&self, account_id: &str) -> MonitorResult<Item>;

    /// Newest first, at most `limit` entries; an empty list is a valid answer.
    async fn fetch_comments(&self, item_id: &str, limit: usize) -> MonitorResult<Vec<Comment>>;
}

#[async_trait]
impl<T: HttpTransport> VideoSource for BilibiliApi<T> {
    async fn fetch_latest_item(&self, account_id: &str) -> MonitorResult<Item> {
        self.get_latest_video(account_id).await
    }

    async fn fetch_comments(&self, item_id: &str, limit: usize) -> MonitorResult<Vec<Comment>> {
        self.get_comments(item_id, limit).await
    }
}
