pub mod format;
pub mod pipeline;

pub use pipeline::{new_comments, Delivery, Pipeline, RunOutcome};

use async_trait::async_trait;
use bilibili::{BilibiliApi, VideoSource};
use common::{Config, CursorStore, FileCursorStore, Monitor, MonitorResult};
use feishu::{FeishuNotifier, Notifier};
use tracing::{info, warn};

pub type CommentMonitor = Pipeline<BilibiliApi, FeishuNotifier, FileCursorStore>;

impl CommentMonitor {
    pub fn from_config(config: &Config) -> MonitorResult<Self> {
        if let Err(e) = config.require_webhook() {
            warn!("{}; notifications will be skipped", e);
        }
        let notifier = FeishuNotifier::from_config(&config.feishu)?;

        Ok(Pipeline::new(
            BilibiliApi::from_config(&config.bilibili)?,
            notifier,
            FileCursorStore::new(&config.cursor_path),
            config.bilibili.uid.clone(),
        )
        .with_limits(
            config.bilibili.comment_page_size,
            config.max_displayed_comments,
        ))
    }
}

#[async_trait]
impl<S, N, C> Monitor for Pipeline<S, N, C>
where
    S: VideoSource,
    N: Notifier,
    C: CursorStore,
{
    async fn run(&self) -> MonitorResult<()> {
        match self.run_once().await? {
            RunOutcome::NewComments { item, new_count, cursor, cursor_saved, delivery } => info!(
                "{}: {} new comments, cursor {} (saved: {}), delivery {:?}",
                item.id, new_count, cursor, cursor_saved, delivery
            ),
            RunOutcome::NoNewComments { item, delivery } => {
                info!("{}: no new comments, delivery {:?}", item.id, delivery)
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Bilibili comments"
    }
}

/// Loads `.env` and the environment, then performs a single run.
pub async fn run_comment_monitor() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    let config = Config::from_env()?;
    let monitor = CommentMonitor::from_config(&config)?;
    monitor.run().await.map_err(|e| anyhow::anyhow!(e))
}
