use anyhow::Result;
use common::{Config, Monitor};
use comment_monitor::CommentMonitor;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Single run, for an external scheduler such as cron or a CI workflow.
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    let _ = dotenv::dotenv();

    // Configure tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from_env()?;
    info!(
        "Starting comment monitor for UID {} (cursor: {})",
        config.bilibili.uid,
        config.cursor_path.display()
    );

    let monitor = CommentMonitor::from_config(&config)?;
    match monitor.run().await {
        Ok(()) => {
            info!("{} completed successfully", monitor.name());
            Ok(())
        }
        Err(e) => {
            error!("{} failed: {}", monitor.name(), e);
            anyhow::bail!("{} run aborted: {}", monitor.name(), e)
        }
    }
}
