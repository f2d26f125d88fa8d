mod scheduler;

use anyhow::Result;
use common::{Config, Monitor};
use comment_monitor::CommentMonitor;
use scheduler::PollScheduler;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

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
    info!("Starting comment monitor scheduler for UID {}", config.bilibili.uid);

    let monitor = Arc::new(CommentMonitor::from_config(&config)?);
    let mut scheduler = PollScheduler::new().await?;

    scheduler.add_job(&config.cron, move || {
        let monitor = monitor.clone();
        async move {
            monitor.run().await?;
            Ok(())
        }
    }).await?;

    info!("Scheduler configured with cron {}", config.cron);
    info!("Press Ctrl+C to stop the scheduler");

    // Handle graceful shutdown
    tokio::select! {
        result = scheduler.run_forever() => {
            result?;
            info!("Scheduler stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt signal, shutting down...");
        }
    }
    scheduler.shutdown().await?;

    Ok(())
}
