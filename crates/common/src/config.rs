use std::env;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Result, Context};

use crate::error::{MonitorError, MonitorResult};

pub const DEFAULT_API_BASE: &str = "https://api.bilibili.com";
pub const DEFAULT_CRON: &str = "0 */5 * * * *";

#[derive(Debug, Clone)]
pub struct BilibiliConfig {
    pub uid: String,
    pub api_base: String,
    pub comment_page_size: usize,
    pub timeout: Duration,
    pub retry_jitter_min: Duration,
    pub retry_jitter_max: Duration,
}

impl Default for BilibiliConfig {
    fn default() -> Self {
        Self {
            uid: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            comment_page_size: 10,
            timeout: Duration::from_secs(10),
            retry_jitter_min: Duration::from_millis(1_000),
            retry_jitter_max: Duration::from_millis(3_000),
        }
    }
}

#[derive(Clone)]
pub struct FeishuConfig {
    pub webhook_url: Option<String>,
    pub secret: Option<String>,
    pub timeout: Duration,
}

impl Default for FeishuConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            secret: None,
            timeout: Duration::from_secs(10),
        }
    }
}

// Keeps the webhook token and the secret out of logs.
impl std::fmt::Debug for FeishuConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeishuConfig")
            .field("webhook_url", &self.webhook_url.as_ref().map(|_| "<set>"))
            .field("secret", &self.secret.as_ref().map(|_| "<set>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bilibili: BilibiliConfig,
    pub feishu: FeishuConfig,
    pub cursor_path: PathBuf,
    pub max_displayed_comments: usize,
    pub cron: String,
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

/// Zero and unparsable values count as unset.
fn positive_secs(raw: Option<String>) -> Option<Duration> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|n| *n > 0)
        .map(Duration::from_secs)
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let uid = non_empty_var("BILIBILI_UID")
            .context("BILIBILI_UID must be set")?;

        let defaults = BilibiliConfig::default();
        let bilibili = BilibiliConfig {
            uid,
            api_base: non_empty_var("BILIBILI_API_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            comment_page_size: parse_var("COMMENT_PAGE_SIZE")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.comment_page_size),
            timeout: positive_secs(env::var("UPSTREAM_TIMEOUT_SECS").ok())
                .unwrap_or(defaults.timeout),
            retry_jitter_min: parse_var("RETRY_JITTER_MIN_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_jitter_min),
            retry_jitter_max: parse_var("RETRY_JITTER_MAX_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_jitter_max),
        };

        if bilibili.retry_jitter_min > bilibili.retry_jitter_max {
            anyhow::bail!(
                "RETRY_JITTER_MIN_MS ({:?}) must not exceed RETRY_JITTER_MAX_MS ({:?})",
                bilibili.retry_jitter_min,
                bilibili.retry_jitter_max
            );
        }

        let feishu = FeishuConfig {
            webhook_url: non_empty_var("FEISHU_WEBHOOK"),
            secret: non_empty_var("FEISHU_SECRET"),
            timeout: positive_secs(env::var("WEBHOOK_TIMEOUT_SECS").ok())
                .unwrap_or(FeishuConfig::default().timeout),
        };

        Ok(Config {
            bilibili,
            feishu,
            cursor_path: non_empty_var("CURSOR_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("last_comment_id.txt")),
            max_displayed_comments: parse_var("MAX_DISPLAYED_COMMENTS")
                .filter(|n| *n > 0)
                .unwrap_or(5),
            cron: non_empty_var("MONITOR_CRON").unwrap_or_else(|| DEFAULT_CRON.to_string()),
        })
    }

    pub fn require_webhook(&self) -> MonitorResult<&String> {
        self.feishu
            .webhook_url
            .as_ref()
            .ok_or_else(|| MonitorError::ConfigMissing("FEISHU_WEBHOOK must be set".to_string()))
    }
}
