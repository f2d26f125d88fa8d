pub mod models;
pub mod signer;

pub use models::{DeliveryMessage, WebhookReply};
pub use signer::sign;

use async_trait::async_trait;
use common::{FeishuConfig, HttpTransport, MonitorError, MonitorResult, ReqwestTransport};
use time::OffsetDateTime;
use tracing::{info, warn};

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one message. Never panics on a bad endpoint; failures come back as values.
    async fn notify(&self, message: DeliveryMessage) -> MonitorResult<()>;
}

pub struct FeishuNotifier<T: HttpTransport = ReqwestTransport> {
    transport: T,
    webhook_url: Option<String>,
    secret: Option<String>,
}

impl FeishuNotifier<ReqwestTransport> {
    pub fn from_config(config: &FeishuConfig) -> MonitorResult<Self> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::with_transport(
            transport,
            config.webhook_url.clone(),
            config.secret.clone(),
        ))
    }
}

impl<T: HttpTransport> FeishuNotifier<T> {
    pub fn with_transport(transport: T, webhook_url: Option<String>, secret: Option<String>) -> Self {
        Self {
            transport,
            webhook_url: webhook_url.filter(|u| !u.trim().is_empty()),
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    fn prepare(&self, message: DeliveryMessage) -> DeliveryMessage {
        match &self.secret {
            Some(secret) => {
                let timestamp = OffsetDateTime::now_utc().unix_timestamp();
                message.signed(secret, timestamp)
            }
            None => message,
        }
    }

    pub async fn send(&self, message: DeliveryMessage) -> MonitorResult<()> {
        let url = self.webhook_url.as_ref().ok_or_else(|| {
            MonitorError::ConfigMissing("FEISHU_WEBHOOK is not set; delivery skipped".to_string())
        })?;

        let message = self.prepare(message);
        let headers = message.signature_headers();
        let payload = message.to_payload();

        let response = self
            .transport
            .post_json(url, &headers, &payload)
            .await
            .map_err(|e| MonitorError::DeliveryFailed(format!("transport: {}", e)))?;

        let reply: WebhookReply = serde_json::from_str(&response.body).map_err(|e| {
            MonitorError::DeliveryFailed(format!(
                "unparsable reply (HTTP {}): {}",
                response.status, e
            ))
        })?;

        if reply.is_ok() {
            info!(
                "Feishu message delivered ({} chars, signed: {})",
                message.body.chars().count(),
                message.is_signed()
            );
            Ok(())
        } else {
            let code = reply
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "none".to_string());
            warn!("Feishu rejected message: {} (code {})", reply.message(), code);
            Err(MonitorError::DeliveryFailed(format!(
                "{} (code {})",
                reply.message(),
                code
            )))
        }
    }
}

#[async_trait]
impl<T: HttpTransport> Notifier for FeishuNotifier<T> {
    async fn notify(&self, message: DeliveryMessage) -> MonitorResult<()> {
        self.send(message).await
    }
}
