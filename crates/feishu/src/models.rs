use serde::{Deserialize, Serialize};

use crate::signer::sign;

/// One outgoing text message, optionally carrying its signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryMessage {
    pub body: String,
    pub signature: Option<String>,
    pub timestamp: Option<i64>,
}

impl DeliveryMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            signature: None,
            timestamp: None,
        }
    }

    pub fn signed(self, secret: &str, timestamp: i64) -> Self {
        Self {
            signature: Some(sign(secret, timestamp)),
            timestamp: Some(timestamp),
            ..self
        }
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some() && self.timestamp.is_some()
    }

    /// `timestamp`/`sign` header pairs for signed messages, empty otherwise.
    pub fn signature_headers(&self) -> Vec<(&'static str, String)> {
        match (self.timestamp, &self.signature) {
            (Some(timestamp), Some(signature)) => vec![
                ("timestamp", timestamp.to_string()),
                ("sign", signature.clone()),
            ],
            _ => Vec::new(),
        }
    }

    pub fn to_payload(&self) -> serde_json::Value {
        let payload = TextPayload {
            timestamp: self.timestamp.map(|t| t.to_string()),
            sign: self.signature.as_deref(),
            msg_type: "text",
            content: TextContent { text: &self.body },
        };
        serde_json::json!(payload)
    }
}

#[derive(Serialize)]
struct TextPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sign: Option<&'a str>,
    msg_type: &'static str,
    content: TextContent<'a>,
}

#[derive(Serialize)]
struct TextContent<'a> {
    text: &'a str,
}

/// Bot reply. Older deployments answer with `StatusCode`, newer ones with `code`; some send both.
#[derive(Debug, Deserialize)]
pub struct WebhookReply {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default, rename = "StatusCode")]
    pub status_code: Option<i64>,
    #[serde(default, rename = "StatusMessage")]
    pub status_message: Option<String>,
}

impl WebhookReply {
    pub fn code(&self) -> Option<i64> {
        self.code.or(self.status_code)
    }

    pub fn message(&self) -> &str {
        self.msg
            .as_deref()
            .or(self.status_message.as_deref())
            .unwrap_or("")
    }

    pub fn is_ok(&self) -> bool {
        self.code() == Some(0)
    }
}
