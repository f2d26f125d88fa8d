use std::collections::HashMap;
use std::sync::Mutex;

use common::http::decode_json;
use common::{BilibiliConfig, HttpResponse, HttpTransport, MonitorError, MonitorResult, ReqwestTransport};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::models::{ApiEnvelope, ArcSearchData, Comment, Item, ReplyData, ViewData};
use crate::retry::RetryPolicy;

/// Response codes the API uses for "slow down": risk-control block, request
/// intercepted, too frequent.
const RATE_LIMIT_CODES: [i64; 4] = [-352, -412, -509, -799];

pub struct BilibiliApi<T: HttpTransport = ReqwestTransport> {
    transport: T,
    base_url: String,
    retry: RetryPolicy,
    aids: Mutex<HashMap<String, u64>>,
}

impl BilibiliApi<ReqwestTransport> {
    pub fn from_config(config: &BilibiliConfig) -> MonitorResult<Self> {
        let transport = ReqwestTransport::browser(config.timeout)?;
        Ok(Self::with_transport(
            transport,
            &config.api_base,
            RetryPolicy::from_config(config),
        ))
    }
}

impl<T: HttpTransport> BilibiliApi<T> {
    pub fn with_transport(transport: T, base_url: &str, retry: RetryPolicy) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
            aids: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_latest_video(&self, uid: &str) -> MonitorResult<Item> {
        self.retry
            .run("latest video lookup", || self.latest_video_once(uid))
            .await
    }

    pub async fn get_comments(&self, bvid: &str, limit: usize) -> MonitorResult<Vec<Comment>> {
        self.retry
            .run("comment lookup", || self.comments_once(bvid, limit))
            .await
    }

    async fn latest_video_once(&self, uid: &str) -> MonitorResult<Item> {
        let url = format!(
            "{}/x/space/arc/search?mid={}&ps=1&pn=1&order=pubdate",
            self.base_url, uid
        );
        let response = self.transport.get(&url).await?;
        let envelope: ApiEnvelope<ArcSearchData> = unwrap_envelope(&response, "video listing")?;

        let entry = envelope
            .data
            .and_then(|d| d.list)
            .and_then(|l| l.vlist.into_iter().next())
            .ok_or_else(|| MonitorError::NoItems(uid.to_string()))?;

        if let Some(aid) = entry.aid {
            self.remember_aid(&entry.bvid, aid);
        }
        let item = Item::from_entry(&entry);
        info!("Latest video for {}: {} ({})", uid, item.title, item.id);
        Ok(item)
    }

    async fn comments_once(&self, bvid: &str, limit: usize) -> MonitorResult<Vec<Comment>> {
        let aid = match self.known_aid(bvid) {
            Some(aid) => aid,
            None => self.resolve_aid(bvid).await?,
        };

        let url = format!(
            "{}/x/v2/reply?type=1&oid={}&ps={}&pn=1&sort=0",
            self.base_url, aid, limit
        );
        let response = self.transport.get(&url).await?;
        let envelope: ApiEnvelope<ReplyData> = unwrap_envelope(&response, "comment list")?;

        let comments: Vec<Comment> = envelope
            .data
            .and_then(|d| d.replies)
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .map(|reply| Comment::from_reply(bvid, reply))
            .collect();
        info!("Fetched {} comments for {}", comments.len(), bvid);
        Ok(comments)
    }

    /// The comment API is keyed by the numeric aid, not the public bvid.
    async fn resolve_aid(&self, bvid: &str) -> MonitorResult<u64> {
        let url = format!("{}/x/web-interface/view?bvid={}", self.base_url, bvid);
        let response = self.transport.get(&url).await?;
        let envelope: ApiEnvelope<ViewData> = unwrap_envelope(&response, "video view")?;
        let aid = envelope
            .data
            .map(|d| d.aid)
            .ok_or_else(|| MonitorError::UpstreamError(format!("no aid for {}", bvid)))?;
        self.remember_aid(bvid, aid);
        Ok(aid)
    }

    fn known_aid(&self, bvid: &str) -> Option<u64> {
        self.aids.lock().ok().and_then(|aids| aids.get(bvid).copied())
    }

    fn remember_aid(&self, bvid: &str, aid: u64) {
        if let Ok(mut aids) = self.aids.lock() {
            aids.insert(bvid.to_string(), aid);
        }
    }
}

/// Classifies HTTP status and the envelope `code` into the failure taxonomy.
fn unwrap_envelope<D: DeserializeOwned>(
    response: &HttpResponse,
    what: &str,
) -> MonitorResult<ApiEnvelope<D>> {
    if response.status == 412 || response.status == 429 {
        return Err(MonitorError::RateLimited(format!(
            "{}: HTTP {}",
            what, response.status
        )));
    }
    if !response.is_success() {
        return Err(MonitorError::UpstreamError(format!(
            "{}: HTTP {}",
            what, response.status
        )));
    }

    let envelope: ApiEnvelope<D> = decode_json(response)?;
    if RATE_LIMIT_CODES.contains(&envelope.code) {
        return Err(MonitorError::RateLimited(format!(
            "{}: code {} {}",
            what, envelope.code, envelope.message
        )));
    }
    if envelope.code != 0 {
        return Err(MonitorError::UpstreamError(format!(
            "{}: code {} {}",
            what, envelope.code, envelope.message
        )));
    }
    Ok(envelope)
}
