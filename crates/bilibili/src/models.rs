use serde::Deserialize;

const VIDEO_URL_PREFIX: &str = "https://www.bilibili.com/video/";

/// Every Bilibili web API wraps its payload the same way.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct ArcSearchData {
    pub list: Option<ArcList>,
}

#[derive(Debug, Deserialize)]
pub struct ArcList {
    #[serde(default)]
    pub vlist: Vec<VideoEntry>,
}

#[derive(Debug, Deserialize)]
pub struct VideoEntry {
    pub bvid: String,
    pub title: String,
    #[serde(default)]
    pub aid: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ViewData {
    pub aid: u64,
}

#[derive(Debug, Deserialize)]
pub struct ReplyData {
    #[serde(default)]
    pub replies: Option<Vec<Reply>>,
}

#[derive(Debug, Deserialize)]
pub struct Reply {
    pub rpid: u64,
    pub member: Option<Member>,
    pub content: Option<ReplyContent>,
}

#[derive(Debug, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub uname: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplyContent {
    #[serde(default)]
    pub message: String,
}

/// The newest video of the monitored account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub permalink: String,
}

impl Item {
    pub fn from_entry(entry: &VideoEntry) -> Self {
        Self {
            id: entry.bvid.clone(),
            title: entry.title.clone(),
            permalink: video_url(&entry.bvid),
        }
    }
}

/// A comment on an [`Item`]. Author and body are kept as delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub body: String,
    pub permalink: String,
}

impl Comment {
    pub fn from_reply(bvid: &str, reply: Reply) -> Self {
        let id = reply.rpid.to_string();
        Self {
            permalink: format!("{}#reply{}", video_url(bvid), id),
            id,
            author: reply.member.map(|m| m.uname).unwrap_or_default(),
            body: reply.content.map(|c| c.message).unwrap_or_default(),
        }
    }
}

pub fn video_url(bvid: &str) -> String {
    format!("{}{}", VIDEO_URL_PREFIX, bvid)
}
