use bilibili::{Comment, Item, VideoSource};
use common::{CursorStore, MonitorError, MonitorResult};
use feishu::{DeliveryMessage, Notifier};
use tracing::{error, info, warn};

use crate::format::{format_alert, format_heartbeat, format_new_comments};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// No webhook configured.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NewComments {
        item: Item,
        new_count: usize,
        cursor: String,
        cursor_saved: bool,
        delivery: Delivery,
    },
    NoNewComments {
        item: Item,
        delivery: Delivery,
    },
}

/// Comments newer than `cursor` in a newest-first batch.
///
/// A cursor that is absent, or missing from the batch, marks the whole batch as new.
pub fn new_comments<'a>(comments: &'a [Comment], cursor: Option<&str>) -> &'a [Comment] {
    match cursor {
        Some(seen) => match comments.iter().position(|c| c.id == seen) {
            Some(position) => &comments[..position],
            None => {
                if !comments.is_empty() {
                    warn!(
                        "Cursor {} not in the current batch; treating all {} comments as new",
                        seen,
                        comments.len()
                    );
                }
                comments
            }
        },
        None => comments,
    }
}

pub struct Pipeline<S, N, C> {
    source: S,
    notifier: N,
    cursor: C,
    account_id: String,
    comment_limit: usize,
    max_displayed: usize,
}

impl<S, N, C> Pipeline<S, N, C>
where
    S: VideoSource,
    N: Notifier,
    C: CursorStore,
{
    pub fn new(source: S, notifier: N, cursor: C, account_id: impl Into<String>) -> Self {
        Self {
            source,
            notifier,
            cursor,
            account_id: account_id.into(),
            comment_limit: 10,
            max_displayed: 5,
        }
    }

    pub fn with_limits(mut self, comment_limit: usize, max_displayed: usize) -> Self {
        self.comment_limit = comment_limit;
        self.max_displayed = max_displayed;
        self
    }

    pub fn cursor_store(&self) -> &C {
        &self.cursor
    }

    /// One poll. `Err` only for upstream failures, after a best-effort alert has gone out.
    pub async fn run_once(&self) -> MonitorResult<RunOutcome> {
        info!("Checking latest video comments for UID {}", self.account_id);

        let item = match self.source.fetch_latest_item(&self.account_id).await {
            Ok(item) => item,
            Err(e) => return Err(self.abort("fetching latest video", e).await),
        };

        let comments = match self.source.fetch_comments(&item.id, self.comment_limit).await {
            Ok(comments) => comments,
            Err(e) => return Err(self.abort("fetching comments", e).await),
        };

        let cursor = self.cursor.load();
        let fresh = new_comments(&comments, cursor.as_deref());

        if fresh.is_empty() {
            info!("No new comments on {} (cursor {:?})", item.id, cursor);
            let delivery = self.deliver(format_heartbeat(&self.account_id, &item)).await;
            return Ok(RunOutcome::NoNewComments { item, delivery });
        }

        info!("{} new comments on {}", fresh.len(), item.id);
        let body = format_new_comments(&self.account_id, &item, fresh, self.max_displayed);
        let delivery = self.deliver(body).await;

        // Advances even when delivery failed, so one bad send never replays forever.
        let newest = fresh[0].id.clone();
        let cursor_saved = match self.cursor.save(&newest) {
            Ok(()) => true,
            Err(e) => {
                warn!("{}; the next run may repeat this notification", e);
                false
            }
        };

        Ok(RunOutcome::NewComments {
            item,
            new_count: fresh.len(),
            cursor: newest,
            cursor_saved,
            delivery,
        })
    }

    async fn deliver(&self, body: String) -> Delivery {
        match self.notifier.notify(DeliveryMessage::text(body)).await {
            Ok(()) => Delivery::Sent,
            Err(MonitorError::ConfigMissing(reason)) => {
                info!("Delivery skipped: {}", reason);
                Delivery::Skipped
            }
            Err(e) => {
                warn!("{}", e);
                Delivery::Failed(e.to_string())
            }
        }
    }

    async fn abort(&self, step: &str, e: MonitorError) -> MonitorError {
        error!("Run aborted while {}: {}", step, e);
        if let Delivery::Failed(reason) = self.deliver(format_alert(&self.account_id, &e)).await {
            warn!("Operator alert not delivered: {}", reason);
        }
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn comment(id: &str) -> Comment {
        Comment {
            id: id.to_string(),
            author: format!("user-{}", id),
            body: format!("body of {}", id),
            permalink: format!("https://www.bilibili.com/video/BV1#reply{}", id),
        }
    }

    fn batch(ids: &[&str]) -> Vec<Comment> {
        ids.iter().map(|id| comment(id)).collect()
    }

    fn ids(comments: &[Comment]) -> Vec<&str> {
        comments.iter().map(|c| c.id.as_str()).collect()
    }

    struct FakeSource {
        item: Mutex<Vec<MonitorResult<Item>>>,
        comments: Mutex<Vec<Comment>>,
        fail_comments: bool,
    }

    impl FakeSource {
        fn with_comments(ids: &[&str]) -> Self {
            Self {
                item: Mutex::new(Vec::new()),
                comments: Mutex::new(batch(ids)),
                fail_comments: false,
            }
        }

        fn failing_item(error: MonitorError) -> Self {
            let source = Self::with_comments(&[]);
            source.item.lock().unwrap().push(Err(error));
            source
        }
    }

    #[async_trait]
    impl VideoSource for FakeSource {
        async fn fetch_latest_item(&self, _account_id: &str) -> MonitorResult<Item> {
            self.item.lock().unwrap().pop().unwrap_or_else(|| {
                Ok(Item {
                    id: "BV1".to_string(),
                    title: "T1".to_string(),
                    permalink: "https://www.bilibili.com/video/BV1".to_string(),
                })
            })
        }

        async fn fetch_comments(&self, _item_id: &str, limit: usize) -> MonitorResult<Vec<Comment>> {
            if self.fail_comments {
                return Err(MonitorError::Timeout("comments".into()));
            }
            Ok(self.comments.lock().unwrap().iter().take(limit).cloned().collect())
        }
    }

    #[derive(Default)]
    struct FakeNotifier {
        sent: Mutex<Vec<String>>,
        reject: Option<&'static str>,
        unconfigured: bool,
    }

    #[async_trait]
    impl Notifier for FakeNotifier {
        async fn notify(&self, message: DeliveryMessage) -> MonitorResult<()> {
            if self.unconfigured {
                return Err(MonitorError::ConfigMissing("FEISHU_WEBHOOK".into()));
            }
            self.sent.lock().unwrap().push(message.body);
            match self.reject {
                Some(reason) => Err(MonitorError::DeliveryFailed(reason.to_string())),
                None => Ok(()),
            }
        }
    }

    #[derive(Default)]
    struct MemoryCursor {
        value: Mutex<Option<String>>,
        read_only: bool,
    }

    impl MemoryCursor {
        fn at(id: &str) -> Self {
            Self {
                value: Mutex::new(Some(id.to_string())),
                read_only: false,
            }
        }
    }

    impl CursorStore for MemoryCursor {
        fn load(&self) -> Option<String> {
            self.value.lock().unwrap().clone()
        }

        fn save(&self, id: &str) -> MonitorResult<()> {
            if self.read_only {
                return Err(MonitorError::PersistError("read-only".into()));
            }
            *self.value.lock().unwrap() = Some(id.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_partition_before_cursor() {
        let comments = batch(&["c3", "c2", "c1"]);
        assert_eq!(ids(new_comments(&comments, Some("c2"))), vec!["c3"]);
        assert_eq!(ids(new_comments(&comments, Some("c3"))), Vec::<&str>::new());
        assert_eq!(ids(new_comments(&comments, Some("c1"))), vec!["c3", "c2"]);
    }

    #[test]
    fn test_partition_without_usable_cursor() {
        let comments = batch(&["c3", "c2", "c1"]);
        assert_eq!(ids(new_comments(&comments, None)), vec!["c3", "c2", "c1"]);
        assert_eq!(ids(new_comments(&comments, Some("c0"))), vec!["c3", "c2", "c1"]);
        assert!(new_comments(&[], Some("c1")).is_empty());
    }

    #[tokio::test]
    async fn test_new_comment_advances_cursor() {
        let pipeline = Pipeline::new(
            FakeSource::with_comments(&["c3", "c2", "c1"]),
            FakeNotifier::default(),
            MemoryCursor::at("c2"),
            "42",
        );

        let outcome = pipeline.run_once().await.unwrap();
        match outcome {
            RunOutcome::NewComments { new_count, cursor, cursor_saved, delivery, .. } => {
                assert_eq!(new_count, 1);
                assert_eq!(cursor, "c3");
                assert!(cursor_saved);
                assert_eq!(delivery, Delivery::Sent);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(pipeline.cursor.load().as_deref(), Some("c3"));

        let sent = pipeline.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("user-c3: body of c3"));
        assert!(!sent[0].contains("body of c2"));
    }

    #[tokio::test]
    async fn test_second_run_is_heartbeat() {
        let pipeline = Pipeline::new(
            FakeSource::with_comments(&["c3", "c2", "c1"]),
            FakeNotifier::default(),
            MemoryCursor::default(),
            "42",
        );

        let first = pipeline.run_once().await.unwrap();
        assert!(matches!(first, RunOutcome::NewComments { new_count: 3, .. }));
        let second = pipeline.run_once().await.unwrap();
        assert!(matches!(second, RunOutcome::NoNewComments { delivery: Delivery::Sent, .. }));

        let sent = pipeline.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].contains("No new comments"));
        assert_eq!(pipeline.cursor.load().as_deref(), Some("c3"));
    }

    #[tokio::test]
    async fn test_no_comments_sends_heartbeat_without_cursor() {
        let pipeline = Pipeline::new(
            FakeSource::with_comments(&[]),
            FakeNotifier::default(),
            MemoryCursor::default(),
            "42",
        );
        let outcome = pipeline.run_once().await.unwrap();
        assert!(matches!(outcome, RunOutcome::NoNewComments { .. }));
        assert_eq!(pipeline.cursor.load(), None);
    }

    #[tokio::test]
    async fn test_only_five_comments_are_displayed() {
        let pipeline = Pipeline::new(
            FakeSource::with_comments(&["c7", "c6", "c5", "c4", "c3", "c2", "c1"]),
            FakeNotifier::default(),
            MemoryCursor::default(),
            "42",
        );
        pipeline.run_once().await.unwrap();
        let sent = pipeline.notifier.sent.lock().unwrap();
        assert!(sent[0].contains("body of c3"));
        assert!(!sent[0].contains("body of c2"));
        assert_eq!(pipeline.cursor.load().as_deref(), Some("c7"));
    }

    #[tokio::test]
    async fn test_delivery_failure_still_advances_cursor() {
        let notifier = FakeNotifier {
            reject: Some("bad sign (code 9499)"),
            ..FakeNotifier::default()
        };
        let pipeline = Pipeline::new(
            FakeSource::with_comments(&["c3", "c2"]),
            notifier,
            MemoryCursor::at("c2"),
            "42",
        );
        let outcome = pipeline.run_once().await.unwrap();
        assert!(matches!(
            outcome,
            RunOutcome::NewComments { delivery: Delivery::Failed(_), cursor_saved: true, .. }
        ));
        assert_eq!(pipeline.cursor.load().as_deref(), Some("c3"));
    }

    #[tokio::test]
    async fn test_missing_webhook_skips_delivery() {
        let notifier = FakeNotifier {
            unconfigured: true,
            ..FakeNotifier::default()
        };
        let pipeline = Pipeline::new(
            FakeSource::with_comments(&["c1"]),
            notifier,
            MemoryCursor::default(),
            "42",
        );
        let outcome = pipeline.run_once().await.unwrap();
        assert!(matches!(outcome, RunOutcome::NewComments { delivery: Delivery::Skipped, .. }));
        assert_eq!(pipeline.cursor.load().as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_persist_failure_is_not_fatal() {
        let cursor = MemoryCursor {
            read_only: true,
            ..MemoryCursor::default()
        };
        let pipeline = Pipeline::new(
            FakeSource::with_comments(&["c1"]),
            FakeNotifier::default(),
            cursor,
            "42",
        );
        let outcome = pipeline.run_once().await.unwrap();
        assert!(matches!(
            outcome,
            RunOutcome::NewComments { cursor_saved: false, delivery: Delivery::Sent, .. }
        ));
    }

    #[tokio::test]
    async fn test_upstream_failure_alerts_and_aborts() {
        let pipeline = Pipeline::new(
            FakeSource::failing_item(MonitorError::RateLimited("code -412".into())),
            FakeNotifier::default(),
            MemoryCursor::at("c2"),
            "42",
        );
        let err = pipeline.run_once().await.unwrap_err();
        assert!(matches!(err, MonitorError::RateLimited(_)));

        let sent = pipeline.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("monitor alert"));
        assert_eq!(pipeline.cursor.load().as_deref(), Some("c2"));
    }

    #[tokio::test]
    async fn test_no_items_alerts() {
        let pipeline = Pipeline::new(
            FakeSource::failing_item(MonitorError::NoItems("42".into())),
            FakeNotifier::default(),
            MemoryCursor::default(),
            "42",
        );
        assert!(matches!(pipeline.run_once().await, Err(MonitorError::NoItems(_))));
        assert!(pipeline.notifier.sent.lock().unwrap()[0].contains("no published videos"));
    }

    #[tokio::test]
    async fn test_comment_failure_leaves_cursor() {
        let source = FakeSource {
            fail_comments: true,
            ..FakeSource::with_comments(&["c3"])
        };
        let pipeline = Pipeline::new(source, FakeNotifier::default(), MemoryCursor::at("c2"), "42");
        assert!(matches!(pipeline.run_once().await, Err(MonitorError::Timeout(_))));
        assert_eq!(pipeline.cursor.load().as_deref(), Some("c2"));
    }
}
