use async_trait::async_trait;
use notify_types::{MessageRecord, Topic};

use crate::error::StoreError;

/// One bucket of [`MessageRecord`]s per subscription topic, deduplicated on
/// `msg.id` (spec.md §4.1 notification ingestion).
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Creates an empty bucket for `topic` if one doesn't already exist.
    /// Idempotent — safe to call before the matching Subscription exists
    /// (history replay can race ahead of reconciliation).
    async fn ensure_bucket(&self, topic: &Topic) -> Result<(), StoreError>;

    async fn exists(&self, topic: &Topic, message_id: &str) -> Result<bool, StoreError>;

    async fn insert(&self, record: MessageRecord) -> Result<(), StoreError>;

    /// Newest-first page of at most `limit` records with `published_at`
    /// strictly before `after` (`None` starts from the most recent).
    async fn list_page(
        &self,
        topic: &Topic,
        limit: usize,
        after: Option<i64>,
    ) -> Result<(Vec<MessageRecord>, bool), StoreError>;

    async fn delete_bucket(&self, topic: &Topic) -> Result<(), StoreError>;
}

#[cfg(feature = "test-support")]
pub mod memory {
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    use super::*;

    #[derive(Default)]
    pub struct InMemoryMessageStore {
        buckets: RwLock<HashMap<Topic, Vec<MessageRecord>>>,
    }

    #[async_trait]
    impl MessageStore for InMemoryMessageStore {
        async fn ensure_bucket(&self, topic: &Topic) -> Result<(), StoreError> {
            self.buckets.write().await.entry(topic.clone()).or_default();
            Ok(())
        }

        async fn exists(&self, topic: &Topic, message_id: &str) -> Result<bool, StoreError> {
            Ok(self
                .buckets
                .read()
                .await
                .get(topic)
                .map(|bucket| bucket.iter().any(|record| record.id == message_id))
                .unwrap_or(false))
        }

        async fn insert(&self, record: MessageRecord) -> Result<(), StoreError> {
            self.buckets.write().await.entry(record.topic.clone()).or_default().push(record);
            Ok(())
        }

        async fn list_page(
            &self,
            topic: &Topic,
            limit: usize,
            after: Option<i64>,
        ) -> Result<(Vec<MessageRecord>, bool), StoreError> {
            let buckets = self.buckets.read().await;
            let Some(bucket) = buckets.get(topic) else {
                return Ok((Vec::new(), false));
            };

            let mut sorted: Vec<&MessageRecord> = bucket.iter().collect();
            sorted.sort_by(|a, b| b.published_at.cmp(&a.published_at));

            let start = match after {
                Some(cursor) => sorted.partition_point(|record| record.published_at >= cursor),
                None => 0,
            };
            let remaining = &sorted[start..];
            let has_more = remaining.len() > limit;
            let page = remaining.iter().take(limit).map(|record| (*record).clone()).collect();
            Ok((page, has_more))
        }

        async fn delete_bucket(&self, topic: &Topic) -> Result<(), StoreError> {
            self.buckets.write().await.remove(topic);
            Ok(())
        }
    }
}
