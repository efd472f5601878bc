use async_trait::async_trait;
use notify_types::{Account, Subscription, Topic};

use crate::error::StoreError;

/// Mirrors the notify server's authoritative subscription set. Only
/// reconciliation (the sole writer) upserts or deletes entries here.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get(&self, topic: &Topic) -> Result<Option<Subscription>, StoreError>;
    async fn list_all(&self) -> Result<Vec<Subscription>, StoreError>;
    async fn list_by_account(&self, account: &Account) -> Result<Vec<Subscription>, StoreError>;
    async fn upsert(&self, subscription: Subscription) -> Result<(), StoreError>;
    async fn delete(&self, topic: &Topic) -> Result<(), StoreError>;
}

#[cfg(feature = "test-support")]
pub mod memory {
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    use super::*;

    #[derive(Default)]
    pub struct InMemorySubscriptionStore {
        subscriptions: RwLock<HashMap<Topic, Subscription>>,
    }

    #[async_trait]
    impl SubscriptionStore for InMemorySubscriptionStore {
        async fn get(&self, topic: &Topic) -> Result<Option<Subscription>, StoreError> {
            Ok(self.subscriptions.read().await.get(topic).cloned())
        }

        async fn list_all(&self) -> Result<Vec<Subscription>, StoreError> {
            Ok(self.subscriptions.read().await.values().cloned().collect())
        }

        async fn list_by_account(
            &self,
            account: &Account,
        ) -> Result<Vec<Subscription>, StoreError> {
            Ok(self
                .subscriptions
                .read()
                .await
                .values()
                .filter(|sub| &sub.account == account)
                .cloned()
                .collect())
        }

        async fn upsert(&self, subscription: Subscription) -> Result<(), StoreError> {
            self.subscriptions.write().await.insert(subscription.topic.clone(), subscription);
            Ok(())
        }

        async fn delete(&self, topic: &Topic) -> Result<(), StoreError> {
            self.subscriptions.write().await.remove(topic);
            Ok(())
        }
    }
}
