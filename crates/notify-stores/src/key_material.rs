use async_trait::async_trait;
use notify_types::{SymKey, Topic};

use crate::error::StoreError;

/// Symmetric keys installed at relay topics by subscription reconciliation
/// (spec.md §4.2). Separate from [`crate::SubscriptionStore`] because the
/// envelope pipeline needs key lookup on the hot path without pulling in
/// the rest of a `Subscription`.
#[async_trait]
pub trait KeyMaterialStore: Send + Sync {
    async fn install(&self, topic: Topic, key: SymKey) -> Result<(), StoreError>;
    async fn get(&self, topic: &Topic) -> Result<Option<SymKey>, StoreError>;
    async fn remove(&self, topic: &Topic) -> Result<(), StoreError>;
}

#[cfg(feature = "test-support")]
pub mod memory {
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    use super::*;

    #[derive(Default)]
    pub struct InMemoryKeyMaterialStore {
        keys: RwLock<HashMap<Topic, SymKey>>,
    }

    #[async_trait]
    impl KeyMaterialStore for InMemoryKeyMaterialStore {
        async fn install(&self, topic: Topic, key: SymKey) -> Result<(), StoreError> {
            self.keys.write().await.insert(topic, key);
            Ok(())
        }

        async fn get(&self, topic: &Topic) -> Result<Option<SymKey>, StoreError> {
            Ok(self.keys.read().await.get(topic).cloned())
        }

        async fn remove(&self, topic: &Topic) -> Result<(), StoreError> {
            self.keys.write().await.remove(topic);
            Ok(())
        }
    }
}
