use async_trait::async_trait;
use notify_types::{Account, WatchedAccount};

use crate::error::StoreError;

/// Persists the ephemeral key pairs used for the watch channel (spec.md
/// §4.1 watch reconnect policy). Invariant: at most one entry has
/// `last_watched = true`, enforced by [`WatchStore::set_last_watched`].
#[async_trait]
pub trait WatchStore: Send + Sync {
    async fn get(&self, account: &Account) -> Result<Option<WatchedAccount>, StoreError>;
    async fn upsert(&self, watched: WatchedAccount) -> Result<(), StoreError>;
    async fn delete(&self, account: &Account) -> Result<(), StoreError>;
    async fn find_last_watched(&self) -> Result<Option<WatchedAccount>, StoreError>;

    /// Sets `last_watched` on `account`'s entry and clears it on every
    /// other entry, preserving the at-most-one invariant.
    async fn set_last_watched(&self, account: &Account) -> Result<(), StoreError>;
    async fn clear_last_watched(&self, account: &Account) -> Result<(), StoreError>;
}

#[cfg(feature = "test-support")]
pub mod memory {
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    use super::*;

    #[derive(Default)]
    pub struct InMemoryWatchStore {
        accounts: RwLock<HashMap<Account, WatchedAccount>>,
    }

    #[async_trait]
    impl WatchStore for InMemoryWatchStore {
        async fn get(&self, account: &Account) -> Result<Option<WatchedAccount>, StoreError> {
            Ok(self.accounts.read().await.get(account).cloned())
        }

        async fn upsert(&self, watched: WatchedAccount) -> Result<(), StoreError> {
            self.accounts.write().await.insert(watched.account.clone(), watched);
            Ok(())
        }

        async fn delete(&self, account: &Account) -> Result<(), StoreError> {
            self.accounts.write().await.remove(account);
            Ok(())
        }

        async fn find_last_watched(&self) -> Result<Option<WatchedAccount>, StoreError> {
            Ok(self
                .accounts
                .read()
                .await
                .values()
                .find(|watched| watched.last_watched)
                .cloned())
        }

        async fn set_last_watched(&self, account: &Account) -> Result<(), StoreError> {
            let mut accounts = self.accounts.write().await;
            for (other, watched) in accounts.iter_mut() {
                watched.last_watched = other == account;
            }
            Ok(())
        }

        async fn clear_last_watched(&self, account: &Account) -> Result<(), StoreError> {
            if let Some(watched) = self.accounts.write().await.get_mut(account) {
                watched.last_watched = false;
            }
            Ok(())
        }
    }
}
