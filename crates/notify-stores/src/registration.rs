use async_trait::async_trait;
use notify_types::{Account, RegistrationStatement};

use crate::error::StoreError;

/// Records the signed CAIP-122 statement backing each registered identity,
/// consulted by the staleness check in `is_registered` (spec.md §4.1).
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn get(&self, account: &Account) -> Result<Option<RegistrationStatement>, StoreError>;
    async fn put(&self, statement: RegistrationStatement) -> Result<(), StoreError>;
    async fn delete(&self, account: &Account) -> Result<(), StoreError>;
}

#[cfg(feature = "test-support")]
pub mod memory {
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    use super::*;

    #[derive(Default)]
    pub struct InMemoryRegistrationStore {
        statements: RwLock<HashMap<Account, RegistrationStatement>>,
    }

    #[async_trait]
    impl RegistrationStore for InMemoryRegistrationStore {
        async fn get(
            &self,
            account: &Account,
        ) -> Result<Option<RegistrationStatement>, StoreError> {
            Ok(self.statements.read().await.get(account).cloned())
        }

        async fn put(&self, statement: RegistrationStatement) -> Result<(), StoreError> {
            self.statements.write().await.insert(statement.account.clone(), statement);
            Ok(())
        }

        async fn delete(&self, account: &Account) -> Result<(), StoreError> {
            self.statements.write().await.remove(account);
            Ok(())
        }
    }
}
