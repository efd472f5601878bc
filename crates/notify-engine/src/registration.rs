use notify_identity::RegistrationPreparation;
use notify_jwt::{is_recap_statement, CacaoPayload};
use notify_types::{Account, RegistrationStatement};

use crate::engine::Engine;
use crate::error::EngineError;

impl Engine {
    /// Builds the CAIP-122 message the caller must present for signing.
    /// Does not touch any store — the caller decides whether to proceed.
    pub async fn prepare_registration(
        &self,
        account: &Account,
        domain: &str,
        all_apps: bool,
    ) -> Result<RegistrationPreparation, EngineError> {
        self.require_initialized().await?;
        Ok(self.identity.prepare_registration(account, domain, all_apps).await?)
    }

    /// Completes registration with a signature over the prepared message,
    /// records the statement, and begins watching the account.
    pub async fn register(
        &self,
        account: &Account,
        domain: &str,
        all_apps: bool,
        cacao_payload: CacaoPayload,
        ephemeral_identity_private_hex: &str,
        signature: String,
    ) -> Result<(), EngineError> {
        self.require_initialized().await?;

        if self.registration.get(account).await?.is_some()
            && !self.is_registered(account, domain).await?
        {
            return Err(EngineError::StaleStatement);
        }

        let statement_text = cacao_payload.statement.clone();
        self.identity
            .register_identity(account, ephemeral_identity_private_hex, cacao_payload, signature)
            .await?;

        self.registration
            .put(RegistrationStatement {
                account: account.clone(),
                domain: domain.to_string(),
                statement_text,
                all_apps,
            })
            .await?;

        self.begin_watching(account, Some(domain.to_string()), all_apps).await
    }

    /// Stops watching, unsubscribes every owned subscription, and revokes
    /// the identity key. Per-step failures are logged, not propagated —
    /// an interrupted unregister must still leave the account locally
    /// clean (spec.md §4.1 "Identity registration").
    pub async fn unregister(&self, account: &Account) -> Result<(), EngineError> {
        self.require_initialized().await?;

        if let Some(watched) = self.watch_store.get(account).await? {
            if let Err(e) = self.relay.unsubscribe(watched.res_topic.clone()).await {
                tracing::warn!(account = %account, error = %e, "failed to unsubscribe watch response topic");
            }
            if let Err(e) = self.watch_store.clear_last_watched(account).await {
                tracing::warn!(account = %account, error = %e, "failed to clear last_watched");
            }
        }

        let subscriptions = self.subscriptions.list_by_account(account).await?;
        for subscription in subscriptions {
            if let Err(e) = self.relay.unsubscribe(subscription.topic.clone()).await {
                tracing::warn!(topic = %subscription.topic, error = %e, "failed to unsubscribe during unregister");
            }
            self.subscriptions.delete(&subscription.topic).await?;
            self.key_material.remove(&subscription.topic).await?;
        }

        if let Err(e) = self.identity.unregister_identity(account).await {
            tracing::warn!(account = %account, error = %e, "keyserver unregister failed, clearing locally anyway");
        }
        self.registration.delete(account).await?;
        Ok(())
    }

    /// `true` iff the account has a live identity key **and** a
    /// registration statement that still matches what the engine would
    /// compose today (spec.md §4.1 "Staleness check").
    pub async fn is_registered(&self, account: &Account, domain: &str) -> Result<bool, EngineError> {
        if !self.identity.has_identity(account).await? {
            return Ok(false);
        }
        let Some(statement) = self.registration.get(account).await? else {
            return Ok(false);
        };
        if statement.domain != domain {
            return Ok(false);
        }
        let current_text = notify_jwt::statement_text(statement.all_apps, domain);
        Ok(statement.statement_text == current_text || is_recap_statement(&statement.statement_text))
    }
}
