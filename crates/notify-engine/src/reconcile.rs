use std::collections::HashSet;

use notify_jwt::ServerSubscription;
use notify_types::{Account, NotifyConfig, ScopeEntry, ScopeMap, Subscription, SubscriptionMetadata, SymKey, Topic};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::events::EngineEvent;

impl Engine {
    /// Settles the local subscription mirror against a server-signed `sbs`
    /// array (spec.md §4.2). Idempotent: re-applying the same entries is a
    /// no-op beyond re-fetched metadata. Per-topic failures (a stuck relay
    /// unsubscribe, a config fetch) are logged and tolerated rather than
    /// aborting the whole settle.
    pub(crate) async fn apply_server_subscriptions(
        &self,
        account: &Account,
        entries: &[ServerSubscription],
    ) -> Result<Vec<Subscription>, EngineError> {
        let current = self.subscriptions.list_by_account(account).await?;

        let mut new_topics = HashSet::new();
        for entry in entries {
            let key_bytes = hex::decode(&entry.sym_key).map_err(|_| EngineError::InvalidToken)?;
            new_topics.insert(Topic::from_sha256(&key_bytes));
        }

        for sub in &current {
            if new_topics.contains(&sub.topic) {
                continue;
            }
            if let Err(e) = self.relay.unsubscribe(sub.topic.clone()).await {
                tracing::warn!(topic = %sub.topic, error = %e, "failed to unsubscribe removed topic");
            }
            self.subscriptions.delete(&sub.topic).await?;
            self.key_material.remove(&sub.topic).await?;
            self.emit_event(EngineEvent::NotifyDelete(sub.topic.clone()));
        }

        for entry in entries {
            let key_bytes: [u8; 32] = hex::decode(&entry.sym_key)
                .map_err(|_| EngineError::InvalidToken)?
                .try_into()
                .map_err(|_| EngineError::InvalidToken)?;
            let topic = Topic::from_sha256(&key_bytes);

            let config = self.config_fetcher.fetch(&entry.app_domain).await.unwrap_or(None);
            let scope = build_scope_map(&entry.scope, config.as_ref());
            let expiry = chrono::DateTime::from_timestamp(entry.expiry, 0)
                .unwrap_or_else(chrono::Utc::now);
            let unread_count =
                current.iter().find(|s| s.topic == topic).map(|s| s.unread_count).unwrap_or(0);

            let subscription = Subscription {
                topic: topic.clone(),
                account: account.clone(),
                app_domain: entry.app_domain.clone(),
                app_authentication_key: entry.app_authentication_key.clone(),
                scope,
                expiry,
                metadata: config
                    .map(|c| SubscriptionMetadata {
                        name: Some(c.name),
                        description: Some(c.description),
                        icon: c.image_url.and_then(|urls| urls.sm),
                    })
                    .unwrap_or_default(),
                unread_count,
            };

            self.subscriptions.upsert(subscription).await?;
            self.key_material.install(topic.clone(), SymKey(key_bytes)).await?;
            if let Err(e) = self.relay.subscribe(topic.clone()).await {
                tracing::warn!(%topic, error = %e, "failed to subscribe to reconciled topic");
            }
            self.messages.ensure_bucket(&topic).await?;
        }

        let updated = self.subscriptions.list_by_account(account).await?;
        self.emit_event(EngineEvent::NotifySubscriptionsChanged(updated.clone()));
        Ok(updated)
    }
}

/// Intersects the server's enabled-type ids against the dapp's published
/// notify-config. Falls back to treating every server-enabled id as its
/// own bare entry when the config couldn't be fetched (spec.md §3
/// "NotifyConfig" fallback).
fn build_scope_map(server_scope: &[String], config: Option<&NotifyConfig>) -> ScopeMap {
    let enabled: HashSet<&str> = server_scope.iter().map(String::as_str).collect();
    let mut map = ScopeMap::new();

    if let Some(config) = config {
        for ty in &config.notification_types {
            map.insert(
                ty.id.clone(),
                ScopeEntry {
                    id: ty.id.clone(),
                    name: ty.name.clone(),
                    description: ty.description.clone(),
                    enabled: enabled.contains(ty.id.as_str()),
                    image_urls: ty.image_urls.clone(),
                },
            );
        }
    } else {
        for id in server_scope {
            map.insert(
                id.clone(),
                ScopeEntry {
                    id: id.clone(),
                    name: id.clone(),
                    description: String::new(),
                    enabled: true,
                    image_urls: None,
                },
            );
        }
    }
    map
}
