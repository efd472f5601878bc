
use notify_crypto::{decrypt_type0, encrypt_type0};
use notify_jwt::{
    decode_and_validate, did_key_from_hex, did_web, JwtBasicClaims, MessageAuth, MessageResponseAuth,
    SubscriptionsChangedAuth,
};
use notify_relay::{PublishOptions, RelayEvent, MESSAGE, SUBSCRIPTIONS_CHANGED};
use notify_types::{MessageRecord, NotificationBody, Subscription, Topic};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::events::EngineEvent;
use crate::operations::verifying_key_from_hex;

impl Engine {
    /// Consumes one inbound relay delivery. Responses are routed through
    /// [`notify_relay::PendingRequests`]; unmatched ids are dropped
    /// (out-of-order or replayed history). Requests are classified by
    /// method and handled, with per-delivery failures logged rather than
    /// propagated — one bad message must not stall the dispatch loop.
    pub async fn handle_relay_event(&self, event: RelayEvent) {
        match event {
            RelayEvent::Response { request_id, envelope } => {
                if self.pending.resolve(request_id, envelope).is_none() {
                    tracing::debug!(request_id, "dropped unmatched relay response");
                }
            }
            RelayEvent::Request { topic, request_id, method, envelope } => {
                let result = match method.as_str() {
                    "wc_notifyMessage" => self.on_notify_message_request(&topic, request_id, &envelope).await,
                    "wc_notifySubscriptionsChanged" => {
                        self.on_subscriptions_changed_request(&topic, request_id, &envelope).await
                    }
                    other => {
                        tracing::warn!(method = other, "unhandled inbound relay method");
                        Ok(())
                    }
                };
                if let Err(e) = result {
                    tracing::warn!(error = %e, %topic, "inbound dispatch failed");
                }
            }
        }
    }

    async fn on_notify_message_request(
        &self,
        topic: &Topic,
        request_id: i64,
        envelope: &str,
    ) -> Result<(), EngineError> {
        let key = self.key_material.get(topic).await?.ok_or(EngineError::SubscriptionMissing)?;
        let plaintext = decrypt_type0(&key, envelope).map_err(EngineError::Crypto)?;
        let jwt = String::from_utf8(plaintext).map_err(|_| EngineError::InvalidToken)?;

        let subscription =
            self.subscriptions.get(topic).await?.ok_or(EngineError::SubscriptionMissing)?;
        let dapp_verifying_key = verifying_key_from_hex(&subscription.app_authentication_key)?;
        let claims: MessageAuth = decode_and_validate(&jwt, "notify_message", &dapp_verifying_key)?;

        self.messages.ensure_bucket(topic).await?;
        let already_seen = self.messages.exists(topic, &claims.msg.id).await?;

        if !already_seen {
            let record = MessageRecord {
                id: claims.msg.id.clone(),
                topic: topic.clone(),
                message: NotificationBody {
                    title: claims.msg.title.clone(),
                    body: claims.msg.body.clone(),
                    icon: claims.msg.icon.clone(),
                    url: claims.msg.url.clone(),
                    notification_type: claims.msg.notification_type.clone(),
                },
                published_at: claims.basic.iat * 1000,
            };
            self.messages.insert(record.clone()).await?;

            let mut updated = subscription.clone();
            updated.unread_count += 1;
            self.subscriptions.upsert(updated).await?;

            self.emit_event(EngineEvent::NotifyMessage(record));
        }

        self.send_message_ack(topic, request_id, &key, &subscription).await
    }

    async fn send_message_ack(
        &self,
        topic: &Topic,
        request_id: i64,
        key: &notify_types::SymKey,
        subscription: &Subscription,
    ) -> Result<(), EngineError> {
        let identity_key = self
            .identity
            .get_identity(&subscription.account)
            .await?
            .ok_or(EngineError::NotRegistered)?;
        let now = self.clock.now().timestamp();
        let claims = MessageResponseAuth {
            basic: JwtBasicClaims {
                iss: identity_key,
                aud: did_key_from_hex(&subscription.app_authentication_key)?,
                sub: subscription.account.as_did_pkh(),
                iat: now,
                exp: now + MESSAGE.res_ttl_secs as i64,
                ksu: self.config.keyserver_url.clone(),
                app: Some(did_web(&subscription.app_domain)),
            },
            act: "notify_message_response".to_string(),
        };
        let claims_json = serde_json::to_value(&claims).map_err(|_| EngineError::InvalidToken)?;
        let jwt = self.identity.generate_id_auth(&subscription.account, claims_json)?;
        let envelope = encrypt_type0(key, jwt.as_bytes());
        self.relay
            .respond(topic.clone(), request_id, envelope, PublishOptions::response(MESSAGE))
            .await?;
        Ok(())
    }

    /// A server-pushed `sbs` update outside any outbound request/response
    /// (e.g. a dapp widening scope from its own dashboard). Applies
    /// reconciliation directly and acks on the same topic.
    async fn on_subscriptions_changed_request(
        &self,
        topic: &Topic,
        request_id: i64,
        envelope: &str,
    ) -> Result<(), EngineError> {
        let key = self.key_material.get(topic).await?.ok_or(EngineError::SubscriptionMissing)?;
        let plaintext = decrypt_type0(&key, envelope).map_err(EngineError::Crypto)?;
        let jwt = String::from_utf8(plaintext).map_err(|_| EngineError::InvalidToken)?;

        let subscription =
            self.subscriptions.get(topic).await?.ok_or(EngineError::SubscriptionMissing)?;
        let dapp_verifying_key = verifying_key_from_hex(&subscription.app_authentication_key)?;
        let claims: SubscriptionsChangedAuth =
            decode_and_validate(&jwt, "notify_subscriptions_changed", &dapp_verifying_key)?;

        self.apply_server_subscriptions(&subscription.account, &claims.sbs).await?;

        let identity_key = self
            .identity
            .get_identity(&subscription.account)
            .await?
            .ok_or(EngineError::NotRegistered)?;
        let now = self.clock.now().timestamp();
        let ack_claims = SubscriptionsChangedAuth {
            basic: JwtBasicClaims {
                iss: identity_key,
                aud: did_key_from_hex(&subscription.app_authentication_key)?,
                sub: subscription.account.as_did_pkh(),
                iat: now,
                exp: now + SUBSCRIPTIONS_CHANGED.res_ttl_secs as i64,
                ksu: self.config.keyserver_url.clone(),
                app: Some(did_web(&subscription.app_domain)),
            },
            act: "notify_subscriptions_changed".to_string(),
            sbs: Vec::new(),
        };
        let ack_json = serde_json::to_value(&ack_claims).map_err(|_| EngineError::InvalidToken)?;
        let ack_jwt = self.identity.generate_id_auth(&subscription.account, ack_json)?;
        let ack_envelope = encrypt_type0(&key, ack_jwt.as_bytes());
        self.relay
            .respond(topic.clone(), request_id, ack_envelope, PublishOptions::response(SUBSCRIPTIONS_CHANGED))
            .await?;
        Ok(())
    }
}
