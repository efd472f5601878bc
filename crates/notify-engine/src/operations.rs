use ed25519_dalek::VerifyingKey;

use notify_crypto::{
    decrypt_type0, derive_shared_sym_key, encrypt_type0, encrypt_type1, generate_x25519_keypair,
    topic_of_public_key_hex,
};
use notify_jwt::{
    decode_and_validate, did_key_from_hex, did_web, DeleteRequestAuth, DeleteResponseAuth,
    GetNotificationsRequestAuth, GetNotificationsResponseAuth, JwtBasicClaims,
    MarkNotificationsAsReadRequestAuth, MarkNotificationsAsReadResponseAuth, SubscriptionRequestAuth,
    SubscriptionResponseAuth, UpdateRequestAuth, UpdateResponseAuth, VerifyableClaims,
};
use notify_relay::{PublishOptions, DELETE, GET_NOTIFICATIONS, MARK_READ, SUBSCRIBE, UPDATE};
use notify_types::{Account, MessageRecord, NotificationBody, SymKey, Subscription, Topic};

use crate::config::SCOPE_SEPARATOR;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::events::EngineEvent;

pub(crate) fn verifying_key_from_hex(hex_str: &str) -> Result<VerifyingKey, EngineError> {
    let bytes: [u8; 32] = hex::decode(hex_str)
        .map_err(|_| EngineError::InvalidToken)?
        .try_into()
        .map_err(|_| EngineError::InvalidToken)?;
    VerifyingKey::from_bytes(&bytes).map_err(|_| EngineError::InvalidToken)
}

impl Engine {
    /// The outbound operation template's request/response half for an
    /// already-established subscription topic (spec.md §4.1): sign, seal
    /// with the topic's installed key, publish, await the correlated
    /// response on the same topic, open and validate it.
    async fn send_on_subscription<Req: VerifyableClaims, Res: VerifyableClaims>(
        &self,
        subscription: &Subscription,
        account: &Account,
        claims: Req,
        tags: notify_relay::MethodTags,
        expected_act: &str,
    ) -> Result<Res, EngineError> {
        let key = self
            .key_material
            .get(&subscription.topic)
            .await?
            .ok_or(EngineError::SubscriptionMissing)?;
        let dapp_verifying_key = verifying_key_from_hex(&subscription.app_authentication_key)?;

        let claims_json = serde_json::to_value(&claims).map_err(|_| EngineError::InvalidToken)?;
        let jwt = self.identity.generate_id_auth(account, claims_json)?;
        let envelope = encrypt_type0(&key, jwt.as_bytes());

        let request_id = self.relay.next_request_id();
        let pending = self.pending.register(request_id, subscription.topic.clone(), claims.act());
        self.relay
            .publish(subscription.topic.clone(), request_id, envelope, PublishOptions::request(tags))
            .await?;
        let raw = pending.await?;

        let response_jwt = decrypt_type0(&key, &raw).map_err(EngineError::Crypto)?;
        let response_jwt = String::from_utf8(response_jwt).map_err(|_| EngineError::InvalidToken)?;
        decode_and_validate(&response_jwt, expected_act, &dapp_verifying_key).map_err(EngineError::from)
    }

    /// Establishes a new subscription: a Type-1 handshake against the
    /// dapp's published key-agreement key, settled by feeding the
    /// response's `sbs` into reconciliation.
    pub async fn subscribe(
        &self,
        account: &Account,
        domain: &str,
        scope: Vec<String>,
    ) -> Result<Subscription, EngineError> {
        self.require_initialized().await?;
        let identity_key =
            self.identity.get_identity(account).await?.ok_or(EngineError::NotRegistered)?;
        let keys = self.key_resolver.resolve_keys(domain).await?;
        let dapp_verifying_key = verifying_key_from_hex(&keys.dapp_identity_key)?;

        let now = self.clock.now().timestamp();
        let claims = SubscriptionRequestAuth {
            basic: JwtBasicClaims {
                iss: identity_key,
                aud: did_key_from_hex(&keys.dapp_identity_key)?,
                sub: account.as_did_pkh(),
                iat: now,
                exp: now + SUBSCRIBE.req_ttl_secs as i64,
                ksu: self.config.keyserver_url.clone(),
                app: Some(did_web(domain)),
            },
            act: "notify_subscription".to_string(),
            scp: scope.join(SCOPE_SEPARATOR),
        };

        let keypair = generate_x25519_keypair();
        let shared = derive_shared_sym_key(&keypair.private_hex, &keys.dapp_public_key)
            .map_err(EngineError::Crypto)?;
        let response_topic = Topic::from_sha256(&shared);
        self.relay.subscribe(response_topic).await?;

        let claims_json = serde_json::to_value(&claims).map_err(|_| EngineError::InvalidToken)?;
        let jwt = self.identity.generate_id_auth(account, claims_json)?;
        let envelope = encrypt_type1(&keypair.private_hex, &keys.dapp_public_key, jwt.as_bytes())
            .map_err(EngineError::Crypto)?;
        let request_topic =
            topic_of_public_key_hex(&keys.dapp_public_key).map_err(EngineError::Crypto)?;

        let request_id = self.relay.next_request_id();
        let pending = self.pending.register(request_id, request_topic.clone(), claims.act());
        self.relay
            .publish(request_topic, request_id, envelope, PublishOptions::request(SUBSCRIBE))
            .await?;
        let raw = pending.await?;

        let response_jwt = decrypt_type0(&SymKey(shared), &raw).map_err(EngineError::Crypto)?;
        let response_jwt = String::from_utf8(response_jwt).map_err(|_| EngineError::InvalidToken)?;
        let response: SubscriptionResponseAuth =
            decode_and_validate(&response_jwt, "notify_subscription_response", &dapp_verifying_key)?;

        let updated = self.apply_server_subscriptions(account, &response.sbs).await?;
        let subscription = updated
            .into_iter()
            .find(|sub| sub.app_domain == domain)
            .ok_or(EngineError::SubscriptionMissing)?;
        self.emit_event(EngineEvent::NotifySubscription(subscription.clone()));
        Ok(subscription)
    }

    /// Narrows or widens an existing subscription's scope.
    pub async fn update(
        &self,
        account: &Account,
        topic: &Topic,
        scope: Vec<String>,
    ) -> Result<Subscription, EngineError> {
        self.require_initialized().await?;
        let subscription =
            self.subscriptions.get(topic).await?.ok_or(EngineError::SubscriptionMissing)?;
        let identity_key =
            self.identity.get_identity(account).await?.ok_or(EngineError::NotRegistered)?;

        let now = self.clock.now().timestamp();
        let claims = UpdateRequestAuth {
            basic: JwtBasicClaims {
                iss: identity_key,
                aud: did_key_from_hex(&subscription.app_authentication_key)?,
                sub: account.as_did_pkh(),
                iat: now,
                exp: now + UPDATE.req_ttl_secs as i64,
                ksu: self.config.keyserver_url.clone(),
                app: Some(did_web(&subscription.app_domain)),
            },
            act: "notify_update".to_string(),
            scp: scope.join(SCOPE_SEPARATOR),
        };

        let response: UpdateResponseAuth = self
            .send_on_subscription(&subscription, account, claims, UPDATE, "notify_update_response")
            .await?;
        let updated = self.apply_server_subscriptions(account, &response.sbs).await?;
        let subscription =
            updated.into_iter().find(|sub| &sub.topic == topic).ok_or(EngineError::SubscriptionMissing)?;
        self.emit_event(EngineEvent::NotifyUpdate(subscription.clone()));
        Ok(subscription)
    }

    /// Cancels a subscription. Reconciliation (driven by the response's
    /// `sbs`, which will no longer list this topic) performs the
    /// unsubscribe/cleanup and emits `NotifyDelete`.
    pub async fn delete_subscription(
        &self,
        account: &Account,
        topic: &Topic,
    ) -> Result<(), EngineError> {
        self.require_initialized().await?;
        let subscription =
            self.subscriptions.get(topic).await?.ok_or(EngineError::SubscriptionMissing)?;
        let identity_key =
            self.identity.get_identity(account).await?.ok_or(EngineError::NotRegistered)?;

        let now = self.clock.now().timestamp();
        let claims = DeleteRequestAuth {
            basic: JwtBasicClaims {
                iss: identity_key,
                aud: did_key_from_hex(&subscription.app_authentication_key)?,
                sub: account.as_did_pkh(),
                iat: now,
                exp: now + DELETE.req_ttl_secs as i64,
                ksu: self.config.keyserver_url.clone(),
                app: Some(did_web(&subscription.app_domain)),
            },
            act: "notify_delete".to_string(),
        };

        let response: DeleteResponseAuth = self
            .send_on_subscription(&subscription, account, claims, DELETE, "notify_delete_response")
            .await?;
        self.apply_server_subscriptions(account, &response.sbs).await?;
        Ok(())
    }

    /// Marks notifications read, either by id or (`all = true`) the whole
    /// subscription. Clears local unread bookkeeping on success.
    pub async fn mark_read(
        &self,
        account: &Account,
        topic: &Topic,
        ids: Vec<String>,
        all: bool,
    ) -> Result<(), EngineError> {
        self.require_initialized().await?;
        let subscription =
            self.subscriptions.get(topic).await?.ok_or(EngineError::SubscriptionMissing)?;
        let identity_key =
            self.identity.get_identity(account).await?.ok_or(EngineError::NotRegistered)?;

        let now = self.clock.now().timestamp();
        let claims = MarkNotificationsAsReadRequestAuth {
            basic: JwtBasicClaims {
                iss: identity_key,
                aud: did_key_from_hex(&subscription.app_authentication_key)?,
                sub: account.as_did_pkh(),
                iat: now,
                exp: now + MARK_READ.req_ttl_secs as i64,
                ksu: self.config.keyserver_url.clone(),
                app: Some(did_web(&subscription.app_domain)),
            },
            act: "notify_mark_notifications_as_read".to_string(),
            ids: ids.clone(),
            all,
        };

        let _: MarkNotificationsAsReadResponseAuth = self
            .send_on_subscription(
                &subscription,
                account,
                claims,
                MARK_READ,
                "notify_mark_notifications_as_read_response",
            )
            .await?;

        let mut updated = subscription;
        updated.unread_count = if all {
            0
        } else {
            updated.unread_count.saturating_sub(ids.len() as u32)
        };
        self.subscriptions.upsert(updated).await?;
        Ok(())
    }

    /// Pages through a subscription's server-side notification archive,
    /// caching every returned record locally.
    pub async fn get_history(
        &self,
        account: &Account,
        topic: &Topic,
        limit: u32,
        after: Option<String>,
    ) -> Result<(Vec<NotificationBody>, bool), EngineError> {
        self.require_initialized().await?;
        let subscription =
            self.subscriptions.get(topic).await?.ok_or(EngineError::SubscriptionMissing)?;
        let identity_key =
            self.identity.get_identity(account).await?.ok_or(EngineError::NotRegistered)?;

        let now = self.clock.now().timestamp();
        let claims = GetNotificationsRequestAuth {
            basic: JwtBasicClaims {
                iss: identity_key,
                aud: did_key_from_hex(&subscription.app_authentication_key)?,
                sub: account.as_did_pkh(),
                iat: now,
                exp: now + GET_NOTIFICATIONS.req_ttl_secs as i64,
                ksu: self.config.keyserver_url.clone(),
                app: Some(did_web(&subscription.app_domain)),
            },
            act: "notify_get_notifications".to_string(),
            limit,
            after,
        };

        let response: GetNotificationsResponseAuth = self
            .send_on_subscription(
                &subscription,
                account,
                claims,
                GET_NOTIFICATIONS,
                "notify_get_notifications_response",
            )
            .await?;

        let mut bodies = Vec::with_capacity(response.notifications.len());
        for entry in &response.notifications {
            let body = NotificationBody {
                title: entry.title.clone(),
                body: entry.body.clone(),
                icon: entry.icon.clone(),
                url: entry.url.clone(),
                notification_type: entry.notification_type.clone(),
            };
            if !self.messages.exists(topic, &entry.id).await? {
                self.messages
                    .insert(MessageRecord {
                        id: entry.id.clone(),
                        topic: topic.clone(),
                        message: body.clone(),
                        published_at: now * 1000,
                    })
                    .await?;
            }
            bodies.push(body);
        }
        Ok((bodies, response.has_more))
    }

    /// Decodes a raw inbound envelope into its [`NotificationBody`] without
    /// touching any store — useful for verifying a decrypted payload in
    /// isolation from the full ingestion pipeline in [`crate::dispatch`].
    pub async fn decrypt_message(
        &self,
        topic: &Topic,
        envelope: &str,
    ) -> Result<NotificationBody, EngineError> {
        let key = self.key_material.get(topic).await?.ok_or(EngineError::SubscriptionMissing)?;
        let plaintext = decrypt_type0(&key, envelope).map_err(EngineError::Crypto)?;
        let jwt = String::from_utf8(plaintext).map_err(|_| EngineError::InvalidToken)?;
        let claims = notify_jwt::MessageAuth::try_from_str(&jwt)?;
        Ok(NotificationBody {
            title: claims.msg.title,
            body: claims.msg.body,
            icon: claims.msg.icon,
            url: claims.msg.url,
            notification_type: claims.msg.notification_type,
        })
    }
}
