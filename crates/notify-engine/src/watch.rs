use notify_crypto::{
    decrypt_type0, derive_shared_sym_key, encrypt_type1, generate_x25519_keypair,
    topic_of_public_key_hex,
};
use notify_jwt::{
    decode_and_validate, did_key_from_hex, did_web, JwtBasicClaims, VerifyableClaims,
    WatchSubscriptionsRequestAuth, WatchSubscriptionsResponseAuth,
};
use notify_relay::{PublishOptions, WATCH};
use notify_types::{Account, Topic, WatchedAccount};

use crate::engine::Engine;
use crate::error::EngineError;

/// 5 minutes + 30s tolerance; 24h + 30 minutes tolerance (spec.md §4.1
/// watch reconnect policy).
const OFFLINE_THRESHOLD_MS: i64 = (5 * 60 + 30) * 1000;
const ONLINE_REFRESH_THRESHOLD_MS: i64 = (24 * 60 * 60 + 30 * 60) * 1000;

impl Engine {
    /// Creates (or reuses) the ephemeral key pair used as the local side of
    /// key agreement with the notify server, marks it as the one entry
    /// with `last_watched = true`, and issues the watch request.
    pub async fn begin_watching(
        &self,
        account: &Account,
        app_domain: Option<String>,
        all_apps: bool,
    ) -> Result<(), EngineError> {
        let existing = self.watch_store.get(account).await?;
        let watched = match existing {
            Some(mut watched) => {
                watched.app_domain = app_domain;
                watched.all_apps = all_apps;
                watched.updated_at = self.clock.now();
                watched
            }
            None => {
                let keypair = generate_x25519_keypair();
                let notify_pub = self.notify_server_public_key().await?;
                let shared = derive_shared_sym_key(&keypair.private_hex, &notify_pub)
                    .map_err(EngineError::Crypto)?;
                let res_topic = Topic::from_sha256(&shared);
                WatchedAccount {
                    account: account.clone(),
                    app_domain,
                    all_apps,
                    pub_key_y: keypair.public_hex,
                    priv_key_y: keypair.private_hex,
                    res_topic,
                    last_watched: false,
                    updated_at: self.clock.now(),
                }
            }
        };

        self.watch_store.upsert(watched.clone()).await?;
        self.watch_store.set_last_watched(account).await?;
        self.issue_watch(&watched).await
    }

    pub(crate) async fn issue_watch(&self, watched: &WatchedAccount) -> Result<(), EngineError> {
        let identity_key =
            self.identity.get_identity(&watched.account).await?.ok_or(EngineError::NotRegistered)?;
        let notify_pub = self.notify_server_public_key().await?;
        let notify_identity_key = self.notify_server_identity_key().await?;
        let notify_identity_verifying_key =
            notify_jwt::verifying_key_from_did_key(&did_key_from_hex(&notify_identity_key)?)?;

        self.relay.subscribe(watched.res_topic.clone()).await?;

        let now = self.clock.now().timestamp();
        let claims = WatchSubscriptionsRequestAuth {
            basic: JwtBasicClaims {
                iss: identity_key,
                aud: did_key_from_hex(&notify_identity_key)?,
                sub: watched.account.as_did_pkh(),
                iat: now,
                exp: now + WATCH.req_ttl_secs as i64,
                ksu: self.config.keyserver_url.clone(),
                app: watched.app_domain.as_ref().map(|d| did_web(d)),
            },
            act: "notify_watch_subscriptions".to_string(),
        };
        let claims_json = serde_json::to_value(&claims).map_err(|_| EngineError::InvalidToken)?;
        let jwt = self.identity.generate_id_auth(&watched.account, claims_json)?;

        let envelope = encrypt_type1(&watched.priv_key_y, &notify_pub, jwt.as_bytes())
            .map_err(EngineError::Crypto)?;
        let topic = topic_of_public_key_hex(&notify_pub).map_err(EngineError::Crypto)?;
        let request_id = self.relay.next_request_id();
        let response = self.pending.register(request_id, topic.clone(), claims.act());
        self.relay
            .publish(topic, request_id, envelope, PublishOptions::request(WATCH))
            .await?;
        let raw_envelope = response.await?;

        let shared = derive_shared_sym_key(&watched.priv_key_y, &notify_pub)
            .map_err(EngineError::Crypto)?;
        let response_jwt = decrypt_type0(&notify_types::SymKey(shared), &raw_envelope)
            .map_err(EngineError::Crypto)?;
        let response_jwt = String::from_utf8(response_jwt).map_err(|_| EngineError::InvalidToken)?;
        let response_claims: WatchSubscriptionsResponseAuth = decode_and_validate(
            &response_jwt,
            "notify_watch_subscriptions_response",
            &notify_identity_verifying_key,
        )?;
        self.apply_server_subscriptions(&watched.account, &response_claims.sbs).await?;

        let mut state = self.state.lock().await;
        state.last_watch_issued_at = self.clock.now().timestamp_millis();
        Ok(())
    }

    /// Resolves the notify server's X25519 key-agreement public key
    /// through the same DID-document mechanism used for dapps.
    async fn notify_server_public_key(&self) -> Result<String, EngineError> {
        let keys = self.key_resolver.resolve_keys(&self.config.notify_server_url).await?;
        Ok(keys.dapp_public_key)
    }

    async fn notify_server_identity_key(&self) -> Result<String, EngineError> {
        let keys = self.key_resolver.resolve_keys(&self.config.notify_server_url).await?;
        Ok(keys.dapp_identity_key)
    }

    /// On relay `disconnect`: sets `last_disconnect_at` if it was zero.
    pub async fn on_relay_disconnected(&self) {
        let mut state = self.state.lock().await;
        if state.last_disconnect_at == 0 {
            state.last_disconnect_at = self.clock.now().timestamp_millis();
        }
    }

    /// On relay `connect`: re-watches if offline too long, or if online
    /// since the last watch for too long, per spec.md §4.1.
    pub async fn on_relay_connected(&self) -> Result<(), EngineError> {
        let now = self.clock.now().timestamp_millis();
        let (last_disconnect_at, last_watch_issued_at) = {
            let state = self.state.lock().await;
            (state.last_disconnect_at, state.last_watch_issued_at)
        };

        let mut should_rewatch = false;
        if last_disconnect_at != 0 {
            let offline_duration = now - last_disconnect_at;
            if offline_duration >= OFFLINE_THRESHOLD_MS {
                should_rewatch = true;
            }
        }
        if last_watch_issued_at != 0 {
            let online_duration = now - last_watch_issued_at;
            if online_duration >= ONLINE_REFRESH_THRESHOLD_MS {
                should_rewatch = true;
            }
        }

        {
            let mut state = self.state.lock().await;
            state.last_disconnect_at = 0;
        }

        if should_rewatch {
            if let Some(watched) = self.watch_store.find_last_watched().await? {
                self.issue_watch(&watched).await?;
                let mut state = self.state.lock().await;
                state.last_watch_issued_at = now;
            }
        }
        Ok(())
    }
}
