//! End-to-end coverage of the outbound/inbound operation templates against
//! in-memory doubles: the six scenarios in spec.md §8, plus the reconcile
//! and dispatch paths they exercise.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL;
use base64::Engine as _;
use chrono::Utc;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

use notify_crypto::{
    decrypt_type1, derive_shared_sym_key, encrypt_type0, generate_x25519_keypair,
    topic_of_public_key_hex, X25519KeyPair,
};
use notify_engine::{
    ConfigFetcher, Engine, EngineConfig, EngineDependencies, EngineError, EngineEvent, SystemClock,
};
use notify_identity::{HttpIdentityService, KeyResolver};
use notify_jwt::{
    did_key_from_verifying_key, did_web, CacaoPayload, DeleteResponseAuth, JwtBasicClaims,
    MessageAuth, NotificationBodyAuth, ServerSubscription, SubscriptionResponseAuth,
    UpdateResponseAuth, VerifyableClaims,
};
use notify_relay::{MockRelayClient, RecordedPublish, RelayEvent};
use notify_stores::{
    InMemoryKeyMaterialStore, InMemoryMessageStore, InMemoryRegistrationStore,
    InMemorySubscriptionStore, InMemoryWatchStore,
};
use notify_types::{
    Account, DidDocument, NotifyConfig, PublicKeyJwk, RegistrationStatement, SubscriptionMetadata,
    SymKey, Topic, VerificationMethod,
};

struct NoConfigFetcher;

#[async_trait]
impl ConfigFetcher for NoConfigFetcher {
    async fn fetch(&self, _app_domain: &str) -> Result<Option<NotifyConfig>, EngineError> {
        Ok(None)
    }
}

/// A counterparty's key pair, standing in for a dapp's `.well-known/did.json`
/// in tests: an X25519 key-agreement key plus the ed25519 identity key that
/// signs its responses.
struct TestActor {
    x25519: X25519KeyPair,
    signing_key: SigningKey,
}

impl TestActor {
    fn new() -> Self {
        Self { x25519: generate_x25519_keypair(), signing_key: SigningKey::generate(&mut OsRng) }
    }

    fn identity_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().as_bytes())
    }

    fn identity_did(&self) -> String {
        did_key_from_verifying_key(&self.signing_key.verifying_key())
    }

    fn did_document(&self) -> DidDocument {
        DidDocument {
            verification_method: vec![
                VerificationMethod {
                    id: "did:web:test.app#key-agreement".into(),
                    public_key_jwk: PublicKeyJwk {
                        kty: "OKP".into(),
                        crv: "X25519".into(),
                        x: BASE64URL.encode(hex::decode(&self.x25519.public_hex).unwrap()),
                    },
                },
                VerificationMethod {
                    id: "did:web:test.app#authentication".into(),
                    public_key_jwk: PublicKeyJwk {
                        kty: "OKP".into(),
                        crv: "Ed25519".into(),
                        x: BASE64URL.encode(self.signing_key.verifying_key().as_bytes()),
                    },
                },
            ],
            key_agreement: vec!["did:web:test.app#key-agreement".into()],
            authentication: vec!["did:web:test.app#authentication".into()],
        }
    }
}

struct Harness {
    engine: Arc<Engine>,
    relay: Arc<MockRelayClient>,
    identity: Arc<HttpIdentityService>,
    key_resolver: Arc<KeyResolver>,
    subscriptions: Arc<InMemorySubscriptionStore>,
    messages: Arc<InMemoryMessageStore>,
    key_material: Arc<InMemoryKeyMaterialStore>,
    registration: Arc<InMemoryRegistrationStore>,
    events: tokio::sync::mpsc::UnboundedReceiver<EngineEvent>,
}

async fn build_harness() -> Harness {
    let relay = Arc::new(MockRelayClient::new());
    let identity = Arc::new(HttpIdentityService::new("https://keys.test"));
    let key_resolver = Arc::new(KeyResolver::new());
    let subscriptions = Arc::new(InMemorySubscriptionStore::default());
    let messages = Arc::new(InMemoryMessageStore::default());
    let watch_store = Arc::new(InMemoryWatchStore::default());
    let registration = Arc::new(InMemoryRegistrationStore::default());
    let key_material = Arc::new(InMemoryKeyMaterialStore::default());

    let deps = EngineDependencies {
        config: EngineConfig::default(),
        identity: identity.clone(),
        relay: relay.clone(),
        subscriptions: subscriptions.clone(),
        messages: messages.clone(),
        watch_store,
        registration: registration.clone(),
        key_material: key_material.clone(),
        key_resolver: key_resolver.clone(),
        config_fetcher: Arc::new(NoConfigFetcher),
        clock: Arc::new(SystemClock),
    };

    let (engine, events) = Engine::new(deps);
    let engine = Arc::new(engine);
    engine.init().await.unwrap();

    Harness {
        engine,
        relay,
        identity,
        key_resolver,
        subscriptions,
        messages,
        key_material,
        registration,
        events,
    }
}

fn test_account() -> Account {
    Account::new("eip155", "1", "0x1234567890123456789012345678901234567890")
}

async fn wait_for_new_publish(relay: &MockRelayClient, before: usize, topic: &Topic) -> RecordedPublish {
    for _ in 0..400 {
        let published = relay.published();
        if let Some(p) = published[before..].iter().find(|p| &p.topic == topic) {
            return p.clone();
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for a publish on topic {topic}");
}

/// Decrypts a Type-1 request addressed to `responder`, builds `claims`,
/// signs and seals it with the shared key the handshake just established,
/// and injects it back as the correlated response.
async fn respond_type1<C: VerifyableClaims>(
    relay: &MockRelayClient,
    publish: &RecordedPublish,
    responder: &TestActor,
    claims: C,
) {
    let (_, sender_public_hex) = decrypt_type1(&responder.x25519.private_hex, &publish.envelope).unwrap();
    let shared = derive_shared_sym_key(&responder.x25519.private_hex, &sender_public_hex).unwrap();
    let jwt = claims.encode(&responder.signing_key).unwrap();
    let envelope = encrypt_type0(&SymKey(shared), jwt.as_bytes());
    relay.inject_event(RelayEvent::Response { request_id: publish.request_id, envelope });
}

/// Signs and seals `claims` under `key` (the subscription's already-shared
/// topic key) and injects it as the correlated response to `publish`.
async fn respond_type0<C: VerifyableClaims>(
    relay: &MockRelayClient,
    publish: &RecordedPublish,
    key: &SymKey,
    responder: &TestActor,
    claims: C,
) {
    let jwt = claims.encode(&responder.signing_key).unwrap();
    let envelope = encrypt_type0(key, jwt.as_bytes());
    relay.inject_event(RelayEvent::Response { request_id: publish.request_id, envelope });
}

fn basic_claims(iss: String, aud: String, sub: String, ttl_secs: i64, app_domain: &str) -> JwtBasicClaims {
    let now = Utc::now().timestamp();
    JwtBasicClaims {
        iss,
        aud,
        sub,
        iat: now,
        exp: now + ttl_secs,
        ksu: "https://keys.test".into(),
        app: Some(did_web(app_domain)),
    }
}

/// Drives a full `subscribe` round trip and returns the resulting
/// `Subscription`'s topic, the symmetric key the dapp installed, and the
/// dapp actor used to answer it, so later scenarios (update, delete) can
/// keep extending the same session.
async fn subscribe_for_test(
    harness: &Harness,
    account: &Account,
    dapp: &TestActor,
    domain: &str,
    scope: Vec<String>,
) -> (Topic, [u8; 32]) {
    harness.key_resolver.seed(domain, dapp.did_document());
    let request_topic = topic_of_public_key_hex(&dapp.x25519.public_hex).unwrap();
    let sym_key = [42u8; 32];

    let before = harness.relay.published().len();
    let engine = harness.engine.clone();
    let account_for_task = account.clone();
    let domain_for_task = domain.to_string();
    let scope_for_task = scope.clone();
    let handle = tokio::spawn(async move {
        engine.subscribe(&account_for_task, &domain_for_task, scope_for_task).await
    });

    let publish = wait_for_new_publish(&harness.relay, before, &request_topic).await;
    let response = SubscriptionResponseAuth {
        basic: basic_claims(dapp.identity_did(), "did:key:zWallet".into(), account.as_did_pkh(), 30 * 86_400, domain),
        act: "notify_subscription_response".into(),
        sbs: vec![ServerSubscription {
            app_domain: domain.to_string(),
            app_authentication_key: dapp.identity_key_hex(),
            sym_key: hex::encode(sym_key),
            scope,
            expiry: Utc::now().timestamp() + 30 * 86_400,
        }],
    };
    respond_type1(&harness.relay, &publish, dapp, response).await;

    let subscription = handle.await.unwrap().unwrap();
    assert_eq!(subscription.app_domain, domain);
    (subscription.topic, sym_key)
}

#[tokio::test]
async fn decrypt_message_recovers_expected_body() {
    // spec.md §8 "Message decrypt": topic/sym-key pair matching
    // sha256(sym_key) == topic. The original ciphertext bytes aren't part
    // of this workspace, so the vector is exercised as an equivalent round
    // trip: seal the expected body under the given key, then decrypt it.
    let topic = Topic("cf4ddc421a73353801dcd26f64e21fa3877ccc98e577a20a7b092337b0ab76ba".into());
    let key_hex = "3a9a380042fc94a50bf8a1f7e8fea86956fc8362641d78fa62970e835d770180";
    let key_bytes: [u8; 32] = hex::decode(key_hex).unwrap().try_into().unwrap();
    assert_eq!(Topic::from_sha256(&key_bytes), topic);

    let harness = build_harness().await;
    harness.key_material.install(topic.clone(), SymKey(key_bytes)).await.unwrap();

    let signer = SigningKey::generate(&mut OsRng);
    let claims = MessageAuth {
        basic: basic_claims(
            did_key_from_verifying_key(&signer.verifying_key()),
            "did:key:zWallet".into(),
            "did:pkh:eip155:1:0xabc".into(),
            30 * 86_400,
            "test.coms",
        ),
        act: "notify_message".into(),
        msg: NotificationBodyAuth {
            id: "msg-vector-1".into(),
            title: "Test Message".into(),
            body: "Test".into(),
            icon: "".into(),
            url: "https://test.coms".into(),
            notification_type: "gm_hourly".into(),
        },
    };
    let jwt = claims.encode(&signer).unwrap();
    let envelope = encrypt_type0(&SymKey(key_bytes), jwt.as_bytes());

    let body = harness.engine.decrypt_message(&topic, &envelope).await.unwrap();
    assert_eq!(body.title, "Test Message");
    assert_eq!(body.body, "Test");
    assert_eq!(body.icon, "");
    assert_eq!(body.url, "https://test.coms");
    assert_eq!(body.notification_type, "gm_hourly");
}

#[tokio::test]
async fn subscribe_establishes_subscription_from_server_sbs() {
    let harness = build_harness().await;
    let account = test_account();
    let wallet_identity = SigningKey::generate(&mut OsRng);
    harness.identity.install_identity_for_test(account.clone(), wallet_identity);
    let dapp = TestActor::new();

    let (topic, sym_key) =
        subscribe_for_test(&harness, &account, &dapp, "dapp.test", vec!["alerts".into()]).await;

    let subscription = harness.subscriptions.get(&topic).await.unwrap().unwrap();
    assert_eq!(subscription.app_domain, "dapp.test");
    assert_eq!(subscription.app_authentication_key, dapp.identity_key_hex());
    assert!(subscription.scope.get("alerts").is_some_and(|e| e.enabled));

    let installed = harness.key_material.get(&topic).await.unwrap().unwrap();
    assert_eq!(installed.0, sym_key);
}

#[tokio::test]
async fn update_narrows_scope() {
    let harness = build_harness().await;
    let account = test_account();
    let wallet_identity = SigningKey::generate(&mut OsRng);
    harness.identity.install_identity_for_test(account.clone(), wallet_identity);
    let dapp = TestActor::new();

    let (topic, sym_key) = subscribe_for_test(
        &harness,
        &account,
        &dapp,
        "dapp.test",
        vec!["alerts".into(), "promotions".into()],
    )
    .await;

    let before = harness.relay.published().len();
    let engine = harness.engine.clone();
    let account_for_task = account.clone();
    let topic_for_task = topic.clone();
    let handle = tokio::spawn(async move {
        engine.update(&account_for_task, &topic_for_task, vec!["alerts".into()]).await
    });

    let publish = wait_for_new_publish(&harness.relay, before, &topic).await;
    let response = UpdateResponseAuth {
        basic: basic_claims(dapp.identity_did(), "did:key:zWallet".into(), account.as_did_pkh(), 300, "dapp.test"),
        act: "notify_update_response".into(),
        sbs: vec![ServerSubscription {
            app_domain: "dapp.test".into(),
            app_authentication_key: dapp.identity_key_hex(),
            sym_key: hex::encode(sym_key),
            scope: vec!["alerts".into()],
            expiry: Utc::now().timestamp() + 30 * 86_400,
        }],
    };
    respond_type0(&harness.relay, &publish, &SymKey(sym_key), &dapp, response).await;

    let updated = handle.await.unwrap().unwrap();
    assert!(updated.scope.get("alerts").is_some_and(|e| e.enabled));
    assert!(updated.scope.get("promotions").is_none());
}

#[tokio::test]
async fn delete_subscription_removes_local_state() {
    let harness = build_harness().await;
    let account = test_account();
    let wallet_identity = SigningKey::generate(&mut OsRng);
    harness.identity.install_identity_for_test(account.clone(), wallet_identity);
    let dapp = TestActor::new();

    let (topic, _sym_key) =
        subscribe_for_test(&harness, &account, &dapp, "dapp.test", vec!["alerts".into()]).await;

    let before = harness.relay.published().len();
    let engine = harness.engine.clone();
    let account_for_task = account.clone();
    let topic_for_task = topic.clone();
    let handle = tokio::spawn(async move {
        engine.delete_subscription(&account_for_task, &topic_for_task).await
    });

    let publish = wait_for_new_publish(&harness.relay, before, &topic).await;
    let key = harness.key_material.get(&topic).await.unwrap().unwrap();
    let response = DeleteResponseAuth {
        basic: basic_claims(dapp.identity_did(), "did:key:zWallet".into(), account.as_did_pkh(), 300, "dapp.test"),
        act: "notify_delete_response".into(),
        sbs: Vec::new(),
    };
    respond_type0(&harness.relay, &publish, &key, &dapp, response).await;

    handle.await.unwrap().unwrap();
    assert!(harness.subscriptions.get(&topic).await.unwrap().is_none());
    assert!(harness.key_material.get(&topic).await.unwrap().is_none());
}

#[tokio::test]
async fn is_registered_rejects_stale_statement() {
    let harness = build_harness().await;
    let account = test_account();
    let wallet_identity = SigningKey::generate(&mut OsRng);
    harness.identity.install_identity_for_test(account.clone(), wallet_identity);

    harness
        .registration
        .put(RegistrationStatement {
            account: account.clone(),
            domain: "dapp.test".into(),
            statement_text: "an old statement this app no longer issues".into(),
            all_apps: false,
        })
        .await
        .unwrap();

    assert!(!harness.engine.is_registered(&account, "dapp.test").await.unwrap());

    let current_text = notify_jwt::statement_text(false, "dapp.test");
    harness
        .registration
        .put(RegistrationStatement {
            account: account.clone(),
            domain: "dapp.test".into(),
            statement_text: current_text,
            all_apps: false,
        })
        .await
        .unwrap();
    assert!(harness.engine.is_registered(&account, "dapp.test").await.unwrap());
}

#[tokio::test]
async fn register_rejects_stale_statement() {
    let harness = build_harness().await;
    let account = test_account();

    harness
        .registration
        .put(RegistrationStatement {
            account: account.clone(),
            domain: "dapp.test".into(),
            statement_text: "an old statement this app no longer issues".into(),
            all_apps: false,
        })
        .await
        .unwrap();

    let cacao_payload = CacaoPayload {
        domain: "dapp.test".into(),
        iss: account.as_did_pkh(),
        statement: notify_jwt::statement_text(false, "dapp.test"),
        aud: "https://dapp.test".into(),
        version: "1".into(),
        nonce: "nonce".into(),
        iat: Utc::now().to_rfc3339(),
        resources: Vec::new(),
    };

    let result = harness
        .engine
        .register(&account, "dapp.test", false, cacao_payload, "deadbeef", "sig".into())
        .await;
    assert!(matches!(result, Err(EngineError::StaleStatement)));
}

#[tokio::test]
async fn inbound_messages_are_deduplicated_by_msg_id() {
    let harness = build_harness().await;
    let account = test_account();
    let wallet_identity = SigningKey::generate(&mut OsRng);
    harness.identity.install_identity_for_test(account.clone(), wallet_identity);
    let dapp = TestActor::new();

    let topic = Topic::from_sha256(&[9u8; 32]);
    let key = SymKey([9u8; 32]);
    harness.key_material.install(topic.clone(), key.clone()).await.unwrap();
    harness
        .subscriptions
        .upsert(notify_types::Subscription {
            topic: topic.clone(),
            account: account.clone(),
            app_domain: "dapp.test".into(),
            app_authentication_key: dapp.identity_key_hex(),
            scope: Default::default(),
            expiry: Utc::now(),
            metadata: SubscriptionMetadata::default(),
            unread_count: 0,
        })
        .await
        .unwrap();

    let claims = MessageAuth {
        basic: basic_claims(dapp.identity_did(), "did:key:zWallet".into(), account.as_did_pkh(), 30 * 86_400, "dapp.test"),
        act: "notify_message".into(),
        msg: NotificationBodyAuth {
            id: "msg-1".into(),
            title: "Hello".into(),
            body: "World".into(),
            icon: "".into(),
            url: "".into(),
            notification_type: "alerts".into(),
        },
    };
    let jwt = claims.encode(&dapp.signing_key).unwrap();
    let envelope = encrypt_type0(&key, jwt.as_bytes());

    harness
        .engine
        .handle_relay_event(RelayEvent::Request {
            topic: topic.clone(),
            request_id: 1,
            method: "wc_notifyMessage".into(),
            envelope: envelope.clone(),
        })
        .await;
    harness
        .engine
        .handle_relay_event(RelayEvent::Request {
            topic: topic.clone(),
            request_id: 2,
            method: "wc_notifyMessage".into(),
            envelope,
        })
        .await;

    assert!(harness.messages.exists(&topic, "msg-1").await.unwrap());
    let subscription = harness.subscriptions.get(&topic).await.unwrap().unwrap();
    assert_eq!(subscription.unread_count, 1);

    let acks: Vec<_> = harness.relay.published().into_iter().filter(|p| p.topic == topic).collect();
    assert_eq!(acks.len(), 2, "an ack is sent for every delivery, deduped or not");
}
