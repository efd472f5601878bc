use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use notify_jwt::{build_registration_payload, did_key_from_verifying_key, CacaoPayload};
use notify_types::Account;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, warn};

use crate::error::IdentityError;

/// Returned by [`IdentityService::prepare_registration`]: the CAIP-122
/// message the wallet must present for signing, the CACAO payload it
/// wraps, and the fresh ephemeral identity private key (hex) the caller
/// signs `generate_id_auth` requests with once registered.
pub struct RegistrationPreparation {
    pub cacao_payload: CacaoPayload,
    pub message_text: String,
    pub ephemeral_identity_private_hex: String,
}

/// The identity-key store and keyserver HTTP API, consumed as an interface
/// (spec.md §6). `generate_id_auth` takes pre-serialized claims rather than
/// a generic claim type so the trait stays object-safe behind `Arc<dyn _>`.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn prepare_registration(
        &self,
        account: &Account,
        domain: &str,
        all_apps: bool,
    ) -> Result<RegistrationPreparation, IdentityError>;

    async fn register_identity(
        &self,
        account: &Account,
        ephemeral_identity_private_hex: &str,
        cacao_payload: CacaoPayload,
        signature: String,
    ) -> Result<String, IdentityError>;

    fn generate_id_auth(
        &self,
        account: &Account,
        claims_json: serde_json::Value,
    ) -> Result<String, IdentityError>;

    async fn get_identity(&self, account: &Account) -> Result<Option<String>, IdentityError>;

    async fn has_identity(&self, account: &Account) -> Result<bool, IdentityError>;

    async fn unregister_identity(&self, account: &Account) -> Result<(), IdentityError>;
}

/// Keyserver-backed [`IdentityService`]. Registration posts `{cacaoPayload,
/// signature}` to `POST {keyserver_url}/identity`; lookups/removal use the
/// same endpoint keyed by the account's public key.
pub struct HttpIdentityService {
    http: reqwest::Client,
    keyserver_url: String,
    identities: Mutex<HashMap<Account, SigningKey>>,
}

impl HttpIdentityService {
    pub fn new(keyserver_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            keyserver_url: keyserver_url.into(),
            identities: Mutex::new(HashMap::new()),
        }
    }

    /// Registers an identity key locally without a keyserver round trip.
    #[cfg(feature = "test-support")]
    pub fn install_identity_for_test(&self, account: Account, signing_key: SigningKey) {
        self.identities.lock().unwrap().insert(account, signing_key);
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn prepare_registration(
        &self,
        account: &Account,
        domain: &str,
        all_apps: bool,
    ) -> Result<RegistrationPreparation, IdentityError> {
        let signing_key = SigningKey::generate(&mut OsRng);
        let mut nonce_bytes = [0u8; 16];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = hex::encode(nonce_bytes);
        let iat = chrono::Utc::now().to_rfc3339();

        let cacao_payload =
            build_registration_payload(&account.as_caip10(), domain, all_apps, &nonce, &iat);
        let message_text = notify_jwt::compose_message(&cacao_payload);

        Ok(RegistrationPreparation {
            cacao_payload,
            message_text,
            ephemeral_identity_private_hex: hex::encode(signing_key.to_bytes()),
        })
    }

    async fn register_identity(
        &self,
        account: &Account,
        ephemeral_identity_private_hex: &str,
        cacao_payload: CacaoPayload,
        signature: String,
    ) -> Result<String, IdentityError> {
        let bytes: [u8; 32] = hex::decode(ephemeral_identity_private_hex)
            .map_err(|_| IdentityError::InvalidKeyEncoding)?
            .try_into()
            .map_err(|_| IdentityError::InvalidKeyEncoding)?;
        let signing_key = SigningKey::from_bytes(&bytes);
        let identity_pub = did_key_from_verifying_key(&signing_key.verifying_key());

        let body = serde_json::json!({
            "cacaoPayload": cacao_payload,
            "signature": signature,
            "identityPublicKey": identity_pub,
        });
        let response = self
            .http
            .post(format!("{}/identity", self.keyserver_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentityError::KeyserverRequest(e.to_string()))?;
        if !response.status().is_success() {
            return Err(IdentityError::KeyserverRequest(format!(
                "keyserver returned {}",
                response.status()
            )));
        }

        self.identities.lock().unwrap().insert(account.clone(), signing_key);
        debug!(account = %account, "registered identity key with keyserver");
        Ok(identity_pub)
    }

    fn generate_id_auth(
        &self,
        account: &Account,
        claims_json: serde_json::Value,
    ) -> Result<String, IdentityError> {
        let identities = self.identities.lock().unwrap();
        let signing_key = identities.get(account).ok_or(IdentityError::NotFound)?;

        let header = serde_json::json!({"alg": "EdDSA", "typ": "JWT"});
        use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL;
        use base64::Engine;
        let header_b64 = BASE64URL.encode(serde_json::to_vec(&header).unwrap());
        let payload_b64 = BASE64URL.encode(serde_json::to_vec(&claims_json).unwrap());
        let signing_input = format!("{header_b64}.{payload_b64}");
        let signature = signing_key.sign(signing_input.as_bytes());
        let signature_b64 = BASE64URL.encode(signature.to_bytes());
        Ok(format!("{signing_input}.{signature_b64}"))
    }

    async fn get_identity(&self, account: &Account) -> Result<Option<String>, IdentityError> {
        Ok(self
            .identities
            .lock()
            .unwrap()
            .get(account)
            .map(|key| did_key_from_verifying_key(&key.verifying_key())))
    }

    async fn has_identity(&self, account: &Account) -> Result<bool, IdentityError> {
        Ok(self.identities.lock().unwrap().contains_key(account))
    }

    async fn unregister_identity(&self, account: &Account) -> Result<(), IdentityError> {
        let Some(identity_pub) = self.get_identity(account).await? else {
            return Ok(());
        };
        let response = self
            .http
            .delete(format!("{}/identity", self.keyserver_url))
            .query(&[("publicKey", identity_pub.as_str())])
            .send()
            .await;
        if let Err(e) = response {
            warn!(account = %account, error = %e, "keyserver deletion failed, removing locally anyway");
        }
        self.identities.lock().unwrap().remove(account);
        Ok(())
    }
}
