use std::collections::HashMap;
use std::sync::Mutex;

use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL;
use base64::Engine;
use notify_types::DidDocument;
use tracing::debug;

use crate::error::IdentityError;

/// `{dapp_public_key, dapp_identity_key}`, both hex-encoded, resolved from
/// a dapp's `.well-known/did.json` (spec.md §4.4).
#[derive(Debug, Clone)]
pub struct ResolvedKeys {
    pub dapp_public_key: String,
    pub dapp_identity_key: String,
}

/// Resolves dapp key-agreement and authentication keys, caching decoded
/// DID documents by dapp URL to avoid refetching on every outbound call.
pub struct KeyResolver {
    http: reqwest::Client,
    cache: Mutex<HashMap<String, DidDocument>>,
}

impl Default for KeyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyResolver {
    pub fn new() -> Self {
        Self { http: reqwest::Client::new(), cache: Mutex::new(HashMap::new()) }
    }

    pub async fn resolve_keys(&self, dapp_url: &str) -> Result<ResolvedKeys, IdentityError> {
        let document = self.document_for(dapp_url).await?;
        extract_keys(&document)
    }

    /// Precaches a known DID document, skipping the network fetch the next
    /// time `dapp_url` is resolved. Used to bundle well-known documents and
    /// in tests to avoid a real HTTP round trip.
    pub fn seed(&self, dapp_url: impl Into<String>, document: DidDocument) {
        self.cache.lock().unwrap().insert(dapp_url.into(), document);
    }

    /// Recovers the identity key only, from an already-cached document.
    /// Avoids a network fetch on the message-response path when the dapp's
    /// key was already resolved during subscribe/update.
    pub fn cached_identity_key(&self, dapp_url: &str) -> Option<String> {
        let cache = self.cache.lock().unwrap();
        let document = cache.get(dapp_url)?;
        extract_keys(document).ok().map(|keys| keys.dapp_identity_key)
    }

    async fn document_for(&self, dapp_url: &str) -> Result<DidDocument, IdentityError> {
        if let Some(document) = self.cache.lock().unwrap().get(dapp_url) {
            return Ok(document.clone());
        }

        let url = format!("{dapp_url}/.well-known/did.json");
        let document: DidDocument = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| IdentityError::ResolveKeysFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| IdentityError::ResolveKeysFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| IdentityError::ResolveKeysFailed(e.to_string()))?;

        debug!(dapp_url, "fetched and cached did.json");
        self.cache.lock().unwrap().insert(dapp_url.to_string(), document.clone());
        Ok(document)
    }
}

fn extract_keys(document: &DidDocument) -> Result<ResolvedKeys, IdentityError> {
    let key_agreement_id = document
        .key_agreement
        .first()
        .ok_or_else(|| IdentityError::ResolveKeysFailed("no keyAgreement entries".into()))?;
    let authentication_id = document
        .authentication
        .first()
        .ok_or_else(|| IdentityError::ResolveKeysFailed("no authentication entries".into()))?;

    let key_agreement_jwk = find_verification_method(document, key_agreement_id)?;
    let authentication_jwk = find_verification_method(document, authentication_id)?;

    Ok(ResolvedKeys {
        dapp_public_key: jwk_x_to_hex(&key_agreement_jwk)?,
        dapp_identity_key: jwk_x_to_hex(&authentication_jwk)?,
    })
}

fn find_verification_method(document: &DidDocument, id: &str) -> Result<String, IdentityError> {
    document
        .verification_method
        .iter()
        .find(|method| &method.id == id)
        .map(|method| method.public_key_jwk.x.clone())
        .ok_or_else(|| IdentityError::ResolveKeysFailed(format!("no verificationMethod for {id}")))
}

fn jwk_x_to_hex(base64url_x: &str) -> Result<String, IdentityError> {
    let bytes = BASE64URL.decode(base64url_x).map_err(|_| IdentityError::InvalidKeyEncoding)?;
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify_types::{PublicKeyJwk, VerificationMethod};

    fn sample_document() -> DidDocument {
        let jwk_bytes = [7u8; 32];
        let x = BASE64URL.encode(jwk_bytes);
        DidDocument {
            verification_method: vec![VerificationMethod {
                id: "did:web:example.com#key-1".into(),
                public_key_jwk: PublicKeyJwk { kty: "OKP".into(), crv: "X25519".into(), x },
            }],
            key_agreement: vec!["did:web:example.com#key-1".into()],
            authentication: vec!["did:web:example.com#key-1".into()],
        }
    }

    #[test]
    fn extracts_hex_keys_from_document() {
        let document = sample_document();
        let keys = extract_keys(&document).unwrap();
        assert_eq!(keys.dapp_public_key, hex::encode([7u8; 32]));
        assert_eq!(keys.dapp_identity_key, hex::encode([7u8; 32]));
    }

    #[test]
    fn missing_key_agreement_fails() {
        let mut document = sample_document();
        document.key_agreement.clear();
        assert!(extract_keys(&document).is_err());
    }
}
