use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::JwtError;

/// Fields common to every claim set in the protocol (spec.md §4.3: all
/// claim sets extend `{iat, exp, ksu, act}`, plus the issuer/audience/subject
/// triple the outbound operation template always fills in).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtBasicClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub ksu: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JwsHeader {
    alg: &'static str,
    typ: &'static str,
}

fn header() -> JwsHeader {
    JwsHeader { alg: "EdDSA", typ: "JWT" }
}

/// Implemented by every per-method claim set. `act` identifies the claim set
/// shape (`notify_subscription`, `notify_message`, ...) and is checked by
/// [`crate::decode_and_validate`] against the caller's expectation.
pub trait VerifyableClaims: Serialize + DeserializeOwned + Sized {
    fn basic(&self) -> &JwtBasicClaims;
    fn act(&self) -> &str;

    /// Signs the claim set, producing a compact JWS (`header.payload.signature`,
    /// all three segments base64url, no padding).
    fn encode(&self, signing_key: &SigningKey) -> Result<String, JwtError> {
        let header_b64 = BASE64URL.encode(
            serde_json::to_vec(&header()).map_err(|_| JwtError::InvalidClaims)?,
        );
        let payload_b64 =
            BASE64URL.encode(serde_json::to_vec(self).map_err(|_| JwtError::InvalidClaims)?);
        let signing_input = format!("{header_b64}.{payload_b64}");
        let signature: Signature = signing_key.sign(signing_input.as_bytes());
        let signature_b64 = BASE64URL.encode(signature.to_bytes());
        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Parses the payload segment without checking the signature.
    fn try_from_str(token: &str) -> Result<Self, JwtError> {
        let (_, payload, _) = split_compact_jws(token)?;
        serde_json::from_slice(&payload).map_err(|_| JwtError::InvalidClaims)
    }
}

fn split_compact_jws(token: &str) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>), JwtError> {
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(JwtError::MalformedToken);
    };
    let header = BASE64URL.decode(header).map_err(|_| JwtError::MalformedToken)?;
    let payload = BASE64URL.decode(payload).map_err(|_| JwtError::MalformedToken)?;
    let signature = BASE64URL.decode(signature).map_err(|_| JwtError::MalformedToken)?;
    Ok((header, payload, signature))
}

/// Verifies the compact JWS signature against `verifying_key` and returns
/// the raw payload bytes, or `InvalidSignature`/`MalformedToken`.
pub fn verify_compact_jws(token: &str, verifying_key: &VerifyingKey) -> Result<Vec<u8>, JwtError> {
    let (_, payload, signature_bytes) = split_compact_jws(token)?;
    let signature_bytes: [u8; 64] =
        signature_bytes.try_into().map_err(|_| JwtError::MalformedToken)?;
    let signature = Signature::from_bytes(&signature_bytes);

    let mut parts = token.split('.');
    let header_segment = parts.next().ok_or(JwtError::MalformedToken)?;
    let payload_segment = parts.next().ok_or(JwtError::MalformedToken)?;
    let signing_input = format!("{header_segment}.{payload_segment}");

    verifying_key
        .verify(signing_input.as_bytes(), &signature)
        .map_err(|_| JwtError::InvalidSignature)?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestClaims {
        #[serde(flatten)]
        basic: JwtBasicClaims,
        act: String,
    }

    impl VerifyableClaims for TestClaims {
        fn basic(&self) -> &JwtBasicClaims {
            &self.basic
        }
        fn act(&self) -> &str {
            &self.act
        }
    }

    #[test]
    fn encodes_and_round_trips() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let claims = TestClaims {
            basic: JwtBasicClaims {
                iss: "did:key:zExample".into(),
                aud: "did:key:zDapp".into(),
                sub: "did:pkh:eip155:1:0xabc".into(),
                iat: 1000,
                exp: 1300,
                ksu: "https://keys.walletconnect.com".into(),
                app: None,
            },
            act: "notify_subscription".into(),
        };

        let token = claims.encode(&signing_key).unwrap();
        let decoded = TestClaims::try_from_str(&token).unwrap();
        assert_eq!(decoded, claims);

        let payload = verify_compact_jws(&token, &signing_key.verifying_key()).unwrap();
        let verified: TestClaims = serde_json::from_slice(&payload).unwrap();
        assert_eq!(verified, claims);
    }

    #[test]
    fn rejects_tampered_signature() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let other_key = SigningKey::generate(&mut OsRng);
        let claims = TestClaims {
            basic: JwtBasicClaims {
                iss: "did:key:zExample".into(),
                aud: "did:key:zDapp".into(),
                sub: "did:pkh:eip155:1:0xabc".into(),
                iat: 1000,
                exp: 1300,
                ksu: "https://keys.walletconnect.com".into(),
                app: None,
            },
            act: "notify_subscription".into(),
        };
        let token = claims.encode(&signing_key).unwrap();
        assert!(verify_compact_jws(&token, &other_key.verifying_key()).is_err());
    }
}
