//! JWT authorization builder/verifier and DID encoding for the Notify
//! protocol engine (spec.md §4.3, §4.4).
//!
//! Claim sets are compact detached-style JWS tokens signed with an
//! identity's ed25519 key; issuer and audience fields encode the signing
//! and expected-verifier keys as `did:key:z<multibase>`.

mod basic;
mod claims;
mod did;
mod error;
mod siwx;

pub use basic::{verify_compact_jws, JwtBasicClaims, VerifyableClaims};
pub use claims::{
    DeleteRequestAuth, DeleteResponseAuth, GetNotificationsRequestAuth,
    GetNotificationsResponseAuth, MarkNotificationsAsReadRequestAuth,
    MarkNotificationsAsReadResponseAuth, MessageAuth, MessageResponseAuth,
    NotificationBodyAuth, ServerSubscription, SubscriptionRequestAuth, SubscriptionResponseAuth,
    SubscriptionsChangedAuth, UpdateRequestAuth, UpdateResponseAuth,
    WatchSubscriptionsRequestAuth, WatchSubscriptionsResponseAuth,
};
pub use did::{
    did_key_from_hex, did_key_from_verifying_key, did_pkh, did_web, verifying_key_from_did_key,
};
pub use error::JwtError;
pub use siwx::{
    build_registration_payload, compose_message, is_recap_statement, statement_text, Cacao,
    CacaoHeader, CacaoPayload, CacaoSignature,
};

use ed25519_dalek::VerifyingKey;

/// Parses `jwt`, checks `claims.act == expected_act`, and verifies the
/// signature against `verifying_key` (the dapp's or notify server's
/// published authentication key, per spec.md §4.3).
pub fn decode_and_validate<T: VerifyableClaims>(
    jwt: &str,
    expected_act: &str,
    verifying_key: &VerifyingKey,
) -> Result<T, JwtError> {
    let payload = verify_compact_jws(jwt, verifying_key)?;
    let claims: T = serde_json::from_slice(&payload).map_err(|_| JwtError::InvalidClaims)?;
    if claims.act() != expected_act {
        return Err(JwtError::ActMismatch {
            expected: expected_act.to_string(),
            actual: claims.act().to_string(),
        });
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    #[test]
    fn decode_and_validate_rejects_wrong_act() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let claims = DeleteRequestAuth {
            basic: JwtBasicClaims {
                iss: did_key_from_verifying_key(&signing_key.verifying_key()),
                aud: "did:key:zDapp".into(),
                sub: "did:pkh:eip155:1:0xabc".into(),
                iat: 1000,
                exp: 1300,
                ksu: "https://keys.walletconnect.com".into(),
                app: None,
            },
            act: "notify_delete".into(),
        };
        let token = claims.encode(&signing_key).unwrap();

        let result: Result<DeleteRequestAuth, JwtError> =
            decode_and_validate(&token, "notify_subscription", &signing_key.verifying_key());
        assert!(matches!(result, Err(JwtError::ActMismatch { .. })));

        let result: Result<DeleteRequestAuth, JwtError> =
            decode_and_validate(&token, "notify_delete", &signing_key.verifying_key());
        assert!(result.is_ok());
    }

    #[test]
    fn decode_and_validate_rejects_wrong_act_claim_in_token() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let claims = DeleteRequestAuth {
            basic: JwtBasicClaims {
                iss: did_key_from_verifying_key(&signing_key.verifying_key()),
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

        let result: Result<DeleteRequestAuth, JwtError> =
            decode_and_validate(&token, "notify_delete", &signing_key.verifying_key());
        assert!(matches!(result, Err(JwtError::ActMismatch { .. })));
    }
}
