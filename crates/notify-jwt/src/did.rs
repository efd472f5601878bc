//! `did:key`, `did:pkh`, and `did:web` encoding for ed25519 identity keys.

use ed25519_dalek::VerifyingKey;

use crate::error::JwtError;

/// Multicodec prefix for an ed25519 public key (`0xed01` as a varint).
const ED25519_MULTICODEC_PREFIX: [u8; 2] = [0xed, 0x01];

/// Encodes an ed25519 public key as `did:key:z<multibase>`.
pub fn did_key_from_verifying_key(key: &VerifyingKey) -> String {
    let mut bytes = Vec::with_capacity(2 + 32);
    bytes.extend_from_slice(&ED25519_MULTICODEC_PREFIX);
    bytes.extend_from_slice(key.as_bytes());
    format!("did:key:{}", multibase::encode(multibase::Base::Base58Btc, bytes))
}

/// Encodes a raw ed25519 public key (hex) as `did:key:z<multibase>`.
pub fn did_key_from_hex(public_key_hex: &str) -> Result<String, JwtError> {
    let bytes: [u8; 32] = hex::decode(public_key_hex)
        .map_err(|_| JwtError::InvalidKeyEncoding)?
        .try_into()
        .map_err(|_| JwtError::InvalidKeyEncoding)?;
    let key = VerifyingKey::from_bytes(&bytes).map_err(|_| JwtError::InvalidKeyEncoding)?;
    Ok(did_key_from_verifying_key(&key))
}

/// Recovers the raw ed25519 public key (hex) encoded by a `did:key` URI.
pub fn verifying_key_from_did_key(did: &str) -> Result<VerifyingKey, JwtError> {
    let encoded = did.strip_prefix("did:key:").ok_or(JwtError::InvalidDid)?;
    let (_, bytes) = multibase::decode(encoded).map_err(|_| JwtError::InvalidDid)?;
    let key_bytes = bytes.strip_prefix(&ED25519_MULTICODEC_PREFIX).ok_or(JwtError::InvalidDid)?;
    let key_bytes: [u8; 32] = key_bytes.try_into().map_err(|_| JwtError::InvalidDid)?;
    VerifyingKey::from_bytes(&key_bytes).map_err(|_| JwtError::InvalidDid)
}

/// `did:pkh:<caip10>`.
pub fn did_pkh(caip10: &str) -> String {
    format!("did:pkh:{caip10}")
}

/// `did:web:<domain>`, percent-encoding is not applied: domains are ASCII.
pub fn did_web(domain: &str) -> String {
    format!("did:web:{domain}")
}
