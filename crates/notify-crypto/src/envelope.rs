use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::RngCore;

use notify_types::SymKey;

use crate::error::CryptoError;
use crate::keys::derive_shared_sym_key;

const NONCE_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeType {
    /// Symmetric AEAD with the topic's installed key.
    Type0 = 0,
    /// Asymmetric pre-shared: sender ephemeral public key prepended.
    Type1 = 1,
}

fn seal(key: &[u8; 32], plaintext: &[u8]) -> (Vec<u8>, [u8; NONCE_LEN]) {
    let cipher = ChaCha20Poly1305::new(key.into());
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);
    // AEAD encryption over a freshly generated nonce never fails.
    let ciphertext = cipher.encrypt(nonce, plaintext).expect("chacha20poly1305 seal");
    (ciphertext, nonce_bytes)
}

fn open(key: &[u8; 32], nonce_bytes: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = ChaCha20Poly1305::new(key.into());
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Encrypts `plaintext` under the topic's installed symmetric key and
/// returns the base64 envelope the relay transports as UTF-8.
pub fn encrypt_type0(sym_key: &SymKey, plaintext: &[u8]) -> String {
    let (ciphertext, nonce) = seal(&sym_key.0, plaintext);
    let mut out = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
    out.push(EnvelopeType::Type0 as u8);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    BASE64.encode(out)
}

/// Decrypts a Type-0 envelope using the topic's installed symmetric key.
pub fn decrypt_type0(sym_key: &SymKey, envelope: &str) -> Result<Vec<u8>, CryptoError> {
    let bytes = BASE64
        .decode(envelope)
        .map_err(|_| CryptoError::MalformedEnvelope)?;
    let (tag, rest) = bytes.split_first().ok_or(CryptoError::MalformedEnvelope)?;
    if *tag != EnvelopeType::Type0 as u8 {
        return Err(CryptoError::UnsupportedEnvelopeType(*tag));
    }
    if rest.len() < NONCE_LEN {
        return Err(CryptoError::MalformedEnvelope);
    }
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
    open(&sym_key.0, nonce, ciphertext)
}

/// Encrypts `plaintext` for `receiver_public_hex` using a fresh ephemeral
/// X25519 key pair as the sender identity for this message, prepending the
/// sender's public key so the receiver can derive the same shared secret.
pub fn encrypt_type1(
    sender_private_hex: &str,
    receiver_public_hex: &str,
    plaintext: &[u8],
) -> Result<String, CryptoError> {
    let shared = derive_shared_sym_key(sender_private_hex, receiver_public_hex)?;
    let sender_secret = x25519_dalek::StaticSecret::from(secret_bytes(sender_private_hex)?);
    let sender_public = x25519_dalek::PublicKey::from(&sender_secret);

    let (ciphertext, nonce) = seal(&shared, plaintext);
    let mut out = Vec::with_capacity(1 + 32 + NONCE_LEN + ciphertext.len());
    out.push(EnvelopeType::Type1 as u8);
    out.extend_from_slice(sender_public.as_bytes());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(out))
}

/// Decrypts a Type-1 envelope using the receiver's static private key,
/// returning the plaintext and the sender's ephemeral public key (hex).
pub fn decrypt_type1(
    receiver_private_hex: &str,
    envelope: &str,
) -> Result<(Vec<u8>, String), CryptoError> {
    let bytes = BASE64
        .decode(envelope)
        .map_err(|_| CryptoError::MalformedEnvelope)?;
    let (tag, rest) = bytes.split_first().ok_or(CryptoError::MalformedEnvelope)?;
    if *tag != EnvelopeType::Type1 as u8 {
        return Err(CryptoError::UnsupportedEnvelopeType(*tag));
    }
    if rest.len() < 32 + NONCE_LEN {
        return Err(CryptoError::MalformedEnvelope);
    }
    let (sender_public, rest) = rest.split_at(32);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
    let sender_public_hex = hex::encode(sender_public);

    let shared = derive_shared_sym_key(receiver_private_hex, &sender_public_hex)?;
    let plaintext = open(&shared, nonce, ciphertext)?;
    Ok((plaintext, sender_public_hex))
}

fn secret_bytes(hex_str: &str) -> Result<[u8; 32], CryptoError> {
    hex::decode(hex_str)
        .map_err(|_| CryptoError::InvalidKeyEncoding)?
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyEncoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_x25519_keypair;

    #[test]
    fn type0_round_trips() {
        let sym_key = SymKey([7u8; 32]);
        let envelope = encrypt_type0(&sym_key, b"hello notify");
        let plaintext = decrypt_type0(&sym_key, &envelope).unwrap();
        assert_eq!(plaintext, b"hello notify");
    }

    #[test]
    fn type0_rejects_tampered_ciphertext() {
        let sym_key = SymKey([7u8; 32]);
        let mut envelope_bytes = BASE64.decode(encrypt_type0(&sym_key, b"hello")).unwrap();
        *envelope_bytes.last_mut().unwrap() ^= 0xFF;
        let tampered = BASE64.encode(envelope_bytes);
        assert!(decrypt_type0(&sym_key, &tampered).is_err());
    }

    #[test]
    fn type1_round_trips_and_recovers_sender_key() {
        let sender = generate_x25519_keypair();
        let receiver = generate_x25519_keypair();

        let envelope = encrypt_type1(&sender.private_hex, &receiver.public_hex, b"watch me").unwrap();
        let (plaintext, sender_public_hex) =
            decrypt_type1(&receiver.private_hex, &envelope).unwrap();

        assert_eq!(plaintext, b"watch me");
        assert_eq!(sender_public_hex, sender.public_hex);
    }
}
