//! Envelope encryption and key agreement for the Notify protocol engine.
//!
//! Implements the two wire envelope framings described in spec.md §6:
//!
//! - **Type 0**: symmetric AEAD (ChaCha20-Poly1305) with the topic's
//!   installed key.
//! - **Type 1**: asymmetric pre-shared — the sender's ephemeral X25519
//!   public key is prepended to the envelope; the receiver derives the
//!   shared secret from its own static key and the embedded sender key.
//!
//! This crate is a concrete reference implementation of what spec.md calls
//! an external "cryptography service" — the engine only talks to it through
//! [`EnvelopePipeline`]'s free functions, never to the AEAD/KDF primitives
//! directly.

mod envelope;
mod error;
mod keys;

pub use envelope::{decrypt_type0, decrypt_type1, encrypt_type0, encrypt_type1, EnvelopeType};
pub use error::CryptoError;
pub use keys::{derive_shared_sym_key, generate_x25519_keypair, X25519KeyPair};

use notify_types::Topic;

/// `sha256(public_key_bytes)`, the topic a Type-1 request is published to
/// (spec.md §4.1 method table: `sha256(dappPublicKey)` / `sha256(notifyServerPublicKey)`).
pub fn topic_of_public_key_hex(public_key_hex: &str) -> Result<Topic, CryptoError> {
    let bytes = hex::decode(public_key_hex).map_err(|_| CryptoError::InvalidKeyEncoding)?;
    Ok(Topic::from_sha256(&bytes))
}
