use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::error::CryptoError;

/// An X25519 key pair, hex-encoded for storage (matches [`WatchedAccount`]'s
/// `pub_key_y`/`priv_key_y` fields and the dapp's `keyAgreement` JWK `x`).
pub struct X25519KeyPair {
    pub public_hex: String,
    pub private_hex: String,
}

pub fn generate_x25519_keypair() -> X25519KeyPair {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&secret);
    X25519KeyPair {
        public_hex: hex::encode(public.as_bytes()),
        private_hex: hex::encode(secret.to_bytes()),
    }
}

fn secret_from_hex(hex_str: &str) -> Result<StaticSecret, CryptoError> {
    let bytes: [u8; 32] = hex::decode(hex_str)
        .map_err(|_| CryptoError::InvalidKeyEncoding)?
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyEncoding)?;
    Ok(StaticSecret::from(bytes))
}

fn public_from_hex(hex_str: &str) -> Result<PublicKey, CryptoError> {
    let bytes: [u8; 32] = hex::decode(hex_str)
        .map_err(|_| CryptoError::InvalidKeyEncoding)?
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyEncoding)?;
    Ok(PublicKey::from(bytes))
}

/// Derives the 32-byte symmetric key shared between two X25519 parties:
/// `HKDF-SHA256(X25519(priv, pub))`, with no salt/info, matching the
/// derivation WalletConnect's relay auth describes as `sharedKey(a, b)`.
pub fn derive_shared_sym_key(
    own_private_hex: &str,
    peer_public_hex: &str,
) -> Result<[u8; 32], CryptoError> {
    let secret = secret_from_hex(own_private_hex)?;
    let peer = public_from_hex(peer_public_hex)?;
    let shared = secret.diffie_hellman(&peer);

    let hk = Hkdf::<Sha256>::new(None, shared.as_bytes());
    let mut okm = [0u8; 32];
    hk.expand(b"notify-envelope", &mut okm)
        .map_err(|_| CryptoError::InvalidKeyEncoding)?;
    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diffie_hellman_is_symmetric() {
        let a = generate_x25519_keypair();
        let b = generate_x25519_keypair();

        let shared_ab = derive_shared_sym_key(&a.private_hex, &b.public_hex).unwrap();
        let shared_ba = derive_shared_sym_key(&b.private_hex, &a.public_hex).unwrap();

        assert_eq!(shared_ab, shared_ba);
    }
}
