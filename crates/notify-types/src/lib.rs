//! Canonical data model for the Notify protocol engine.
//!
//! These types are shared by every other `notify-*` crate. They carry no
//! behavior beyond small invariant-preserving constructors and conversions
//! — the engine crate owns all protocol logic.

mod account;
mod error;
mod identity;
mod message;
mod scope;
mod subscription;
mod watch;

pub use account::Account;
pub use error::Error;
pub use identity::{IdentityKey, RegistrationStatement};
pub use message::{MessageRecord, PendingRequest};
pub use scope::{NotifyConfig, NotifyConfigType, ScopeEntry, ScopeMap};
pub use subscription::{DidDocument, Subscription};
pub use watch::WatchedAccount;

/// A relay topic: `sha256(sym_key)` or `sha256(public_key)`, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Topic(pub String);

impl Topic {
    pub fn from_sha256(input: &[u8]) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(input);
        Self(hex::encode(hasher.finalize()))
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 32-byte symmetric key, kept hex-encoded at rest to match the rest of
/// the wire protocol (claims, topics) being hex/base64 text.
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SymKey(#[serde(with = "hex_bytes")] pub [u8; 32]);

impl SymKey {
    pub fn topic(&self) -> Topic {
        Topic::from_sha256(&self.0)
    }
}

impl std::fmt::Debug for SymKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SymKey(..)")
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("sym key must be 32 bytes"))
    }
}
