use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Account;

/// An ed25519 key pair bound to an [`Account`] on this device.
///
/// The private half never leaves the identity service (see
/// `notify_identity::IdentityService`) — this type only carries the public
/// key and bookkeeping the engine needs locally. At most one `IdentityKey`
/// exists per account per device; creation and revocation are owned by the
/// engine's `register`/`unregister` operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityKey {
    pub account: Account,
    /// Raw 32-byte ed25519 public key, hex-encoded.
    pub public_key_hex: String,
    pub created_at: DateTime<Utc>,
}

impl IdentityKey {
    pub fn new(account: Account, public_key_hex: impl Into<String>) -> Self {
        Self {
            account,
            public_key_hex: public_key_hex.into(),
            created_at: Utc::now(),
        }
    }
}

/// Records the human-readable CAIP-122 statement the user signed to create
/// an [`IdentityKey`], used to detect policy drift (§4.1 "Staleness
/// check").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationStatement {
    pub account: Account,
    pub domain: String,
    pub statement_text: String,
    pub all_apps: bool,
}
