use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Account, Topic};

/// The local side of the key agreement used on the notify server's watch
/// channel, persisted so a restart re-derives the same response topic
/// instead of orphaning the server-side channel (§5 "Shared-resource
/// policy").
///
/// Invariant: at most one `WatchedAccount` across the store has
/// `last_watched = true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedAccount {
    pub account: Account,
    pub app_domain: Option<String>,
    pub all_apps: bool,
    /// Hex-encoded X25519 public key (`pub_key_y`).
    pub pub_key_y: String,
    /// Hex-encoded X25519 private key (`priv_key_y`). Never sent over the
    /// wire; persisted so the response topic can be re-derived.
    pub priv_key_y: String,
    pub res_topic: Topic,
    pub last_watched: bool,
    pub updated_at: DateTime<Utc>,
}
