use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One notification-type id's descriptive metadata and server-authoritative
/// enabled flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Server-authoritative: set from whether `id` appears in the server's
    /// `scope` for this subscription, never locally toggled directly.
    pub enabled: bool,
    #[serde(default)]
    pub image_urls: Option<ScopeImageUrls>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeImageUrls {
    pub sm: Option<String>,
    pub md: Option<String>,
    pub lg: Option<String>,
}

/// Mapping from notification-type id to its [`ScopeEntry`], keyed
/// deterministically so reconciliation is idempotent (§8 "Reconciliation
/// idempotence").
pub type ScopeMap = BTreeMap<String, ScopeEntry>;

/// One notification type as advertised by a dapp's notify-config document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyConfigType {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub image_urls: Option<ScopeImageUrls>,
}

/// Per-app-domain descriptor fetched lazily from the explorer API. May be
/// absent for a given domain, in which case metadata falls back to the raw
/// domain string (§3 "NotifyConfig").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub image_url: Option<ScopeImageUrls>,
    pub notification_types: Vec<NotifyConfigType>,
}
