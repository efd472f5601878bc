use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Account, ScopeMap, Topic};

/// A local mirror of a server-owned subscription.
///
/// Owned exclusively by subscription reconciliation (§4.2) — there is no
/// code path in the engine that constructs a `Subscription` without first
/// validating a server-signed `sbs` claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub topic: Topic,
    pub account: Account,
    pub app_domain: String,
    /// The dapp's authentication key, hex-encoded, cached here so the
    /// message-response path (`getCachedDappKey`) can avoid a DID-document
    /// fetch.
    pub app_authentication_key: String,
    pub scope: ScopeMap,
    pub expiry: DateTime<Utc>,
    pub metadata: SubscriptionMetadata,
    pub unread_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubscriptionMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

/// A dapp's published DID document, cached in-process for the engine's
/// lifetime (§4.4 "Key resolver").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    pub verification_method: Vec<VerificationMethod>,
    pub key_agreement: Vec<String>,
    pub authentication: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "publicKeyJwk")]
    pub public_key_jwk: PublicKeyJwk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyJwk {
    pub kty: String,
    pub crv: String,
    /// Base64url-encoded raw key material.
    pub x: String,
}
